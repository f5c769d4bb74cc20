// src/compare.rs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ahash::{AHashMap, AHashSet};

use crate::stats::{kruskal_wallis, mean, pairwise_test, Correction, TestResult};
use crate::types::{MockResultRow, PerLevelAccuracyRow};

/// A score column that methods can be ranked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Precision,
    Recall,
    FMeasure,
    PearsonR,
    SpearmanR,
    MatchRatio,
}

impl Metric {
    pub fn column_name(&self) -> &'static str {
        match self {
            Metric::Precision => "Precision",
            Metric::Recall => "Recall",
            Metric::FMeasure => "F-measure",
            Metric::PearsonR => "Pearson r",
            Metric::SpearmanR => "Spearman r",
            Metric::MatchRatio => "match_ratio",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "precision" => Ok(Metric::Precision),
            "recall" => Ok(Metric::Recall),
            "f-measure" | "f" => Ok(Metric::FMeasure),
            "pearson-r" | "pearson" => Ok(Metric::PearsonR),
            "spearman-r" | "spearman" => Ok(Metric::SpearmanR),
            "match-ratio" | "match" => Ok(Metric::MatchRatio),
            _ => Err(format!("unknown metric '{s}'")),
        }
    }
}

/// Whether a larger or a smaller metric value is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Maximize,
    Minimize,
}

impl Direction {
    fn better(&self, a: f64, b: f64) -> bool {
        match self {
            Direction::Maximize => a > b,
            Direction::Minimize => a < b,
        }
    }
}

/// A result row the comparison layer can rank.
pub trait ScoredRow {
    fn dataset(&self) -> &str;
    fn level(&self) -> usize;
    /// What the score was measured on: a mock sample, or a simulated
    /// iteration.
    fn sample(&self) -> &str;
    fn method(&self) -> &str;
    fn parameters(&self) -> &str;
    /// `None` when the row has no (finite) value for `metric`.
    fn score(&self, metric: Metric) -> Option<f64>;
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

impl ScoredRow for MockResultRow {
    fn dataset(&self) -> &str {
        &self.dataset
    }
    fn level(&self) -> usize {
        self.level
    }
    fn sample(&self) -> &str {
        &self.sample_id
    }
    fn method(&self) -> &str {
        &self.method
    }
    fn parameters(&self) -> &str {
        &self.parameters
    }
    fn score(&self, metric: Metric) -> Option<f64> {
        finite(match metric {
            Metric::Precision => Some(self.precision),
            Metric::Recall => Some(self.recall),
            Metric::FMeasure => Some(self.f_measure),
            Metric::PearsonR => self.pearson_r,
            Metric::SpearmanR => self.spearman_r,
            Metric::MatchRatio => None,
        })
    }
}

impl ScoredRow for PerLevelAccuracyRow {
    fn dataset(&self) -> &str {
        &self.dataset
    }
    fn level(&self) -> usize {
        self.level
    }
    fn sample(&self) -> &str {
        &self.iteration
    }
    fn method(&self) -> &str {
        &self.method
    }
    fn parameters(&self) -> &str {
        &self.parameters
    }
    fn score(&self, metric: Metric) -> Option<f64> {
        finite(match metric {
            Metric::MatchRatio => Some(self.match_ratio),
            Metric::Precision => self.precision,
            Metric::Recall => self.recall,
            Metric::FMeasure => self.f_measure,
            Metric::PearsonR | Metric::SpearmanR => None,
        })
    }
}

/// Distinct values in first-seen order.
fn unique<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = AHashSet::new();
    items.filter(|item| seen.insert(*item)).collect()
}

/// The deepest level any row was scored at.
pub fn deepest_level<R: ScoredRow>(rows: &[R]) -> Option<usize> {
    rows.iter().map(|r| r.level()).max()
}

/// Rows scored at `level`, in input order.
pub fn rows_at_level<R: ScoredRow + Clone>(rows: &[R], level: usize) -> Vec<R> {
    rows.iter().filter(|r| r.level() == level).cloned().collect()
}

/// Keep, for every method, only the rows of the parameter id(s) with the
/// best mean `metric`. Returns the kept rows (input order) and the
/// `(method, parameters)` pairs that won. Tied parameter ids are all kept,
/// so applying this to its own output changes nothing.
pub fn isolate_top_params<R: ScoredRow + Clone>(
    rows: &[R],
    metric: Metric,
    direction: Direction,
) -> (Vec<R>, Vec<(String, String)>) {
    let mut winners: Vec<(String, String)> = Vec::new();

    for method in unique(rows.iter().map(|r| r.method())) {
        let mut sums: Vec<(&str, f64, usize)> = Vec::new();
        let mut slot: AHashMap<&str, usize> = AHashMap::new();
        for r in rows.iter().filter(|r| r.method() == method) {
            let Some(v) = r.score(metric) else { continue };
            let i = *slot.entry(r.parameters()).or_insert_with(|| {
                sums.push((r.parameters(), 0.0, 0));
                sums.len() - 1
            });
            sums[i].1 += v;
            sums[i].2 += 1;
        }

        let means: Vec<(&str, f64)> = sums.iter().map(|(p, s, n)| (*p, s / *n as f64)).collect();
        let mut best: Option<f64> = None;
        for (_, m) in &means {
            if best.map_or(true, |b| direction.better(*m, b)) {
                best = Some(*m);
            }
        }
        if let Some(best) = best {
            for (p, m) in means {
                if m == best {
                    winners.push((method.to_string(), p.to_string()));
                }
            }
        }
    }

    let won: AHashSet<(&str, &str)> = winners.iter().map(|(m, p)| (m.as_str(), p.as_str())).collect();
    let kept = rows
        .iter()
        .filter(|r| won.contains(&(r.method(), r.parameters())))
        .cloned()
        .collect();
    (kept, winners)
}

/// Parameter ids of one method that scored near the top on one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTopParams {
    pub dataset: String,
    pub sample: String,
    pub method: String,
    pub parameters: Vec<String>,
}

/// Mean absolute deviation around the mean.
fn mean_absolute_deviation(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).abs()).sum::<f64>() / values.len() as f64
}

/// For every (dataset, sample, method), the parameter ids whose `metric` is
/// within one mean absolute deviation of the best score, best first.
///
/// Rows are not split by level; pass rows of a single level.
pub fn sample_to_top_params<R: ScoredRow>(rows: &[R], metric: Metric) -> Vec<SampleTopParams> {
    let mut scored: Vec<(&R, f64)> = rows
        .iter()
        .filter_map(|r| r.score(metric).map(|v| (r, v)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let methods = unique(scored.iter().map(|(r, _)| r.method()));
    let mut groups: Vec<((&str, &str), Vec<(&R, f64)>)> = Vec::new();
    let mut slot: AHashMap<(&str, &str), usize> = AHashMap::new();
    for &(r, v) in &scored {
        let key = (r.dataset(), r.sample());
        let i = *slot.entry(key).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[i].1.push((r, v));
    }

    let mut result = Vec::new();
    for ((dataset, sample), members) in &groups {
        for method in &methods {
            let method_rows: Vec<&(&R, f64)> = members.iter().filter(|(r, _)| r.method() == *method).collect();
            if method_rows.is_empty() {
                continue;
            }
            let values: Vec<f64> = method_rows.iter().map(|(_, v)| *v).collect();
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let threshold = max - mean_absolute_deviation(&values);
            result.push(SampleTopParams {
                dataset: dataset.to_string(),
                sample: sample.to_string(),
                method: method.to_string(),
                parameters: method_rows
                    .iter()
                    .filter(|(_, v)| *v >= threshold)
                    .map(|(r, _)| r.parameters().to_string())
                    .collect(),
            });
        }
    }
    result
}

/// How often one parameter id of a method was among the top parameters,
/// one count per requested metric.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTally {
    pub parameters: String,
    pub counts: Vec<usize>,
}

/// Count, per metric, how many samples each parameter id of `method` was a
/// top parameter for. Every parameter id of the method is listed; the table
/// is sorted by the count for the last metric, highest first.
pub fn parameter_comparisons<R: ScoredRow>(rows: &[R], method: &str, metrics: &[Metric]) -> Vec<ParameterTally> {
    let params = unique(rows.iter().filter(|r| r.method() == method).map(|r| r.parameters()));
    let mut tallies: Vec<ParameterTally> = params
        .iter()
        .map(|p| ParameterTally {
            parameters: p.to_string(),
            counts: vec![0; metrics.len()],
        })
        .collect();
    let slot: AHashMap<&str, usize> = params.iter().enumerate().map(|(i, p)| (*p, i)).collect();

    for (i, metric) in metrics.iter().enumerate() {
        for top in sample_to_top_params(rows, *metric).iter().filter(|t| t.method == method) {
            for p in &top.parameters {
                if let Some(&t) = slot.get(p.as_str()) {
                    tallies[t].counts[i] += 1;
                }
            }
        }
    }

    if !metrics.is_empty() {
        let last = metrics.len() - 1;
        tallies.sort_by(|a, b| b.counts[last].cmp(&a.counts[last]));
    }
    tallies
}

/// The score each chosen (method, parameters) reached on one sample, and the
/// best of them.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTopScores {
    pub dataset: String,
    pub sample: String,
    pub scores: BTreeMap<String, Option<f64>>,
    pub top_score: Option<f64>,
}

pub fn sample_to_top_scores<R: ScoredRow>(
    rows: &[R],
    metric: Metric,
    method_params: &BTreeMap<String, String>,
) -> Vec<SampleTopScores> {
    let keys = {
        let mut seen = AHashSet::new();
        rows.iter()
            .map(|r| (r.dataset(), r.sample()))
            .filter(|k| seen.insert(*k))
            .collect::<Vec<_>>()
    };

    keys.into_iter()
        .map(|(dataset, sample)| {
            let scores: BTreeMap<String, Option<f64>> = method_params
                .iter()
                .map(|(method, params)| {
                    let best = rows
                        .iter()
                        .filter(|r| {
                            r.dataset() == dataset
                                && r.sample() == sample
                                && r.method() == method
                                && r.parameters() == params
                        })
                        .filter_map(|r| r.score(metric))
                        .reduce(f64::max);
                    (method.clone(), best)
                })
                .collect();
            let top_score = scores.values().flatten().copied().reduce(f64::max);
            SampleTopScores {
                dataset: dataset.to_string(),
                sample: sample.to_string(),
                scores,
                top_score,
            }
        })
        .collect()
}

/// The best-scoring row of each method within `dataset`, best method first.
/// Ties keep input order. Rows are not split by level; pass rows of a single
/// level.
pub fn method_by_dataset<R: ScoredRow + Clone>(
    rows: &[R],
    dataset: &str,
    metric: Metric,
    direction: Direction,
) -> Vec<R> {
    let mut scored: Vec<(&R, f64)> = rows
        .iter()
        .filter(|r| r.dataset() == dataset)
        .filter_map(|r| r.score(metric).map(|v| (r, v)))
        .collect();
    match direction {
        Direction::Maximize => scored.sort_by(|a, b| b.1.total_cmp(&a.1)),
        Direction::Minimize => scored.sort_by(|a, b| a.1.total_cmp(&b.1)),
    }

    let mut seen = AHashSet::new();
    scored
        .into_iter()
        .filter(|&(r, _)| seen.insert(r.method()))
        .map(|(r, _)| r.clone())
        .collect()
}

/// One method-vs-method significance test.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseComparison {
    pub method_a: String,
    pub method_b: String,
    pub statistic: f64,
    pub p_value: f64,
    pub corrected_p: f64,
}

/// Mean score per (dataset, level, sample) for one method.
fn scores_by_unit<'a, R: ScoredRow>(
    rows: &'a [R],
    method: &str,
    metric: Metric,
) -> BTreeMap<(&'a str, usize, &'a str), f64> {
    let mut acc: BTreeMap<(&str, usize, &str), (f64, usize)> = BTreeMap::new();
    for r in rows.iter().filter(|r| r.method() == method) {
        if let Some(v) = r.score(metric) {
            let e = acc.entry((r.dataset(), r.level(), r.sample())).or_insert((0.0, 0));
            e.0 += v;
            e.1 += 1;
        }
    }
    acc.into_iter().map(|(k, (s, n))| (k, s / n as f64)).collect()
}

/// Test every pair of methods on `metric` and correct the p-values as one
/// batch. Paired tests pair scores on (dataset, level, sample); several rows
/// for the same unit are averaged first, so run [`isolate_top_params`]
/// beforehand to compare best configurations.
pub fn pairwise_method_comparisons<R: ScoredRow>(
    rows: &[R],
    metric: Metric,
    paired: bool,
    parametric: bool,
    correction: Correction,
) -> Vec<PairwiseComparison> {
    let methods = unique(rows.iter().map(|r| r.method()));
    let by_method: AHashMap<&str, BTreeMap<(&str, usize, &str), f64>> = methods
        .iter()
        .map(|m| (*m, scores_by_unit(rows, m, metric)))
        .collect();
    let empty = BTreeMap::new();

    let mut comparisons = Vec::new();
    for (i, a) in methods.iter().enumerate() {
        for b in &methods[i + 1..] {
            let sa = by_method.get(a).unwrap_or(&empty);
            let sb = by_method.get(b).unwrap_or(&empty);
            let (xa, xb): (Vec<f64>, Vec<f64>) = if paired {
                sa.iter()
                    .filter_map(|(k, va)| sb.get(k).map(|vb| (*va, *vb)))
                    .unzip()
            } else {
                (sa.values().copied().collect(), sb.values().copied().collect())
            };
            let TestResult { statistic, p_value } = pairwise_test(&xa, &xb, paired, parametric);
            comparisons.push(PairwiseComparison {
                method_a: a.to_string(),
                method_b: b.to_string(),
                statistic,
                p_value,
                corrected_p: p_value,
            });
        }
    }

    let raw: Vec<f64> = comparisons.iter().map(|c| c.p_value).collect();
    for (c, p) in comparisons.iter_mut().zip(correction.apply(&raw)) {
        c.corrected_p = p;
    }
    comparisons
}

/// Corrected Kruskal-Wallis p-values for one (dataset, metric), one per level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelTestRow {
    pub dataset: String,
    pub metric: Metric,
    pub p_values: Vec<(usize, f64)>,
}

/// At each level, test whether `metric` differs between the groups that
/// `group_by` assigns rows to (usually the method) within a dataset. All
/// p-values of the batch are corrected together; a level where the test
/// cannot run gets `p = 1.0`.
pub fn per_level_kruskal_wallis<R, G>(
    rows: &[R],
    metrics: &[Metric],
    levels: &[usize],
    group_by: G,
    correction: Correction,
) -> Vec<LevelTestRow>
where
    R: ScoredRow,
    G: Fn(&R) -> &str,
{
    let groups_of = unique(rows.iter().map(|r| group_by(r)));
    let mut labels: Vec<(String, Metric)> = Vec::new();
    let mut raw: Vec<f64> = Vec::new();

    for dataset in unique(rows.iter().map(|r| r.dataset())) {
        for metric in metrics {
            labels.push((dataset.to_string(), *metric));
            for level in levels {
                let groups: Vec<Vec<f64>> = groups_of
                    .iter()
                    .map(|g| {
                        rows.iter()
                            .filter(|r| r.dataset() == dataset && r.level() == *level && group_by(*r) == *g)
                            .filter_map(|r| r.score(*metric))
                            .collect()
                    })
                    .collect();
                let p = match kruskal_wallis(&groups) {
                    Ok(res) => res.p_value,
                    Err(e) => {
                        log::debug!("Kruskal-Wallis for {dataset}/{metric}/L{level} not computable ({e})");
                        1.0
                    }
                };
                raw.push(p);
            }
        }
    }

    let corrected = correction.apply(&raw);
    labels
        .into_iter()
        .enumerate()
        .map(|(i, (dataset, metric))| LevelTestRow {
            dataset,
            metric,
            p_values: levels
                .iter()
                .enumerate()
                .map(|(j, level)| (*level, corrected[i * levels.len() + j]))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::mock_score_rows;

    fn top_for<'a>(tops: &'a [SampleTopParams], dataset: &str, sample: &str, method: &str) -> &'a [String] {
        &tops
            .iter()
            .find(|t| t.dataset == dataset && t.sample == sample && t.method == method)
            .unwrap()
            .parameters
    }

    fn per_level_row(dataset: &str, method: &str, value: f64) -> PerLevelAccuracyRow {
        PerLevelAccuracyRow {
            dataset: dataset.to_string(),
            level: 1,
            iteration: "0".to_string(),
            method: method.to_string(),
            parameters: "p".to_string(),
            match_ratio: value,
            precision: None,
            recall: None,
            f_measure: None,
        }
    }

    #[test]
    fn top_params_within_mean_absolute_deviation() {
        let rows = mock_score_rows();
        let tops = sample_to_top_params(&rows, Metric::FMeasure);
        assert_eq!(tops.len(), 6);
        assert_eq!(top_for(&tops, "B1", "m1", "rdp"), ["0.2"]);
        assert_eq!(top_for(&tops, "F2", "m2", "rdp"), ["0.1"]);
        assert_eq!(top_for(&tops, "F2", "m3", "rdp"), ["0", "0.1"]);
        assert_eq!(top_for(&tops, "B1", "m1", "uclust"), ["0.51:0.8:3"]);
        assert_eq!(top_for(&tops, "F2", "m2", "uclust"), ["0.51:0.8:3"]);
        assert_eq!(top_for(&tops, "F2", "m3", "uclust"), ["0.51:0.9:3"]);

        let tops = sample_to_top_params(&rows, Metric::PearsonR);
        assert_eq!(top_for(&tops, "B1", "m1", "rdp"), ["0.1"]);
    }

    #[test]
    fn parameter_tallies_cover_every_parameter_id() {
        let rows = mock_score_rows();
        let metrics = [
            Metric::Precision,
            Metric::Recall,
            Metric::FMeasure,
            Metric::PearsonR,
            Metric::SpearmanR,
        ];
        let tallies = parameter_comparisons(&rows, "rdp", &metrics);
        assert_eq!(tallies.len(), 6);
        let count = |p: &str, m: usize| tallies.iter().find(|t| t.parameters == p).unwrap().counts[m];
        assert_eq!(count("0.1", 2), 2);
        assert_eq!(count("0.2", 2), 1);
        assert_eq!(count("0", 2), 1);
        assert_eq!(count("0.3", 2), 0);
        assert_eq!(count("0.1", 3), 3);
        assert_eq!(count("0.2", 3), 0);
        assert_eq!(count("0", 3), 1);
        assert_eq!(count("0.1", 0), 2);
        assert_eq!(count("0.1", 1), 3);
        assert_eq!(count("0.1", 4), 3);
        assert_eq!(tallies[0].parameters, "0.1");

        let tallies = parameter_comparisons(&rows, "uclust", &metrics);
        assert_eq!(tallies.len(), 2);
        assert_eq!(tallies.iter().find(|t| t.parameters == "0.51:0.8:3").unwrap().counts[2], 2);
        assert_eq!(tallies.iter().find(|t| t.parameters == "0.51:0.9:3").unwrap().counts[2], 1);
    }

    #[test]
    fn top_scores_for_chosen_configurations() {
        let rows = mock_score_rows();
        let mut chosen = BTreeMap::new();
        chosen.insert("rdp".to_string(), "0.1".to_string());
        chosen.insert("uclust".to_string(), "0.51:0.8:3".to_string());

        let scores = sample_to_top_scores(&rows, Metric::FMeasure, &chosen);
        assert_eq!(scores.len(), 3);
        let get = |d: &str, s: &str| scores.iter().find(|x| x.dataset == d && x.sample == s).unwrap();
        assert_eq!(get("B1", "m1").scores["rdp"], Some(0.628571429));
        assert_eq!(get("B1", "m1").scores["uclust"], Some(0.628571429));
        assert_eq!(get("B1", "m1").top_score, Some(0.628571429));
        assert_eq!(get("F2", "m2").scores["rdp"], Some(1.0));
        assert_eq!(get("F2", "m2").scores["uclust"], Some(0.875));
        assert_eq!(get("F2", "m3").top_score, Some(1.0));

        let scores = sample_to_top_scores(&rows, Metric::Precision, &chosen);
        let b1 = scores.iter().find(|x| x.dataset == "B1").unwrap();
        assert_eq!(b1.scores["rdp"], Some(0.47826087));
    }

    #[test]
    fn isolating_top_params_keeps_ties_and_is_idempotent() {
        let rows = mock_score_rows();
        let (best, winners) = isolate_top_params(&rows, Metric::Recall, Direction::Maximize);
        assert_eq!(
            winners,
            vec![
                ("rdp".to_string(), "0.1".to_string()),
                ("uclust".to_string(), "0.51:0.8:3".to_string()),
            ]
        );
        assert_eq!(best.len(), 6);

        let (again, winners_again) = isolate_top_params(&best, Metric::Recall, Direction::Maximize);
        assert_eq!(again, best);
        assert_eq!(winners_again, winners);

        let mut tied = vec![
            per_level_row("d", "m", 0.25),
            per_level_row("d", "m", 0.75),
            per_level_row("d", "m", 0.5),
            per_level_row("d", "m", 0.1),
        ];
        tied[0].parameters = "p1".to_string();
        tied[1].parameters = "p1".to_string();
        tied[2].parameters = "p2".to_string();
        tied[3].parameters = "p3".to_string();
        let (kept, winners) = isolate_top_params(&tied, Metric::MatchRatio, Direction::Maximize);
        assert_eq!(kept.len(), 3);
        assert_eq!(winners.len(), 2);
        let (kept_again, _) = isolate_top_params(&kept, Metric::MatchRatio, Direction::Maximize);
        assert_eq!(kept_again, kept);

        let (worst, _) = isolate_top_params(&rows, Metric::FMeasure, Direction::Minimize);
        assert!(worst.iter().all(|r| r.parameters == "0.5" || r.parameters == "0.51:0.9:3"));
    }

    #[test]
    fn pairwise_comparisons_are_corrected_as_a_batch() {
        let mut rows = Vec::new();
        for (i, v) in [0.9, 0.8, 0.85, 0.95, 0.9].iter().enumerate() {
            let mut a = per_level_row("d", "good", *v);
            a.iteration = i.to_string();
            let mut b = per_level_row("d", "bad", v - 0.3);
            b.iteration = i.to_string();
            let mut c = per_level_row("d", "same", *v);
            c.iteration = i.to_string();
            rows.extend([a, b, c]);
        }
        let cmp = pairwise_method_comparisons(&rows, Metric::MatchRatio, true, true, Correction::Bonferroni);
        assert_eq!(cmp.len(), 3);
        // good vs same: identical paired scores cannot be tested.
        let same = cmp.iter().find(|c| c.method_b == "same" && c.method_a == "good").unwrap();
        assert_eq!(same.p_value, 1.0);
        assert_eq!(same.corrected_p, 1.0);
        for c in &cmp {
            assert!(c.corrected_p >= c.p_value);
        }

        let unpaired = pairwise_method_comparisons(&rows, Metric::MatchRatio, false, false, Correction::None);
        let gb = unpaired.iter().find(|c| c.method_b == "bad").unwrap();
        assert!(gb.p_value < 0.05);
    }

    #[test]
    fn kruskal_wallis_per_dataset_and_level() {
        let data = [
            ("a", "a", 0.1),
            ("a", "a", 0.2),
            ("a", "a", 0.2),
            ("a", "b", 8.0),
            ("a", "b", 9.0),
            ("a", "b", 10.0),
            ("b", "a", 0.1),
            ("b", "a", 0.3),
            ("b", "a", 0.1),
            ("b", "b", 9.0),
            ("b", "b", 11.0),
            ("b", "b", 10.0),
        ];
        let rows: Vec<PerLevelAccuracyRow> = data.iter().map(|(d, m, v)| per_level_row(d, m, *v)).collect();

        let result = per_level_kruskal_wallis(
            &rows,
            &[Metric::MatchRatio],
            &[1],
            |r: &PerLevelAccuracyRow| r.method.as_str(),
            Correction::BenjaminiHochberg,
        );
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].dataset, "a");
        assert_eq!(result[0].p_values.len(), 1);
        assert!((result[0].p_values[0].1 - 0.046301594915110038).abs() < 1e-8);

        // No rows at level 2: every group is empty, p falls back to 1.
        let result = per_level_kruskal_wallis(
            &rows,
            &[Metric::MatchRatio],
            &[2],
            |r: &PerLevelAccuracyRow| r.method.as_str(),
            Correction::None,
        );
        assert_eq!(result[1].p_values, vec![(2, 1.0)]);
    }

    #[test]
    fn kruskal_wallis_groups_by_any_column() {
        let mut rows = Vec::new();
        for (params, values) in [("low", [0.1, 0.2, 0.2]), ("high", [8.0, 9.0, 10.0])] {
            for (i, v) in values.iter().enumerate() {
                // Methods alternate, so grouping by method mixes both parameter sets.
                let mut r = per_level_row("a", if i % 2 == 0 { "m1" } else { "m2" }, *v);
                r.parameters = params.to_string();
                rows.push(r);
            }
        }

        let by_params = per_level_kruskal_wallis(
            &rows,
            &[Metric::MatchRatio],
            &[1],
            |r: &PerLevelAccuracyRow| r.parameters.as_str(),
            Correction::None,
        );
        assert!((by_params[0].p_values[0].1 - 0.046301594915110038).abs() < 1e-8);

        let by_method = per_level_kruskal_wallis(
            &rows,
            &[Metric::MatchRatio],
            &[1],
            |r: &PerLevelAccuracyRow| r.method.as_str(),
            Correction::None,
        );
        assert!(by_method[0].p_values[0].1 > 0.5);
    }

    #[test]
    fn best_row_per_method_in_a_dataset() {
        let rows = mock_score_rows();
        let best = method_by_dataset(&rows, "F2", Metric::FMeasure, Direction::Maximize);
        let picked: Vec<(&str, &str)> = best.iter().map(|r| (r.method.as_str(), r.parameters.as_str())).collect();
        assert_eq!(picked, vec![("rdp", "0"), ("uclust", "0.51:0.9:3")]);

        let best = method_by_dataset(&rows, "B1", Metric::PearsonR, Direction::Maximize);
        assert_eq!(best[0].parameters, "0.1");
        assert!(method_by_dataset(&rows, "nope", Metric::FMeasure, Direction::Maximize).is_empty());
    }

    #[test]
    fn best_row_honours_direction() {
        let rows = vec![
            per_level_row("d", "m1", 0.2),
            per_level_row("d", "m1", 0.9),
            per_level_row("d", "m2", 0.5),
        ];
        let best = method_by_dataset(&rows, "d", Metric::MatchRatio, Direction::Maximize);
        let picked: Vec<(&str, f64)> = best.iter().map(|r| (r.method.as_str(), r.match_ratio)).collect();
        assert_eq!(picked, vec![("m1", 0.9), ("m2", 0.5)]);

        let worst = method_by_dataset(&rows, "d", Metric::MatchRatio, Direction::Minimize);
        let picked: Vec<(&str, f64)> = worst.iter().map(|r| (r.method.as_str(), r.match_ratio)).collect();
        assert_eq!(picked, vec![("m1", 0.2), ("m2", 0.5)]);
    }

    #[test]
    fn ranking_within_one_level() {
        // The coarse level scores higher for the wrong parameters.
        let mut rows = Vec::new();
        for (level, params, value) in [(2, "coarse", 0.99), (2, "fine", 0.5), (6, "coarse", 0.1), (6, "fine", 0.8)] {
            let mut r = per_level_row("d", "m", value);
            r.level = level;
            r.parameters = params.to_string();
            rows.push(r);
        }
        assert_eq!(deepest_level(&rows), Some(6));
        assert_eq!(deepest_level::<PerLevelAccuracyRow>(&[]), None);

        let pooled = method_by_dataset(&rows, "d", Metric::MatchRatio, Direction::Maximize);
        assert_eq!(pooled[0].parameters, "coarse");

        let deepest = rows_at_level(&rows, 6);
        assert_eq!(deepest.len(), 2);
        let best = method_by_dataset(&deepest, "d", Metric::MatchRatio, Direction::Maximize);
        assert_eq!(best[0].parameters, "fine");
        let (_, winners) = isolate_top_params(&deepest, Metric::MatchRatio, Direction::Maximize);
        assert_eq!(winners, vec![("m".to_string(), "fine".to_string())]);
    }

    #[test]
    fn metric_names_parse() {
        assert_eq!("F-measure".parse::<Metric>().unwrap(), Metric::FMeasure);
        assert_eq!("Pearson r".parse::<Metric>().unwrap(), Metric::PearsonR);
        assert_eq!("match_ratio".parse::<Metric>().unwrap(), Metric::MatchRatio);
        assert!("accuracy".parse::<Metric>().is_err());
    }
}
