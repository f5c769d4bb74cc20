// src/report.rs
//
// Delimited text formats written and re-read by the evaluation drivers.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::path::Path;

use crate::compare::{LevelTestRow, PairwiseComparison, ParameterTally};
use crate::error::{EvalError, Result};
use crate::outcome::Outcome;
use crate::params::ParamValue;
use crate::prf::PrfScore;
use crate::types::{
    format_list, parse_list, AccuracyLogLine, AccuracySummaryRow, LevelScores, MockResultRow,
    PerLevelAccuracyRow,
};

pub const MOCK_RESULT_COLUMNS: [&str; 13] = [
    "Dataset",
    "Level",
    "SampleID",
    "Reference",
    "Method",
    "Parameters",
    "Precision",
    "Recall",
    "F-measure",
    "Pearson r",
    "Pearson p",
    "Spearman r",
    "Spearman p",
];

pub const SUMMARY_COLUMNS: [&str; 13] = [
    "Dataset",
    "level",
    "iteration",
    "Method",
    "Parameters",
    "match_ratio",
    "overclassification_ratio",
    "underclassification_ratio",
    "misclassification_ratio",
    "mismatch_level_list",
    "Precision",
    "Recall",
    "F-measure",
];

pub const LOG_COLUMNS: [&str; 13] = [
    "dataset",
    "level",
    "iteration",
    "method",
    "parameters",
    "seq_id",
    "observed_taxonomy",
    "expected_taxonomy",
    "result",
    "mismatch_level",
    "precision",
    "recall",
    "f_measure",
];

fn opt_field(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn tsv_writer<W: Write>(w: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().delimiter(b'\t').from_writer(w)
}

/// Write mock-community rows as a tab-delimited table. Decoded parameter
/// columns follow the fixed columns, sorted by name; a row whose method
/// lacks a parameter leaves that cell empty.
pub fn write_mock_results<W: Write>(w: W, rows: &[MockResultRow]) -> Result<()> {
    let param_columns: BTreeSet<&str> = rows
        .iter()
        .flat_map(|r| r.decoded_params.keys().map(String::as_str))
        .collect();

    let mut wtr = tsv_writer(w);
    let mut header: Vec<&str> = MOCK_RESULT_COLUMNS.to_vec();
    header.extend(param_columns.iter().copied());
    wtr.write_record(&header)?;

    for r in rows {
        let mut record = vec![
            r.dataset.clone(),
            r.level.to_string(),
            r.sample_id.clone(),
            r.reference.clone(),
            r.method.clone(),
            r.parameters.clone(),
            r.precision.to_string(),
            r.recall.to_string(),
            r.f_measure.to_string(),
            opt_field(r.pearson_r),
            opt_field(r.pearson_p),
            opt_field(r.spearman_r),
            opt_field(r.spearman_p),
        ];
        record.extend(
            param_columns
                .iter()
                .map(|c| r.decoded_params.get(*c).map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(|e| EvalError::io("<mock results>", e))?;
    Ok(())
}

pub fn write_mock_results_file<P: AsRef<Path>>(path: P, rows: &[MockResultRow]) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| EvalError::io(path, e))?;
    write_mock_results(file, rows)
}

/// Column lookup by header name.
struct Columns {
    names: Vec<String>,
}

impl Columns {
    fn new(headers: &csv::StringRecord) -> Self {
        Columns {
            names: headers.iter().map(str::to_string).collect(),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Parses rows written by [`write_mock_results`]. A leading unnamed index
/// column is tolerated.
pub fn read_mock_results<R: Read>(r: R, source: &Path) -> Result<Vec<MockResultRow>> {
    let mut rdr = csv::ReaderBuilder::new().delimiter(b'\t').from_reader(r);
    let cols = Columns::new(rdr.headers()?);

    let bad = |reason: String| EvalError::ResultsFile {
        path: source.to_path_buf(),
        reason,
    };
    let mut fixed = Vec::with_capacity(MOCK_RESULT_COLUMNS.len());
    for name in MOCK_RESULT_COLUMNS {
        fixed.push(
            cols.position(name)
                .ok_or_else(|| bad(format!("missing column '{name}'")))?,
        );
    }
    let param_columns: Vec<(usize, String)> = cols
        .names
        .iter()
        .enumerate()
        .filter(|(i, n)| !fixed.contains(i) && !n.is_empty())
        .map(|(i, n)| (i, n.clone()))
        .collect();

    let mut rows = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let text = |k: usize| record.get(fixed[k]).unwrap_or("").to_string();
        let number = |k: usize| -> Result<f64> {
            let raw = record.get(fixed[k]).unwrap_or("");
            raw.trim()
                .parse::<f64>()
                .map_err(|_| bad(format!("row {}: bad {} '{raw}'", line + 1, MOCK_RESULT_COLUMNS[k])))
        };
        let optional = |k: usize| -> Result<Option<f64>> {
            match record.get(fixed[k]).unwrap_or("").trim() {
                "" => Ok(None),
                _ => number(k).map(Some),
            }
        };
        let level = text(1)
            .trim()
            .parse::<usize>()
            .map_err(|_| bad(format!("row {}: bad Level '{}'", line + 1, text(1))))?;

        let decoded_params: BTreeMap<String, ParamValue> = param_columns
            .iter()
            .filter_map(|(i, name)| {
                record
                    .get(*i)
                    .filter(|v| !v.is_empty())
                    .map(|v| (name.clone(), ParamValue::parse(v)))
            })
            .collect();

        rows.push(MockResultRow {
            dataset: text(0),
            level,
            sample_id: text(2),
            reference: text(3),
            method: text(4),
            parameters: text(5),
            precision: number(6)?,
            recall: number(7)?,
            f_measure: number(8)?,
            pearson_r: optional(9)?,
            pearson_p: optional(10)?,
            spearman_r: optional(11)?,
            spearman_p: optional(12)?,
            decoded_params,
        });
    }
    Ok(rows)
}

pub fn read_mock_results_file<P: AsRef<Path>>(path: P) -> Result<Vec<MockResultRow>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| EvalError::io(path, e))?;
    read_mock_results(file, path)
}

/// Write per-directory accuracy summaries as comma-delimited text.
pub fn write_accuracy_summary<W: Write>(w: W, rows: &[AccuracySummaryRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(w);
    wtr.write_record(SUMMARY_COLUMNS)?;
    for r in rows {
        wtr.write_record([
            r.dataset.clone(),
            r.level.to_string(),
            r.iteration.clone(),
            r.method.clone(),
            r.parameters.clone(),
            r.match_ratio.to_string(),
            r.overclassification_ratio.to_string(),
            r.underclassification_ratio.to_string(),
            r.misclassification_ratio.to_string(),
            format_list(&r.mismatch_level_list),
            r.scores.precision_field(),
            r.scores.recall_field(),
            r.scores.f_measure_field(),
        ])?;
    }
    wtr.flush().map_err(|e| EvalError::io("<accuracy summary>", e))?;
    Ok(())
}

pub fn write_accuracy_summary_file<P: AsRef<Path>>(path: P, rows: &[AccuracySummaryRow]) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| EvalError::io(path, e))?;
    write_accuracy_summary(file, rows)
}

/// Scalar text or a `[..]` list, one value per level.
fn parse_scores(p: &str, r: &str, f: &str) -> Option<LevelScores> {
    if p.trim_start().starts_with('[') {
        let (p, r, f) = (parse_list::<f64>(p)?, parse_list::<f64>(r)?, parse_list::<f64>(f)?);
        if p.len() != r.len() || p.len() != f.len() {
            return None;
        }
        let scores = p
            .iter()
            .zip(&r)
            .zip(&f)
            .map(|((p, r), f)| PrfScore {
                precision: *p,
                recall: *r,
                f_measure: *f,
            })
            .collect();
        Some(LevelScores::PerLevel(scores))
    } else {
        Some(LevelScores::Scalar(PrfScore {
            precision: p.trim().parse().ok()?,
            recall: r.trim().parse().ok()?,
            f_measure: f.trim().parse().ok()?,
        }))
    }
}

pub fn read_accuracy_summary<R: Read>(r: R, source: &Path) -> Result<Vec<AccuracySummaryRow>> {
    let mut rdr = csv::Reader::from_reader(r);
    let cols = Columns::new(rdr.headers()?);
    let bad = |reason: String| EvalError::ResultsFile {
        path: source.to_path_buf(),
        reason,
    };
    let mut at = Vec::with_capacity(SUMMARY_COLUMNS.len());
    for name in SUMMARY_COLUMNS {
        at.push(
            cols.position(name)
                .ok_or_else(|| bad(format!("missing column '{name}'")))?,
        );
    }

    let mut rows = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let field = |k: usize| record.get(at[k]).unwrap_or("");
        let invalid = |k: usize| bad(format!("row {}: bad {} '{}'", line + 1, SUMMARY_COLUMNS[k], field(k)));
        let ratio = |k: usize| field(k).trim().parse::<f64>().map_err(|_| invalid(k));

        rows.push(AccuracySummaryRow {
            dataset: field(0).to_string(),
            level: field(1).trim().parse().map_err(|_| invalid(1))?,
            iteration: field(2).to_string(),
            method: field(3).to_string(),
            parameters: field(4).to_string(),
            match_ratio: ratio(5)?,
            overclassification_ratio: ratio(6)?,
            underclassification_ratio: ratio(7)?,
            misclassification_ratio: ratio(8)?,
            mismatch_level_list: parse_list(field(9)).ok_or_else(|| invalid(9))?,
            scores: parse_scores(field(10), field(11), field(12)).ok_or_else(|| invalid(10))?,
        });
    }
    Ok(rows)
}

pub fn read_accuracy_summary_file<P: AsRef<Path>>(path: P) -> Result<Vec<AccuracySummaryRow>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| EvalError::io(path, e))?;
    read_accuracy_summary(file, path)
}

/// One line per scored sequence, followed by the directory's scores.
pub fn write_accuracy_log<W: Write>(w: W, lines: &[AccuracyLogLine], scores: &LevelScores) -> Result<()> {
    let mut wtr = tsv_writer(w);
    wtr.write_record(LOG_COLUMNS)?;
    let (p, r, f) = (scores.precision_field(), scores.recall_field(), scores.f_measure_field());
    for l in lines {
        wtr.write_record([
            l.dataset.clone(),
            l.level.to_string(),
            l.iteration.clone(),
            l.method.clone(),
            l.parameters.clone(),
            l.seq_id.clone(),
            l.observed_taxonomy.clone(),
            l.expected_taxonomy.clone(),
            l.outcome.to_string(),
            l.mismatch_level.to_string(),
            p.clone(),
            r.clone(),
            f.clone(),
        ])?;
    }
    wtr.flush().map_err(|e| EvalError::io("<accuracy log>", e))?;
    Ok(())
}

/// Outcome column of an accuracy log, for spot checks and re-tallying.
pub fn read_log_outcomes<R: Read>(r: R, source: &Path) -> Result<Vec<Outcome>> {
    let mut rdr = csv::ReaderBuilder::new().delimiter(b'\t').from_reader(r);
    let col = Columns::new(rdr.headers()?)
        .position("result")
        .ok_or_else(|| EvalError::ResultsFile {
            path: source.to_path_buf(),
            reason: "missing column 'result'".to_string(),
        })?;
    let mut outcomes = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let raw = record.get(col).unwrap_or("");
        outcomes.push(raw.parse::<Outcome>().map_err(|reason| EvalError::ResultsFile {
            path: source.to_path_buf(),
            reason,
        })?);
    }
    Ok(outcomes)
}

pub fn write_per_level_accuracy<W: Write>(w: W, rows: &[PerLevelAccuracyRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(w);
    wtr.write_record([
        "Dataset",
        "level",
        "iteration",
        "Method",
        "Parameters",
        "match_ratio",
        "Precision",
        "Recall",
        "F-measure",
    ])?;
    for r in rows {
        wtr.write_record([
            r.dataset.clone(),
            r.level.to_string(),
            r.iteration.clone(),
            r.method.clone(),
            r.parameters.clone(),
            r.match_ratio.to_string(),
            opt_field(r.precision),
            opt_field(r.recall),
            opt_field(r.f_measure),
        ])?;
    }
    wtr.flush().map_err(|e| EvalError::io("<per-level accuracy>", e))?;
    Ok(())
}

pub fn write_pairwise_comparisons<W: Write>(w: W, comparisons: &[PairwiseComparison]) -> Result<()> {
    let mut wtr = tsv_writer(w);
    wtr.write_record(["Method A", "Method B", "stat", "P", "FDR P"])?;
    for c in comparisons {
        wtr.write_record([
            c.method_a.clone(),
            c.method_b.clone(),
            c.statistic.to_string(),
            c.p_value.to_string(),
            c.corrected_p.to_string(),
        ])?;
    }
    wtr.flush().map_err(|e| EvalError::io("<pairwise comparisons>", e))?;
    Ok(())
}

/// One row per (dataset, metric), one column per level.
pub fn write_level_tests<W: Write>(w: W, rows: &[LevelTestRow]) -> Result<()> {
    let levels: BTreeSet<usize> = rows
        .iter()
        .flat_map(|r| r.p_values.iter().map(|(l, _)| *l))
        .collect();
    let mut wtr = tsv_writer(w);
    let mut header = vec!["Dataset".to_string(), "Variable".to_string()];
    header.extend(levels.iter().map(|l| l.to_string()));
    wtr.write_record(&header)?;
    for r in rows {
        let mut record = vec![r.dataset.clone(), r.metric.to_string()];
        record.extend(levels.iter().map(|l| {
            r.p_values
                .iter()
                .find(|(lv, _)| lv == l)
                .map(|(_, p)| p.to_string())
                .unwrap_or_default()
        }));
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(|e| EvalError::io("<level tests>", e))?;
    Ok(())
}

pub fn write_parameter_tallies<W: Write>(
    w: W,
    tallies: &[ParameterTally],
    metric_names: &[String],
) -> Result<()> {
    let mut wtr = tsv_writer(w);
    let mut header = vec!["Parameters".to_string()];
    header.extend(metric_names.iter().cloned());
    wtr.write_record(&header)?;
    for t in tallies {
        let mut record = vec![t.parameters.clone()];
        record.extend(t.counts.iter().map(|c| c.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(|e| EvalError::io("<parameter tallies>", e))?;
    Ok(())
}
