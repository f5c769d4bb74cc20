//src/types.rs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::outcome::Outcome;
use crate::params::ParamValue;
use crate::prf::PrfScore;

/// Which per-sequence evaluation is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestMode {
    /// Query taxa were removed from the reference at a target rank.
    NovelTaxa,
    /// Query and reference are drawn from the same population.
    CrossValidated,
}

impl TestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestMode::NovelTaxa => "novel-taxa",
            TestMode::CrossValidated => "cross-validated",
        }
    }
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "novel-taxa" => Ok(TestMode::NovelTaxa),
            "cross-validated" => Ok(TestMode::CrossValidated),
            other => Err(format!(
                "unknown test mode '{other}' (expected novel-taxa or cross-validated)"
            )),
        }
    }
}

/// One row of a mock-community evaluation: a single sample scored at one
/// taxonomic level for one (dataset, reference, method, parameters) entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResultRow {
    pub dataset: String,
    pub level: usize,
    pub sample_id: String,
    pub reference: String,
    pub method: String,
    pub parameters: String,
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
    pub pearson_r: Option<f64>,
    pub pearson_p: Option<f64>,
    pub spearman_r: Option<f64>,
    pub spearman_p: Option<f64>,
    /// Parameter id decoded through the method's schema.
    pub decoded_params: BTreeMap<String, ParamValue>,
}

/// Precision/recall/F for a per-sequence run: a single triple (novel taxa)
/// or one triple per rank index (cross-validated; slot 0 stays zero).
#[derive(Debug, Clone, PartialEq)]
pub enum LevelScores {
    Scalar(PrfScore),
    PerLevel(Vec<PrfScore>),
}

impl LevelScores {
    /// Score at `level`, when it exists. A scalar score has no level axis.
    pub fn at_level(&self, level: usize) -> Option<PrfScore> {
        match self {
            LevelScores::Scalar(_) => None,
            LevelScores::PerLevel(v) => v.get(level).copied(),
        }
    }

    pub fn precision_field(&self) -> String {
        self.render(|s| s.precision)
    }

    pub fn recall_field(&self) -> String {
        self.render(|s| s.recall)
    }

    pub fn f_measure_field(&self) -> String {
        self.render(|s| s.f_measure)
    }

    fn render(&self, pick: impl Fn(&PrfScore) -> f64) -> String {
        match self {
            LevelScores::Scalar(s) => pick(s).to_string(),
            LevelScores::PerLevel(v) => format_list(v.iter().map(pick)),
        }
    }
}

/// Summary of one per-sequence results directory.
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracySummaryRow {
    pub dataset: String,
    pub level: usize,
    pub iteration: String,
    pub method: String,
    pub parameters: String,
    pub match_ratio: f64,
    pub overclassification_ratio: f64,
    pub underclassification_ratio: f64,
    pub misclassification_ratio: f64,
    /// Count of sequences by the rank index of their first mismatch.
    pub mismatch_level_list: Vec<usize>,
    pub scores: LevelScores,
}

/// One scored sequence, as written to `classification_accuracy_log.tsv`.
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyLogLine {
    pub dataset: String,
    pub level: usize,
    pub iteration: String,
    pub method: String,
    pub parameters: String,
    pub seq_id: String,
    pub observed_taxonomy: String,
    pub expected_taxonomy: String,
    pub outcome: Outcome,
    pub mismatch_level: usize,
}

/// Match ratio (and P/R/F when available) at one rank, split out of an
/// `AccuracySummaryRow`.
#[derive(Debug, Clone, PartialEq)]
pub struct PerLevelAccuracyRow {
    pub dataset: String,
    pub level: usize,
    pub iteration: String,
    pub method: String,
    pub parameters: String,
    pub match_ratio: f64,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f_measure: Option<f64>,
}

/// `[a, b, c]` rendering used for list-valued columns.
pub fn format_list<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    let parts: Vec<String> = items.into_iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// Inverse of [`format_list`].
pub fn parse_list<T: FromStr>(field: &str) -> Option<Vec<T>> {
    let inner = field.trim().strip_prefix('[')?.strip_suffix(']')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    inner.split(',').map(|p| p.trim().parse().ok()).collect()
}
