// src/config.rs

use std::path::PathBuf;

use crate::discovery::{DEFAULT_EXPECTED_PATTERN, DEFAULT_TABLE_PATTERN};
use crate::params::ParamSchemas;
use crate::types::TestMode;

/// Settings for a mock-community evaluation run.
#[derive(Debug, Clone)]
pub struct MockEvalConfig {
    /// Roots holding precomputed results; each is searched under
    /// `<root>/<results_dirname>/`.
    pub results_dirs: Vec<PathBuf>,
    pub results_dirname: String,
    /// Root of `<dataset>/<reference>/expected/` tables.
    pub expected_dir: PathBuf,
    /// Tab-delimited results file, reused on later runs unless `force`.
    pub results_fp: PathBuf,
    pub table_pattern: String,
    /// Expected table file name; `{level}` is replaced by `expected_level`.
    pub expected_pattern: String,
    pub expected_level: usize,
    /// Ranks to collapse to and score.
    pub levels: Vec<usize>,
    pub min_count: f64,
    pub taxa_to_keep: Option<Vec<String>>,
    /// Metadata key holding taxonomy in the observed tables. Expected tables
    /// always use `taxonomy`.
    pub md_key: String,
    pub unassigned_label: String,
    pub schemas: ParamSchemas,
    pub correlations: bool,
    /// Evaluate a random subset of `subsample_size` result tables.
    pub subsample: bool,
    pub subsample_size: usize,
    /// Fixed seed for reproducible subsets; `None` draws one from the OS.
    pub seed: Option<u64>,
    pub force: bool,
}

impl Default for MockEvalConfig {
    fn default() -> Self {
        MockEvalConfig {
            results_dirs: Vec::new(),
            results_dirname: "mock-community".to_string(),
            expected_dir: PathBuf::new(),
            results_fp: PathBuf::from("mock_results.tsv"),
            table_pattern: DEFAULT_TABLE_PATTERN.to_string(),
            expected_pattern: DEFAULT_EXPECTED_PATTERN.to_string(),
            expected_level: 6,
            levels: (2..=6).collect(),
            min_count: 0.0,
            taxa_to_keep: None,
            md_key: "taxonomy".to_string(),
            unassigned_label: "Unassigned".to_string(),
            schemas: ParamSchemas::default(),
            correlations: true,
            subsample: false,
            subsample_size: 10,
            seed: None,
            force: false,
        }
    }
}

/// Settings for a per-sequence (novel-taxa or cross-validated) run.
#[derive(Debug, Clone)]
pub struct AccuracyEvalConfig {
    /// Roots of `<dataset>/<method>/<params>/` result directories.
    pub results_dirs: Vec<PathBuf>,
    /// Root of `<dataset>/query_taxa.tsv` expectations.
    pub expected_dir: PathBuf,
    /// Comma-delimited summary output.
    pub summary_fp: PathBuf,
    pub mode: TestMode,
    /// Write `classification_accuracy_log.tsv` into each result directory.
    pub write_logs: bool,
}

impl Default for AccuracyEvalConfig {
    fn default() -> Self {
        AccuracyEvalConfig {
            results_dirs: Vec::new(),
            expected_dir: PathBuf::new(),
            summary_fp: PathBuf::from("evaluate_classification_summary.csv"),
            mode: TestMode::NovelTaxa,
            write_logs: true,
        }
    }
}
