// src/lib.rs
pub mod assignments;
pub mod compare;
pub mod config;
pub mod discovery;
pub mod error;
pub mod evaluate;
pub mod feature_table;
pub mod lineage;
pub mod outcome;
pub mod params;
pub mod prf;
pub mod report;
pub mod stats;
pub mod types;

#[cfg(test)]
mod test_fixtures;

pub use config::{AccuracyEvalConfig, MockEvalConfig};
pub use error::{EvalError, Result};
pub use evaluate::{
    compute_mock_results, evaluate_classification_accuracy, evaluate_results, extract_per_level_accuracy,
};
pub use lineage::{last_common_ancestor_depth, lineages_equal_at, Lineage};
pub use outcome::{classify_cross_validated, classify_novel_taxon, classify_outcome, Outcome};
pub use prf::{compute_prf, PrfScore};
pub use types::{AccuracySummaryRow, MockResultRow, PerLevelAccuracyRow, TestMode};
