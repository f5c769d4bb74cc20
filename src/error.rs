// src/error.rs

use std::io;
use std::path::PathBuf;

/// Failure modes of an evaluation run.
///
/// Configuration problems (missing expected table, mismatched taxonomy lists,
/// unknown method) abort the run. Data-quality problems are recovered where
/// they happen and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Couldn't parse BIOM table {path}: {reason}")]
    BiomParse { path: PathBuf, reason: String },

    #[error("Can't find expected table for ({dataset}, {reference})")]
    MissingExpectedTable { dataset: String, reference: String },

    #[error("No expected taxonomy for sequence {seq_id} in {path}")]
    MissingExpectedTaxonomy { seq_id: String, path: PathBuf },

    #[error("Observed and expected taxonomy lists differ in length ({observed} vs {expected})")]
    TaxonomyLengthMismatch { observed: usize, expected: usize },

    #[error("Unknown method '{0}': no parameter schema registered")]
    UnknownMethod(String),

    #[error("Method {method} expects {expected} parameter values, got '{params}'")]
    ParameterArity {
        method: String,
        expected: usize,
        params: String,
    },

    #[error("Malformed dataset id '{0}'")]
    DatasetId(String),

    #[error("Invalid taxonomic level {0}")]
    InvalidLevel(usize),

    #[error("Unknown sample id '{0}'")]
    UnknownSample(String),

    #[error("Unknown observation id '{0}'")]
    UnknownObservation(String),

    #[error("Results directory does not exist: {0}")]
    MissingResultsDir(PathBuf),

    #[error("Malformed results file {path}: {reason}")]
    ResultsFile { path: PathBuf, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl EvalError {
    /// Wrap an `io::Error` with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        EvalError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
