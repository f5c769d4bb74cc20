// src/prf.rs

use ahash::AHashSet;

use crate::error::{EvalError, Result};
use crate::feature_table::FeatureTable;
use crate::lineage::Lineage;

/// Number of rank slots in a per-level score vector (kingdom..species).
pub const PER_LEVEL_SLOTS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PrfScore {
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
}

impl PrfScore {
    pub const ZERO: PrfScore = PrfScore {
        precision: 0.0,
        recall: 0.0,
        f_measure: 0.0,
    };

    /// Harmonic mean of `precision` and `recall`, zero when both are zero.
    pub fn new(precision: f64, recall: f64) -> Self {
        let f_measure = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        PrfScore {
            precision,
            recall,
            f_measure,
        }
    }

    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.precision, self.recall, self.f_measure)
    }
}

/// Presence/absence precision, recall and F-measure between the taxa seen in
/// a sample and the taxa expected in it.
///
/// No true positives scores `(0, 0, 0)`; there is no error case.
pub fn presence_absence_prf(observed: &AHashSet<String>, expected: &AHashSet<String>) -> PrfScore {
    let tp = observed.intersection(expected).count();
    if tp == 0 {
        return PrfScore::ZERO;
    }
    let fp = observed.difference(expected).count();
    let fn_ = expected.difference(observed).count();

    let p = tp as f64 / (tp + fp) as f64;
    let r = tp as f64 / (tp + fn_) as f64;
    PrfScore::new(p, r)
}

/// Presence/absence PRF between one sample of `actual` and one sample of
/// `expected`. `None` picks the first sample of the table.
///
/// Observation ids have all whitespace removed before comparison, so
/// `"k__A; p__B"` and `"k__A;p__B"` are the same taxon.
pub fn compute_prf(
    actual: &FeatureTable,
    expected: &FeatureTable,
    actual_sample_id: Option<&str>,
    expected_sample_id: Option<&str>,
) -> Result<PrfScore> {
    let actual_ids = actual.observed_ids(actual_sample_id, true)?;
    let expected_ids = expected.observed_ids(expected_sample_id, true)?;
    Ok(presence_absence_prf(&actual_ids, &expected_ids))
}

fn label_depth(label: &str) -> usize {
    label.split(';').count()
}

/// Micro-averaged multi-class PRF over parallel lists of observed and
/// expected labels (`;`-joined lineages).
///
/// Only labels with at least `min_depth` ranks form the label universe.
/// A shallower observed label therefore never counts as a positive
/// prediction, and its expected label still counts against recall.
pub fn label_prf(observed: &[String], expected: &[String], min_depth: usize) -> Result<PrfScore> {
    if observed.len() != expected.len() {
        return Err(EvalError::TaxonomyLengthMismatch {
            observed: observed.len(),
            expected: expected.len(),
        });
    }

    let labels: AHashSet<&str> = observed
        .iter()
        .chain(expected.iter())
        .map(String::as_str)
        .filter(|l| label_depth(l) >= min_depth)
        .collect();

    let mut tp = 0usize;
    let mut predicted = 0usize;
    let mut actual = 0usize;
    for (o, e) in observed.iter().zip(expected.iter()) {
        let o_in = labels.contains(o.as_str());
        if o_in {
            predicted += 1;
        }
        if labels.contains(e.as_str()) {
            actual += 1;
        }
        if o_in && o == e {
            tp += 1;
        }
    }

    let p = if predicted > 0 {
        tp as f64 / predicted as f64
    } else {
        0.0
    };
    let r = if actual > 0 {
        tp as f64 / actual as f64
    } else {
        0.0
    };
    Ok(PrfScore::new(p, r))
}

/// Cross-validated scoring: at each rank in `levels`, truncate both sides to
/// that rank and compute [`label_prf`]. Ranks outside `levels` stay zero.
pub fn per_level_prf(
    observed: &[Lineage],
    expected: &[Lineage],
    levels: impl IntoIterator<Item = usize>,
) -> Result<Vec<PrfScore>> {
    if observed.len() != expected.len() {
        return Err(EvalError::TaxonomyLengthMismatch {
            observed: observed.len(),
            expected: expected.len(),
        });
    }

    let mut scores = vec![PrfScore::ZERO; PER_LEVEL_SLOTS];
    for level in levels {
        let obs: Vec<String> = observed.iter().map(|l| l.truncate(level).joined()).collect();
        let exp: Vec<String> = expected.iter().map(|l| l.truncate(level).joined()).collect();
        if level >= scores.len() {
            scores.resize(level + 1, PrfScore::ZERO);
        }
        scores[level] = label_prf(&obs, &exp, level + 1)?;
    }
    Ok(scores)
}

/// Novel-taxa scoring: the right answer is the true lineage cut back to the
/// parent of the novel rank (`level - 1`). Observed lineages are compared
/// whole, so going deeper than the parent counts as a wrong label.
pub fn novel_taxa_prf(observed: &[Lineage], expected: &[Lineage], level: usize) -> Result<PrfScore> {
    let parent = level.checked_sub(1).ok_or(EvalError::InvalidLevel(level))?;
    let obs: Vec<String> = observed.iter().map(Lineage::joined).collect();
    let exp: Vec<String> = expected.iter().map(|l| l.truncate(parent).joined()).collect();
    label_prf(&obs, &exp, level)
}
