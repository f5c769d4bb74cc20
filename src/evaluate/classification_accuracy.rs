// src/evaluate/classification_accuracy.rs

use std::fs::File;
use std::path::Path;

use ahash::AHashMap;
use rayon::prelude::*;

use crate::assignments::{read_assignments, read_taxonomy_map};
use crate::config::AccuracyEvalConfig;
use crate::discovery::{
    find_classification_result_dirs, ClassificationResultDir, DatasetId, EXPECTED_TAXA_FILENAME,
    OBSERVED_TAXA_FILENAME,
};
use crate::error::{EvalError, Result};
use crate::lineage::{last_common_ancestor_depth, Lineage};
use crate::outcome::{classify_outcome, Outcome};
use crate::prf::{novel_taxa_prf, per_level_prf};
use crate::report::{write_accuracy_log, write_accuracy_summary_file};
use crate::types::{AccuracyLogLine, AccuracySummaryRow, LevelScores, PerLevelAccuracyRow, TestMode};

pub const ACCURACY_LOG_FILENAME: &str = "classification_accuracy_log.tsv";

/// Slots in a fresh mismatch histogram (ranks 0..=7).
const MISMATCH_SLOTS: usize = 8;

/// Ranks reported by cross-validated scoring and per-level extraction.
const SCORED_RANKS: std::ops::RangeInclusive<usize> = 1..=6;

/// Everything computed for one result directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryEvaluation {
    pub summary: AccuracySummaryRow,
    pub log: Vec<AccuracyLogLine>,
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Score every assignment in `dir` against the true taxonomies under
/// `expected_dir/<dataset>/`.
///
/// An assigned sequence with no true taxonomy is a wiring error and aborts.
pub fn evaluate_result_dir(
    dir: &ClassificationResultDir,
    expected_dir: &Path,
    mode: TestMode,
) -> Result<DirectoryEvaluation> {
    let id = DatasetId::parse(&dir.dataset, mode)?;
    let observations = read_assignments(dir.path.join(OBSERVED_TAXA_FILENAME))?;
    let expected_fp = expected_dir.join(&dir.dataset).join(EXPECTED_TAXA_FILENAME);
    let expectations = read_taxonomy_map(&expected_fp)?;

    let mut mismatch_level_list = vec![0usize; MISMATCH_SLOTS];
    let mut counts: AHashMap<Outcome, usize> = AHashMap::new();
    let mut observed = Vec::with_capacity(observations.len());
    let mut expected = Vec::with_capacity(observations.len());
    let mut log_lines = Vec::with_capacity(observations.len());

    for obs in &observations {
        let exp_taxonomy = expectations
            .get(&obs.seq_id)
            .ok_or_else(|| EvalError::MissingExpectedTaxonomy {
                seq_id: obs.seq_id.clone(),
                path: expected_fp.clone(),
            })?;
        let obs_lineage = Lineage::parse(&obs.taxonomy);
        let exp_lineage = Lineage::parse(exp_taxonomy);

        let mismatch_level = last_common_ancestor_depth(&obs_lineage, &exp_lineage);
        if mismatch_level >= mismatch_level_list.len() {
            mismatch_level_list.resize(mismatch_level + 1, 0);
        }
        mismatch_level_list[mismatch_level] += 1;

        let outcome = classify_outcome(mode, &obs_lineage, &exp_lineage, id.level);
        *counts.entry(outcome).or_default() += 1;

        log_lines.push(AccuracyLogLine {
            dataset: id.index.clone(),
            level: id.level,
            iteration: id.iteration.clone(),
            method: dir.method.clone(),
            parameters: dir.parameters.clone(),
            seq_id: obs.seq_id.clone(),
            observed_taxonomy: obs.taxonomy.clone(),
            expected_taxonomy: exp_taxonomy.clone(),
            outcome,
            mismatch_level,
        });
        observed.push(obs_lineage);
        expected.push(exp_lineage);
    }

    let total = observations.len();
    if total == 0 {
        log::warn!("No assignments in {}", dir.path.display());
    }
    let share = |o: Outcome| ratio(counts.get(&o).copied().unwrap_or(0), total);

    let scores = match mode {
        TestMode::NovelTaxa => LevelScores::Scalar(novel_taxa_prf(&observed, &expected, id.level)?),
        TestMode::CrossValidated => LevelScores::PerLevel(per_level_prf(&observed, &expected, SCORED_RANKS)?),
    };

    Ok(DirectoryEvaluation {
        summary: AccuracySummaryRow {
            dataset: id.index,
            level: id.level,
            iteration: id.iteration,
            method: dir.method.clone(),
            parameters: dir.parameters.clone(),
            match_ratio: share(Outcome::Match),
            overclassification_ratio: share(Outcome::Overclassification),
            underclassification_ratio: share(Outcome::Underclassification),
            misclassification_ratio: share(Outcome::Misclassification),
            mismatch_level_list,
            scores,
        },
        log: log_lines,
    })
}

fn write_log_file(dir: &Path, evaluation: &DirectoryEvaluation) -> Result<()> {
    let log_fp = dir.join(ACCURACY_LOG_FILENAME);
    let file = File::create(&log_fp).map_err(|e| EvalError::io(&log_fp, e))?;
    write_accuracy_log(file, &evaluation.log, &evaluation.summary.scores)
}

/// Evaluate every `<dataset>/<method>/<params>/` directory under the
/// configured roots, write the per-directory logs and the summary file, and
/// return the summary rows in discovery order.
pub fn evaluate_classification_accuracy(config: &AccuracyEvalConfig) -> Result<Vec<AccuracySummaryRow>> {
    let mut dirs = Vec::new();
    for root in &config.results_dirs {
        if !root.is_dir() {
            return Err(EvalError::MissingResultsDir(root.clone()));
        }
        dirs.extend(find_classification_result_dirs(root));
    }
    log::info!("Evaluating {} {} result directories", dirs.len(), config.mode);

    let rows: Vec<AccuracySummaryRow> = dirs
        .par_iter()
        .map(|dir| {
            let evaluation = evaluate_result_dir(dir, &config.expected_dir, config.mode)?;
            if config.write_logs {
                write_log_file(&dir.path, &evaluation)?;
            }
            Ok(evaluation.summary)
        })
        .collect::<Result<_>>()?;

    write_accuracy_summary_file(&config.summary_fp, &rows)?;
    log::info!("Wrote summary of {} directories to {}", rows.len(), config.summary_fp.display());
    Ok(rows)
}

/// Split each summary row into one row per rank in 1..=6. The match ratio
/// at rank `L` is the share of sequences that agree with their true
/// lineage beyond rank `L`.
pub fn extract_per_level_accuracy(rows: &[AccuracySummaryRow]) -> Vec<PerLevelAccuracyRow> {
    let mut result = Vec::with_capacity(rows.len() * SCORED_RANKS.count());
    for row in rows {
        let line_count: usize = row.mismatch_level_list.iter().sum();
        for level in SCORED_RANKS {
            let end = (level + 1).min(row.mismatch_level_list.len());
            let cumulative: usize = row.mismatch_level_list[..end].iter().sum();
            let match_ratio = if cumulative < line_count {
                (line_count - cumulative) as f64 / line_count as f64
            } else {
                0.0
            };
            let prf = row.scores.at_level(level);
            result.push(PerLevelAccuracyRow {
                dataset: row.dataset.clone(),
                level,
                iteration: row.iteration.clone(),
                method: row.method.clone(),
                parameters: row.parameters.clone(),
                match_ratio,
                precision: prf.map(|s| s.precision),
                recall: prf.map(|s| s.recall),
                f_measure: prf.map(|s| s.f_measure),
            });
        }
    }
    result
}
