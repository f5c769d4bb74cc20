// src/evaluate/mock_results.rs

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::config::MockEvalConfig;
use crate::discovery::{expected_tables_lookup, find_result_tables, ExpectedTables, ResultTable};
use crate::error::{EvalError, Result};
use crate::feature_table::{actual_and_expected_vectors, mount_observations, Axis, FilterOutcome, MountOptions};
use crate::prf::compute_prf;
use crate::report::{read_mock_results_file, write_mock_results_file};
use crate::stats::{pearson, spearman};
use crate::types::MockResultRow;

/// Taxonomy metadata key of expected tables.
const EXPECTED_MD_KEY: &str = "taxonomy";

/// Score one result table against its expected table at every configured
/// level, one row per (level, sample).
fn evaluate_entry(entry: &ResultTable, expected: &ExpectedTables, config: &MockEvalConfig) -> Result<Vec<MockResultRow>> {
    let expected_fp = expected.get(&entry.dataset, &entry.reference)?;
    let decoded_params = config.schemas.decode(&entry.method, &entry.parameters)?;

    let taxa_to_keep = config.taxa_to_keep.as_deref();
    let expected_opts = MountOptions {
        min_count: config.min_count,
        taxa_to_keep,
        md_key: EXPECTED_MD_KEY,
        unassigned_label: &config.unassigned_label,
    };
    let actual_opts = MountOptions {
        md_key: &config.md_key,
        ..expected_opts.clone()
    };

    let mut rows = Vec::new();
    for &level in &config.levels {
        let expected_table = match mount_observations(expected_fp, level, &expected_opts)? {
            FilterOutcome::Retained(t) => t,
            FilterOutcome::Empty => {
                log::warn!("{} is empty after filtering at level {level}; skipping", expected_fp.display());
                continue;
            }
        };
        let actual_table = match mount_observations(&entry.path, level, &actual_opts)? {
            FilterOutcome::Retained(t) => t,
            FilterOutcome::Empty => {
                log::warn!("{} is empty after filtering at level {level}; skipping", entry.path.display());
                continue;
            }
        };

        for sample_id in actual_table.ids(Axis::Sample) {
            let sample = Some(sample_id.as_str());
            let prf = compute_prf(&actual_table, &expected_table, sample, sample)?;

            let (pearson_r, pearson_p, spearman_r, spearman_p) = if config.correlations {
                let (a, e) = actual_and_expected_vectors(&actual_table, &expected_table, sample, sample)?;
                let (pr, pp) = pearson(&a, &e);
                let (sr, sp) = spearman(&a, &e);
                (Some(pr), Some(pp), Some(sr), Some(sp))
            } else {
                (None, None, None, None)
            };

            rows.push(MockResultRow {
                dataset: entry.dataset.clone(),
                level,
                sample_id: sample_id.clone(),
                reference: entry.reference.clone(),
                method: entry.method.clone(),
                parameters: entry.parameters.clone(),
                precision: prf.precision,
                recall: prf.recall,
                f_measure: prf.f_measure,
                pearson_r,
                pearson_p,
                spearman_r,
                spearman_p,
                decoded_params: decoded_params.clone(),
            });
        }
    }
    log::debug!(
        "{}/{}/{}/{}: {} rows",
        entry.dataset,
        entry.reference,
        entry.method,
        entry.parameters,
        rows.len()
    );
    Ok(rows)
}

/// Precision, recall, F-measure and abundance correlations for every
/// result table, in the order given.
///
/// Every (dataset, reference) pair must have an expected table, and every
/// parameter id must decode under its method's schema; both are checked
/// before any table is read.
/// Entries are scored in parallel.
pub fn compute_mock_results(
    entries: &[ResultTable],
    expected: &ExpectedTables,
    config: &MockEvalConfig,
) -> Result<Vec<MockResultRow>> {
    for entry in entries {
        expected.get(&entry.dataset, &entry.reference)?;
        config.schemas.decode(&entry.method, &entry.parameters)?;
    }

    let per_entry: Vec<Vec<MockResultRow>> = entries
        .par_iter()
        .map(|entry| evaluate_entry(entry, expected, config))
        .collect::<Result<_>>()?;

    Ok(per_entry.into_iter().flatten().collect())
}

/// Result tables under `<results_dir>/<results_dirname>/` for every
/// configured results directory, optionally cut to a random subset.
pub fn collect_result_tables(config: &MockEvalConfig) -> Result<Vec<ResultTable>> {
    let mut entries = Vec::new();
    for results_dir in &config.results_dirs {
        let mock_dir = results_dir.join(&config.results_dirname);
        if !mock_dir.is_dir() {
            return Err(EvalError::MissingResultsDir(mock_dir));
        }
        entries.extend(find_result_tables(&mock_dir, &config.table_pattern));
    }

    if config.subsample {
        let mut rng = match config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        entries.shuffle(&mut rng);
        entries.truncate(config.subsample_size);
    }
    Ok(entries)
}

/// Discover result tables, then either reuse `config.results_fp` or compute
/// and write it. `force` always recomputes.
pub fn evaluate_results(config: &MockEvalConfig) -> Result<Vec<MockResultRow>> {
    let entries = collect_result_tables(config)?;
    log::info!("Found {} result tables", entries.len());

    if config.results_fp.exists() && !config.force {
        log::info!(
            "{} already exists; reading precomputed results (use force to overwrite)",
            config.results_fp.display()
        );
        return read_mock_results_file(&config.results_fp);
    }

    let expected = expected_tables_lookup(&config.expected_dir, &config.expected_pattern, config.expected_level);
    let rows = compute_mock_results(&entries, &expected, config)?;
    write_mock_results_file(&config.results_fp, &rows)?;
    log::info!("Wrote {} rows to {}", rows.len(), config.results_fp.display());
    Ok(rows)
}
