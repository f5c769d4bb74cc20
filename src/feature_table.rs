// src/feature_table.rs

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use ahash::{AHashMap, AHashSet};
use flate2::read::MultiGzDecoder;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{EvalError, Result};
use crate::lineage::Lineage;

/// Free-form metadata attached to one observation or sample.
pub type Metadata = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Observation,
    Sample,
}

#[derive(Deserialize)]
struct BiomEntry {
    id: String,
    #[serde(default)]
    metadata: Option<Metadata>,
}

/// The subset of BIOM 1.0 JSON we read.
#[derive(Deserialize)]
struct BiomJson {
    matrix_type: String,
    shape: [usize; 2],
    data: Vec<Vec<f64>>,
    rows: Vec<BiomEntry>,
    columns: Vec<BiomEntry>,
}

/// Observation-by-sample abundance table with per-axis ids and metadata.
///
/// Values are held densely; mock-community tables have at most a few hundred
/// observations.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    observation_ids: Vec<String>,
    sample_ids: Vec<String>,
    observation_metadata: Vec<Option<Metadata>>,
    sample_metadata: Vec<Option<Metadata>>,
    /// `data[observation][sample]`
    data: Vec<Vec<f64>>,
    observation_index: AHashMap<String, usize>,
    sample_index: AHashMap<String, usize>,
}

fn index_ids(ids: &[String]) -> AHashMap<String, usize> {
    ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect()
}

/// A sparse coordinate must be a whole, non-negative number below `bound`.
fn sparse_coordinate(v: f64, bound: usize) -> Option<usize> {
    if !v.is_finite() || v < 0.0 || v.fract() != 0.0 || v >= bound as f64 {
        return None;
    }
    Some(v as usize)
}

impl FeatureTable {
    /// Load a BIOM 1.0 JSON table. Files ending in `.gz` are decompressed
    /// on the fly.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| EvalError::io(path, e))?;

        let is_gz = path.extension().map(|ext| ext == "gz").unwrap_or(false);
        let reader: Box<dyn Read> = if is_gz {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        let biom: BiomJson = serde_json::from_reader(reader).map_err(|e| EvalError::BiomParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_biom(biom, path)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let origin = PathBuf::from("<string>");
        let biom: BiomJson = serde_json::from_str(text).map_err(|e| EvalError::BiomParse {
            path: origin.clone(),
            reason: e.to_string(),
        })?;
        Self::from_biom(biom, &origin)
    }

    fn from_biom(biom: BiomJson, path: &Path) -> Result<Self> {
        let parse_err = |reason: String| EvalError::BiomParse {
            path: path.to_path_buf(),
            reason,
        };

        let [n_obs, n_samples] = biom.shape;
        if biom.rows.len() != n_obs || biom.columns.len() != n_samples {
            return Err(parse_err(format!(
                "shape {n_obs}x{n_samples} does not match {} rows and {} columns",
                biom.rows.len(),
                biom.columns.len()
            )));
        }

        let mut data = vec![vec![0.0; n_samples]; n_obs];
        match biom.matrix_type.as_str() {
            "sparse" => {
                for entry in &biom.data {
                    if entry.len() != 3 {
                        return Err(parse_err(format!("sparse entry {entry:?} is not [row, col, value]")));
                    }
                    let coords = (sparse_coordinate(entry[0], n_obs), sparse_coordinate(entry[1], n_samples));
                    let (Some(r), Some(c)) = coords else {
                        return Err(parse_err(format!(
                            "sparse entry ({}, {}) is not a valid index into a {n_obs}x{n_samples} table",
                            entry[0], entry[1]
                        )));
                    };
                    data[r][c] = entry[2];
                }
            }
            "dense" => {
                if biom.data.len() != n_obs || biom.data.iter().any(|row| row.len() != n_samples) {
                    return Err(parse_err("dense data does not match the declared shape".into()));
                }
                data = biom.data;
            }
            other => return Err(parse_err(format!("unsupported matrix_type '{other}'"))),
        }

        let (observation_ids, observation_metadata): (Vec<_>, Vec<_>) =
            biom.rows.into_iter().map(|e| (e.id, e.metadata)).unzip();
        let (sample_ids, sample_metadata): (Vec<_>, Vec<_>) =
            biom.columns.into_iter().map(|e| (e.id, e.metadata)).unzip();

        Ok(FeatureTable {
            observation_index: index_ids(&observation_ids),
            sample_index: index_ids(&sample_ids),
            observation_ids,
            sample_ids,
            observation_metadata,
            sample_metadata,
            data,
        })
    }

    pub fn ids(&self, axis: Axis) -> &[String] {
        match axis {
            Axis::Observation => &self.observation_ids,
            Axis::Sample => &self.sample_ids,
        }
    }

    pub fn index(&self, id: &str, axis: Axis) -> Result<usize> {
        match axis {
            Axis::Observation => self
                .observation_index
                .get(id)
                .copied()
                .ok_or_else(|| EvalError::UnknownObservation(id.to_string())),
            Axis::Sample => self
                .sample_index
                .get(id)
                .copied()
                .ok_or_else(|| EvalError::UnknownSample(id.to_string())),
        }
    }

    pub fn get_value(&self, observation_id: &str, sample_id: &str) -> Result<f64> {
        let o = self.index(observation_id, Axis::Observation)?;
        let s = self.index(sample_id, Axis::Sample)?;
        Ok(self.data[o][s])
    }

    pub fn metadata(&self, idx: usize, axis: Axis) -> Option<&Metadata> {
        let md = match axis {
            Axis::Observation => self.observation_metadata.get(idx),
            Axis::Sample => self.sample_metadata.get(idx),
        };
        md.and_then(|m| m.as_ref())
    }

    /// Values along `axis` at position `idx`: a row for an observation, a
    /// column for a sample.
    pub fn data_vector(&self, idx: usize, axis: Axis) -> Vec<f64> {
        match axis {
            Axis::Observation => self.data[idx].clone(),
            Axis::Sample => self.data.iter().map(|row| row[idx]).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.observation_ids.is_empty() || self.sample_ids.is_empty()
    }

    /// New table with only the ids along `axis` for which `keep` holds.
    /// `keep` receives the data vector, the id and the metadata.
    pub fn filter<F>(&self, keep: F, axis: Axis) -> FeatureTable
    where
        F: Fn(&[f64], &str, Option<&Metadata>) -> bool,
    {
        let kept: Vec<usize> = (0..self.ids(axis).len())
            .filter(|&i| keep(&self.data_vector(i, axis), &self.ids(axis)[i], self.metadata(i, axis)))
            .collect();

        match axis {
            Axis::Observation => {
                let observation_ids: Vec<String> =
                    kept.iter().map(|&i| self.observation_ids[i].clone()).collect();
                FeatureTable {
                    observation_index: index_ids(&observation_ids),
                    observation_ids,
                    observation_metadata: kept
                        .iter()
                        .map(|&i| self.observation_metadata[i].clone())
                        .collect(),
                    data: kept.iter().map(|&i| self.data[i].clone()).collect(),
                    sample_ids: self.sample_ids.clone(),
                    sample_metadata: self.sample_metadata.clone(),
                    sample_index: self.sample_index.clone(),
                }
            }
            Axis::Sample => {
                let sample_ids: Vec<String> = kept.iter().map(|&i| self.sample_ids[i].clone()).collect();
                FeatureTable {
                    sample_index: index_ids(&sample_ids),
                    sample_ids,
                    sample_metadata: kept.iter().map(|&i| self.sample_metadata[i].clone()).collect(),
                    data: self
                        .data
                        .iter()
                        .map(|row| kept.iter().map(|&i| row[i]).collect())
                        .collect(),
                    observation_ids: self.observation_ids.clone(),
                    observation_metadata: self.observation_metadata.clone(),
                    observation_index: self.observation_index.clone(),
                }
            }
        }
    }

    /// Merge observations that map to the same group id by summing their
    /// rows. Groups keep first-seen order; groups with fewer than
    /// `min_group_size` members are dropped. Each collapsed observation
    /// records its members under `collapsed_ids`.
    pub fn collapse_observations<F>(&self, group: F, min_group_size: usize) -> FeatureTable
    where
        F: Fn(&str, Option<&Metadata>) -> String,
    {
        let n_samples = self.sample_ids.len();
        let mut order: Vec<String> = Vec::new();
        let mut groups: AHashMap<String, (Vec<f64>, Vec<String>)> = AHashMap::new();

        for (i, id) in self.observation_ids.iter().enumerate() {
            let key = group(id, self.metadata(i, Axis::Observation));
            let (sums, members) = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                (vec![0.0; n_samples], Vec::new())
            });
            for (acc, v) in sums.iter_mut().zip(&self.data[i]) {
                *acc += v;
            }
            members.push(id.clone());
        }

        let mut observation_ids = Vec::with_capacity(order.len());
        let mut observation_metadata = Vec::with_capacity(order.len());
        let mut data = Vec::with_capacity(order.len());
        for key in order {
            if let Some((sums, members)) = groups.remove(&key) {
                if members.len() < min_group_size {
                    continue;
                }
                let mut md = Metadata::new();
                md.insert(
                    "collapsed_ids".to_string(),
                    Value::Array(members.into_iter().map(Value::String).collect()),
                );
                observation_ids.push(key);
                observation_metadata.push(Some(md));
                data.push(sums);
            }
        }

        FeatureTable {
            observation_index: index_ids(&observation_ids),
            observation_ids,
            observation_metadata,
            data,
            sample_ids: self.sample_ids.clone(),
            sample_metadata: self.sample_metadata.clone(),
            sample_index: self.sample_index.clone(),
        }
    }

    fn sample_or_first(&self, sample_id: Option<&str>) -> Result<usize> {
        match sample_id {
            Some(id) => self.index(id, Axis::Sample),
            None if !self.sample_ids.is_empty() => Ok(0),
            None => Err(EvalError::UnknownSample("<first sample of empty table>".to_string())),
        }
    }

    /// Observation ids with a value greater than zero in `sample_id` (the
    /// first sample when `None`). With `strip_whitespace`, all whitespace is
    /// removed from the ids.
    pub fn observed_ids(&self, sample_id: Option<&str>, strip_whitespace: bool) -> Result<AHashSet<String>> {
        let s = self.sample_or_first(sample_id)?;
        Ok(self
            .observation_ids
            .iter()
            .zip(&self.data)
            .filter(|(_, row)| row[s] > 0.0)
            .map(|(id, _)| {
                if strip_whitespace {
                    id.chars().filter(|c| !c.is_whitespace()).collect()
                } else {
                    id.clone()
                }
            })
            .collect())
    }
}

/// Taxonomy labels stored under `md_key`, either as a `;`-joined string or
/// as an array of strings. Anything else is treated as missing.
pub fn metadata_taxonomy(md: Option<&Metadata>, md_key: &str) -> Option<Lineage> {
    match md?.get(md_key)? {
        Value::String(s) => Some(Lineage::parse(s)),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(Lineage::new),
        _ => None,
    }
}

/// Grouping function for [`FeatureTable::collapse_observations`]: the
/// observation's taxonomy truncated to `level` (ranks `0..=level`).
/// Observations without usable taxonomy metadata fall into `unassigned_label`.
pub fn taxonomy_collapser<'a>(
    level: usize,
    md_key: &'a str,
    unassigned_label: &'a str,
) -> impl Fn(&str, Option<&Metadata>) -> String + 'a {
    move |id, md| match metadata_taxonomy(md, md_key) {
        Some(lineage) => lineage.truncate(level).joined(),
        None => {
            log::warn!("Observation {id} has no '{md_key}' metadata; using '{unassigned_label}'");
            unassigned_label.to_string()
        }
    }
}

/// Result of filtering a table.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    Retained(FeatureTable),
    /// Nothing survived the filter.
    Empty,
}

/// Keep observations with a total count of at least `min_count` that are
/// assigned to `taxa_to_keep`, matched as a `;`-joined prefix of either the
/// observation id or its taxonomy metadata. `None` keeps every taxon.
pub fn filter_table(
    table: &FeatureTable,
    min_count: f64,
    taxa_to_keep: Option<&[String]>,
    md_key: &str,
) -> FilterOutcome {
    let prefix: Option<String> = taxa_to_keep.map(|taxa| {
        taxa.iter()
            .map(|t| t.trim())
            .collect::<Vec<_>>()
            .join(";")
    });

    let filtered = table.filter(
        |values, id, md| {
            let sufficient_count = values.iter().sum::<f64>() >= min_count;
            let allowed_taxa = match &prefix {
                None => true,
                Some(p) => {
                    id.starts_with(p.as_str())
                        || metadata_taxonomy(md, md_key)
                            .map(|l| l.joined().starts_with(p.as_str()))
                            .unwrap_or(false)
                }
            };
            sufficient_count && allowed_taxa
        },
        Axis::Observation,
    );

    if filtered.is_empty() {
        FilterOutcome::Empty
    } else {
        FilterOutcome::Retained(filtered)
    }
}

/// Options for [`mount_observations`].
#[derive(Debug, Clone)]
pub struct MountOptions<'a> {
    pub min_count: f64,
    pub taxa_to_keep: Option<&'a [String]>,
    pub md_key: &'a str,
    pub unassigned_label: &'a str,
}

/// Load a table, filter it (when a minimum count or a taxon prefix is set)
/// and collapse its observations by taxonomy at `level`.
pub fn mount_observations<P: AsRef<Path>>(
    path: P,
    level: usize,
    opts: &MountOptions<'_>,
) -> Result<FilterOutcome> {
    let mut table = FeatureTable::load(path.as_ref())?;

    if opts.min_count > 0.0 || opts.taxa_to_keep.is_some() {
        table = match filter_table(&table, opts.min_count, opts.taxa_to_keep, opts.md_key) {
            FilterOutcome::Retained(t) => t,
            FilterOutcome::Empty => return Ok(FilterOutcome::Empty),
        };
    }

    let collapser = taxonomy_collapser(level, opts.md_key, opts.unassigned_label);
    let collapsed = table.collapse_observations(collapser, 1);
    if collapsed.is_empty() {
        Ok(FilterOutcome::Empty)
    } else {
        Ok(FilterOutcome::Retained(collapsed))
    }
}

/// Abundance vectors over the union of taxa observed in either sample,
/// missing entries filled with zero. Pairs are ordered by taxon id.
pub fn actual_and_expected_vectors(
    actual: &FeatureTable,
    expected: &FeatureTable,
    actual_sample_id: Option<&str>,
    expected_sample_id: Option<&str>,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let a_idx = actual.sample_or_first(actual_sample_id)?;
    let e_idx = expected.sample_or_first(expected_sample_id)?;

    let expected_ids = expected.observed_ids(expected_sample_id, false)?;
    let mut all_ids: Vec<String> = actual
        .observed_ids(actual_sample_id, false)?
        .union(&expected_ids)
        .cloned()
        .collect();
    all_ids.sort_unstable();

    let value_of = |table: &FeatureTable, obs: &str, s: usize| {
        table
            .index(obs, Axis::Observation)
            .map(|o| table.data[o][s])
            .unwrap_or(0.0)
    };

    Ok(all_ids
        .iter()
        .map(|id| (value_of(actual, id, a_idx), value_of(expected, id, e_idx)))
        .unzip())
}
