// src/discovery.rs
//
// Result layouts on disk:
//   mock results      <root>/<dataset>/<reference>/<method>/<params>/table*biom
//   expected tables   <root>/<dataset>/<reference>/expected/table.L6-taxa.biom
//   per-sequence runs <root>/<dataset>/<method>/<params>/query_tax_assignments.txt

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EvalError, Result};
use crate::types::TestMode;

pub const DEFAULT_TABLE_PATTERN: &str = "table*biom";
pub const DEFAULT_EXPECTED_PATTERN: &str = "table.L{level}-taxa.biom";
pub const EXPECTED_DIRNAME: &str = "expected";
pub const OBSERVED_TAXA_FILENAME: &str = "query_tax_assignments.txt";
pub const EXPECTED_TAXA_FILENAME: &str = "query_taxa.tsv";

/// One mock-community result table and the identifiers its path encodes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResultTable {
    pub dataset: String,
    pub reference: String,
    pub method: String,
    pub parameters: String,
    pub path: PathBuf,
}

/// Shell-style match supporting `*` (any run of characters) and `?`.
pub fn wildcard_match(name: &str, pattern: &str) -> bool {
    let name: Vec<char> = name.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut n, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            n += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, n));
            p += 1;
        } else if let Some((sp, sn)) = star {
            p = sp + 1;
            n = sn + 1;
            star = Some((sp, sn + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Sorted entries of `dir` that pass `keep`. Unreadable directories yield
/// nothing.
fn entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(rd) => rd
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| keep(p))
            .collect(),
        Err(e) => {
            log::debug!("Skipping unreadable directory {}: {e}", dir.display());
            Vec::new()
        }
    };
    found.sort();
    found
}

fn subdirs(dir: &Path) -> Vec<PathBuf> {
    entries(dir, Path::is_dir)
}

/// Every `<dataset>/<reference>/<method>/<params>/<file>` under `root` whose
/// file name matches `pattern`.
pub fn find_result_tables<P: AsRef<Path>>(root: P, pattern: &str) -> Vec<ResultTable> {
    let mut results = Vec::new();
    for dataset_dir in subdirs(root.as_ref()) {
        for reference_dir in subdirs(&dataset_dir) {
            for method_dir in subdirs(&reference_dir) {
                for params_dir in subdirs(&method_dir) {
                    for table in entries(&params_dir, |p| p.is_file() && wildcard_match(&file_name(p), pattern)) {
                        results.push(ResultTable {
                            dataset: file_name(&dataset_dir),
                            reference: file_name(&reference_dir),
                            method: file_name(&method_dir),
                            parameters: file_name(&params_dir),
                            path: table,
                        });
                    }
                }
            }
        }
    }
    results
}

/// `(dataset, reference, path)` for every expected table at `level`. The
/// pattern's `{level}` placeholder is replaced by the level.
pub fn find_expected_tables<P: AsRef<Path>>(root: P, pattern: &str, level: usize) -> Vec<(String, String, PathBuf)> {
    let filename = pattern.replace("{level}", &level.to_string());
    let mut results = Vec::new();
    for dataset_dir in subdirs(root.as_ref()) {
        for reference_dir in subdirs(&dataset_dir) {
            let expected_dir = reference_dir.join(EXPECTED_DIRNAME);
            for table in entries(&expected_dir, |p| p.is_file() && wildcard_match(&file_name(p), &filename)) {
                results.push((file_name(&dataset_dir), file_name(&reference_dir), table));
            }
        }
    }
    results
}

/// Expected table paths keyed by dataset, then reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpectedTables {
    tables: BTreeMap<String, BTreeMap<String, PathBuf>>,
}

impl ExpectedTables {
    pub fn insert(&mut self, dataset: &str, reference: &str, path: PathBuf) {
        self.tables
            .entry(dataset.to_string())
            .or_default()
            .insert(reference.to_string(), path);
    }

    /// A missing pair is a wiring error, not something to skip.
    pub fn get(&self, dataset: &str, reference: &str) -> Result<&Path> {
        self.tables
            .get(dataset)
            .and_then(|refs| refs.get(reference))
            .map(PathBuf::as_path)
            .ok_or_else(|| EvalError::MissingExpectedTable {
                dataset: dataset.to_string(),
                reference: reference.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn expected_tables_lookup<P: AsRef<Path>>(root: P, pattern: &str, level: usize) -> ExpectedTables {
    let mut lookup = ExpectedTables::default();
    for (dataset, reference, path) in find_expected_tables(root, pattern, level) {
        lookup.insert(&dataset, &reference, path);
    }
    lookup
}

/// A per-sequence result directory: `<dataset>/<method>/<params>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClassificationResultDir {
    pub dataset: String,
    pub method: String,
    pub parameters: String,
    pub path: PathBuf,
}

/// Every `<dataset>/<method>/<params>` directory under `root` holding an
/// observed assignment file.
pub fn find_classification_result_dirs<P: AsRef<Path>>(root: P) -> Vec<ClassificationResultDir> {
    let mut results = Vec::new();
    for dataset_dir in subdirs(root.as_ref()) {
        for method_dir in subdirs(&dataset_dir) {
            for params_dir in subdirs(&method_dir) {
                if !params_dir.join(OBSERVED_TAXA_FILENAME).is_file() {
                    log::debug!("No {OBSERVED_TAXA_FILENAME} in {}", params_dir.display());
                    continue;
                }
                results.push(ClassificationResultDir {
                    dataset: file_name(&dataset_dir),
                    method: file_name(&method_dir),
                    parameters: file_name(&params_dir),
                    path: params_dir,
                });
            }
        }
    }
    results
}

/// Identity of a simulated query set, decoded from its directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetId {
    pub index: String,
    pub level: usize,
    pub iteration: String,
}

/// Rank used for cross-validated sets, which are never truncated.
pub const CROSS_VALIDATED_LEVEL: usize = 6;

impl DatasetId {
    /// Novel-taxa ids look like `B1-REF-L6-iter0`; cross-validated ids like
    /// `B1-REF-iter0`.
    pub fn parse(id: &str, mode: TestMode) -> Result<Self> {
        let bad = || EvalError::DatasetId(id.to_string());
        let (head, iteration) = id.rsplit_once("-iter").ok_or_else(bad)?;
        if iteration.is_empty() || head.is_empty() {
            return Err(bad());
        }

        match mode {
            TestMode::CrossValidated => Ok(DatasetId {
                index: head.to_string(),
                level: CROSS_VALIDATED_LEVEL,
                iteration: iteration.to_string(),
            }),
            TestMode::NovelTaxa => {
                let (index, level) = head.rsplit_once("-L").ok_or_else(bad)?;
                let level = level.trim().parse::<usize>().map_err(|_| bad())?;
                Ok(DatasetId {
                    index: index.to_string(),
                    level,
                    iteration: iteration.to_string(),
                })
            }
        }
    }
}
