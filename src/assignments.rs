// src/assignments.rs

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ahash::AHashMap;
use flate2::read::MultiGzDecoder;

use crate::error::{EvalError, Result};

/// Opens a text file for line reading, gunzipping `*.gz` transparently.
pub fn open_text<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| EvalError::io(path, e))?;

    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    Ok(if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    })
}

/// One classified query sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub seq_id: String,
    pub taxonomy: String,
}

/// Parses a classifier output file in the format:
/// ```text
/// <seq_id>\t<taxonomy>[\t<confidence>...]
/// ```
/// Lines starting with `#` are headers and are skipped, as are blank lines.
/// Assignments are returned in file order.
pub fn read_assignments<P: AsRef<Path>>(path: P) -> Result<Vec<Assignment>> {
    let path = path.as_ref();
    let reader = open_text(path)?;

    let mut assignments = Vec::new();
    for (line_no, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| EvalError::io(path, e))?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let (seq_id, taxonomy) = split_record(&line).ok_or_else(|| EvalError::ResultsFile {
            path: path.to_path_buf(),
            reason: format!("line {} has no taxonomy column", line_no + 1),
        })?;
        assignments.push(Assignment {
            seq_id: seq_id.to_string(),
            taxonomy: taxonomy.to_string(),
        });
    }
    Ok(assignments)
}

/// Parses a reference taxonomy file (`<seq_id>\t<taxonomy>`) into a lookup.
/// Lines without a taxonomy column are skipped.
pub fn read_taxonomy_map<P: AsRef<Path>>(path: P) -> Result<AHashMap<String, String>> {
    let path = path.as_ref();
    let reader = open_text(path)?;

    let mut taxa = AHashMap::new();
    for line_result in reader.lines() {
        let line = line_result.map_err(|e| EvalError::io(path, e))?;
        let line = line.trim();
        if line.starts_with('#') || line.is_empty() {
            continue;
        }
        match split_record(line) {
            Some((seq_id, taxonomy)) => {
                taxa.insert(seq_id.to_string(), taxonomy.to_string());
            }
            None => log::warn!("Skipping malformed line in {}: {line}", path.display()),
        }
    }
    Ok(taxa)
}

/// `(id, taxonomy)` from the first two tab-separated fields.
fn split_record(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.trim_end_matches(['\r', '\n']).split('\t');
    let id = parts.next()?;
    let taxonomy = parts.next()?;
    Some((id, taxonomy))
}
