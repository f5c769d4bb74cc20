// src/lineage.rs

use std::fmt;

/// Separator between rank labels in a taxonomy string.
pub const RANK_DELIMITER: char = ';';

/// Labels that mark a sequence the classifier refused to place.
pub const UNASSIGNED_LABELS: [&str; 2] = ["Unclassified", "Unassigned"];

/// A taxonomic classification: rank labels ordered from the highest rank
/// (index 0, usually kingdom) downwards.
///
/// Labels are stored as given. Every comparison trims surrounding whitespace,
/// so `"k__Bacteria; p__Firmicutes"` and `"k__Bacteria;p__Firmicutes"` compare
/// equal rank by rank. Lineages of uneven depth are accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Lineage {
    labels: Vec<String>,
}

impl Lineage {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Split a `;`-delimited taxonomy string. An empty string yields a
    /// lineage with a single empty label, the way `str::split` does.
    pub fn parse(taxonomy: &str) -> Self {
        Self {
            labels: taxonomy.split(RANK_DELIMITER).map(str::to_string).collect(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn depth(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Trimmed label at `rank`, if the lineage is deep enough.
    pub fn label(&self, rank: usize) -> Option<&str> {
        self.labels.get(rank).map(|l| l.trim())
    }

    /// Trimmed label of the deepest rank.
    pub fn last_label(&self) -> Option<&str> {
        self.labels.last().map(|l| l.trim())
    }

    /// Keep ranks `0..=rank` with their labels trimmed.
    ///
    /// A lineage shallower than `rank + 1` is returned whole (trimmed).
    pub fn truncate(&self, rank: usize) -> Lineage {
        let keep = (rank + 1).min(self.labels.len());
        Lineage {
            labels: self.labels[..keep]
                .iter()
                .map(|l| l.trim().to_string())
                .collect(),
        }
    }

    /// Canonical `a;b;c` rendering with trimmed labels.
    pub fn joined(&self) -> String {
        self.labels
            .iter()
            .map(|l| l.trim())
            .collect::<Vec<_>>()
            .join(";")
    }

    /// True when the top-rank label is one of the "refused" markers.
    pub fn is_unassigned(&self) -> bool {
        self.label(0)
            .map(|l| UNASSIGNED_LABELS.contains(&l))
            .unwrap_or(false)
    }
}

impl fmt::Display for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.labels.join(";"))
    }
}

impl From<&str> for Lineage {
    fn from(taxonomy: &str) -> Self {
        Lineage::parse(taxonomy)
    }
}

/// Compare the labels of `a` and `b` at `rank` after trimming.
/// A lineage too short to have that rank never compares equal.
pub fn lineages_equal_at(a: &Lineage, b: &Lineage, rank: usize) -> bool {
    match (a.label(rank), b.label(rank)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Number of leading ranks on which `a` and `b` agree.
///
/// Stops at the first mismatch or at the end of the shorter lineage, so the
/// result is in `0..=min(a.depth(), b.depth())`. This is also the "mismatch
/// level": the 0-based index of the first rank at which the two diverge.
pub fn last_common_ancestor_depth(a: &Lineage, b: &Lineage) -> usize {
    a.labels
        .iter()
        .zip(b.labels.iter())
        .take_while(|(x, y)| x.trim() == y.trim())
        .count()
}
