// src/outcome.rs

use std::fmt;
use std::str::FromStr;

use crate::lineage::{lineages_equal_at, Lineage};
use crate::types::TestMode;

/// How an observed assignment relates to the true taxonomy of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    Match,
    Overclassification,
    Underclassification,
    Misclassification,
}

impl Outcome {
    pub const ALL: [Outcome; 4] = [
        Outcome::Match,
        Outcome::Overclassification,
        Outcome::Underclassification,
        Outcome::Misclassification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Match => "match",
            Outcome::Overclassification => "overclassification",
            Outcome::Underclassification => "underclassification",
            Outcome::Misclassification => "misclassification",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Outcome::ALL
            .iter()
            .copied()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| format!("unknown outcome '{s}'"))
    }
}

/// True when the deepest observed label agrees with the expected label at
/// the same rank index.
fn last_observed_rank_agrees(obs: &Lineage, exp: &Lineage) -> bool {
    match obs.depth().checked_sub(1) {
        Some(rank) => lineages_equal_at(obs, exp, rank),
        None => false,
    }
}

/// Score a query whose true taxon at rank `level` was removed from the
/// reference database.
///
/// `exp` is the full true lineage; the best achievable answer is its parent
/// at rank `level - 1`. Rules are checked in order and the first hit wins:
///
/// 1. match: `obs` is exactly one rank shallower than `exp` and agrees at
///    `level - 1`.
/// 2. overclassification: `obs` is at least as deep as `exp` and agrees at
///    `level - 1`.
/// 3. underclassification: `obs` is shallower still and its deepest label is
///    correct, or the classifier refused to assign.
/// 4. misclassification otherwise.
pub fn classify_novel_taxon(obs: &Lineage, exp: &Lineage, level: usize) -> Outcome {
    let parent_agrees = level
        .checked_sub(1)
        .map(|rank| lineages_equal_at(obs, exp, rank))
        .unwrap_or(false);

    if obs.depth() + 1 == exp.depth() && parent_agrees {
        Outcome::Match
    } else if obs.depth() >= exp.depth() && parent_agrees {
        Outcome::Overclassification
    } else if (obs.depth() + 1 < exp.depth() && last_observed_rank_agrees(obs, exp))
        || obs.is_unassigned()
    {
        Outcome::Underclassification
    } else {
        Outcome::Misclassification
    }
}

/// Score a query whose true taxon is represented in the reference database.
/// There is no overclassification category here.
pub fn classify_cross_validated(obs: &Lineage, exp: &Lineage) -> Outcome {
    if obs.depth() == exp.depth() && last_observed_rank_agrees(obs, exp) {
        Outcome::Match
    } else if (obs.depth() < exp.depth() && last_observed_rank_agrees(obs, exp))
        || obs.is_unassigned()
    {
        Outcome::Underclassification
    } else {
        Outcome::Misclassification
    }
}

/// Dispatch on the evaluation mode. `level` only matters for novel taxa.
pub fn classify_outcome(mode: TestMode, obs: &Lineage, exp: &Lineage, level: usize) -> Outcome {
    match mode {
        TestMode::NovelTaxa => classify_novel_taxon(obs, exp, level),
        TestMode::CrossValidated => classify_cross_validated(obs, exp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{taxonomy_column, EXPECTED_TAXA, OBSERVED_TAXA};

    fn fixture_pairs() -> Vec<(Lineage, Lineage)> {
        let obs = taxonomy_column(OBSERVED_TAXA);
        let exp = taxonomy_column(EXPECTED_TAXA);
        obs.iter()
            .zip(exp.iter())
            .map(|(o, e)| (Lineage::parse(o), Lineage::parse(e)))
            .collect()
    }

    #[test]
    fn cross_validated_rules() {
        let exp = Lineage::parse("k__A;p__B;c__C");
        assert_eq!(classify_cross_validated(&Lineage::parse("k__A;p__B;c__C"), &exp), Outcome::Match);
        assert_eq!(
            classify_cross_validated(&Lineage::parse("k__A;p__B"), &exp),
            Outcome::Underclassification
        );
        assert_eq!(
            classify_cross_validated(&Lineage::parse("k__A;p__X"), &exp),
            Outcome::Misclassification
        );
        assert_eq!(
            classify_cross_validated(&Lineage::parse("k__A;p__B;c__D"), &exp),
            Outcome::Misclassification
        );
        assert_eq!(
            classify_cross_validated(&Lineage::parse("Unassigned"), &exp),
            Outcome::Underclassification
        );
    }

    #[test]
    fn cross_validated_fixture_outcomes() {
        let outcomes: Vec<Outcome> = fixture_pairs()
            .iter()
            .map(|(o, e)| classify_cross_validated(o, e))
            .collect();
        let matches = outcomes.iter().filter(|o| **o == Outcome::Match).count();
        let under = outcomes
            .iter()
            .filter(|o| **o == Outcome::Underclassification)
            .count();
        assert_eq!(matches as f64 / outcomes.len() as f64, 0.25);
        assert_eq!(under as f64 / outcomes.len() as f64, 0.625);
        assert_eq!(outcomes[5], Outcome::Misclassification);
    }

    #[test]
    fn novel_taxa_fixture_outcomes() {
        let outcomes: Vec<Outcome> = fixture_pairs()
            .iter()
            .map(|(o, e)| classify_novel_taxon(o, e, 6))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                Outcome::Overclassification,
                Outcome::Match,
                Outcome::Underclassification,
                Outcome::Underclassification,
                Outcome::Overclassification,
                Outcome::Misclassification,
                Outcome::Match,
                Outcome::Match,
            ]
        );
    }

    #[test]
    fn novel_taxa_precedence_prefers_match_over_underclassification() {
        // One rank shallower and correct at the parent.
        let exp = Lineage::parse("k__A;p__B;c__C");
        let obs = Lineage::parse("k__A;p__B");
        assert_eq!(classify_novel_taxon(&obs, &exp, 2), Outcome::Match);
        // Shallow lineage that cannot reach rank level-1 is never a match.
        let obs = Lineage::parse("k__A");
        assert_eq!(classify_novel_taxon(&obs, &exp, 2), Outcome::Underclassification);
        // Level 0 has no parent rank to agree on.
        assert_eq!(
            classify_novel_taxon(&Lineage::parse("k__A;p__B"), &exp, 0),
            Outcome::Misclassification
        );
    }

    #[test]
    fn outcome_names_round_trip() {
        for o in Outcome::ALL {
            assert_eq!(o.as_str().parse::<Outcome>().unwrap(), o);
        }
    }
}
