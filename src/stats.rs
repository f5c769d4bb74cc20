// src/stats.rs
//
// Correlation, two-sample tests, Kruskal-Wallis and multiple-comparison
// corrections. Distributions come from statrs; the tests use the usual
// large-sample approximations.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use statrs::distribution::{ChiSquared, ContinuousCDF, Normal, StudentsT};

/// A test that cannot be computed on its input (constant values, too few
/// observations, unequal paired lengths).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatError {
    #[error("degenerate input: {0}")]
    Degenerate(String),
}

fn degenerate(msg: impl Into<String>) -> StatError {
    StatError::Degenerate(msg.into())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
}

impl TestResult {
    /// Stand-in for a test that could not be run: `p = 1.0`.
    pub fn not_significant() -> Self {
        TestResult {
            statistic: f64::NAN,
            p_value: 1.0,
        }
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator).
fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0)
}

/// 1-based ranks with ties sharing their average rank, plus the sizes of
/// every tie group.
pub fn average_ranks(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; values.len()];
    let mut ties = Vec::new();
    let mut i = 0;
    while i < order.len() {
        let start = i;
        while i + 1 < order.len() && values[order[i]] == values[order[i + 1]] {
            i += 1;
        }
        let rank = (start + i + 2) as f64 / 2.0;
        for &j in &order[start..=i] {
            ranks[j] = rank;
        }
        if i > start {
            ties.push(i - start + 1);
        }
        i += 1;
    }
    (ranks, ties)
}

fn tie_term(ties: &[usize]) -> f64 {
    ties.iter().map(|&t| (t as f64).powi(3) - t as f64).sum()
}

fn two_sided_normal_p(z: f64) -> Result<f64, StatError> {
    let dist = Normal::new(0.0, 1.0).map_err(|e| degenerate(e.to_string()))?;
    Ok((2.0 * dist.sf(z.abs())).min(1.0))
}

fn two_sided_t_p(t: f64, df: f64) -> Result<f64, StatError> {
    let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| degenerate(e.to_string()))?;
    Ok((2.0 * dist.sf(t.abs())).min(1.0))
}

/// Pearson r with a two-sided p-value from the t distribution on `n - 2`
/// degrees of freedom. Undefined values (constant input, fewer than three
/// points for p) are NaN.
pub fn pearson(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len().min(y.len());
    if n < 2 {
        return (f64::NAN, f64::NAN);
    }
    let (x, y) = (&x[..n], &y[..n]);
    let (mx, my) = (mean(x), mean(y));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return (f64::NAN, f64::NAN);
    }
    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);

    if n < 3 {
        return (r, f64::NAN);
    }
    let df = (n - 2) as f64;
    let p = if (1.0 - r.abs()) < f64::EPSILON {
        0.0
    } else {
        let t = r * (df / (1.0 - r * r)).sqrt();
        two_sided_t_p(t, df).unwrap_or(f64::NAN)
    };
    (r, p)
}

/// Spearman rho: Pearson on average ranks.
pub fn spearman(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len().min(y.len());
    let (rx, _) = average_ranks(&x[..n]);
    let (ry, _) = average_ranks(&y[..n]);
    pearson(&rx, &ry)
}

/// The four two-sample tests, chosen by whether samples are paired and
/// whether a parametric test is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    MannWhitneyU,
    IndependentT,
    WilcoxonSignedRank,
    PairedT,
}

impl TestKind {
    pub fn from_flags(paired: bool, parametric: bool) -> Self {
        match (paired, parametric) {
            (false, false) => TestKind::MannWhitneyU,
            (false, true) => TestKind::IndependentT,
            (true, false) => TestKind::WilcoxonSignedRank,
            (true, true) => TestKind::PairedT,
        }
    }

    pub fn run(&self, a: &[f64], b: &[f64]) -> Result<TestResult, StatError> {
        match self {
            TestKind::MannWhitneyU => mann_whitney_u(a, b),
            TestKind::IndependentT => independent_t(a, b),
            TestKind::WilcoxonSignedRank => wilcoxon_signed_rank(a, b),
            TestKind::PairedT => paired_t(a, b),
        }
    }
}

/// Run the selected test. Input the test cannot handle yields `p = 1.0`.
pub fn pairwise_test(a: &[f64], b: &[f64], paired: bool, parametric: bool) -> TestResult {
    let kind = TestKind::from_flags(paired, parametric);
    match kind.run(a, b) {
        Ok(result) => result,
        Err(e) => {
            log::debug!("{kind:?} not computable ({e}); using p = 1.0");
            TestResult::not_significant()
        }
    }
}

/// Two-sided Mann-Whitney U with tie and continuity correction (normal
/// approximation). The statistic is U for `a`.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> Result<TestResult, StatError> {
    if a.is_empty() || b.is_empty() {
        return Err(degenerate("empty sample"));
    }
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let n = n1 + n2;
    let combined: Vec<f64> = a.iter().chain(b).copied().collect();
    let (ranks, ties) = average_ranks(&combined);

    let r1: f64 = ranks[..a.len()].iter().sum();
    let u1 = r1 - n1 * (n1 + 1.0) / 2.0;
    let u2 = n1 * n2 - u1;
    let mu = n1 * n2 / 2.0;
    let sigma = (n1 * n2 / 12.0 * ((n + 1.0) - tie_term(&ties) / (n * (n - 1.0)))).sqrt();
    if !(sigma > 0.0) {
        return Err(degenerate("all values identical"));
    }
    let z = (u1.max(u2) - mu - 0.5) / sigma;
    Ok(TestResult {
        statistic: u1,
        p_value: two_sided_normal_p(z)?,
    })
}

/// Student's t-test with pooled variance.
pub fn independent_t(a: &[f64], b: &[f64]) -> Result<TestResult, StatError> {
    if a.len() < 2 || b.len() < 2 {
        return Err(degenerate("need at least two values per group"));
    }
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let df = n1 + n2 - 2.0;
    let pooled = ((n1 - 1.0) * variance(a) + (n2 - 1.0) * variance(b)) / df;
    let se = (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    if !(se > 0.0) {
        return Err(degenerate("zero variance"));
    }
    let t = (mean(a) - mean(b)) / se;
    Ok(TestResult {
        statistic: t,
        p_value: two_sided_t_p(t, df)?,
    })
}

fn differences(a: &[f64], b: &[f64]) -> Result<Vec<f64>, StatError> {
    if a.len() != b.len() {
        return Err(degenerate(format!(
            "paired samples differ in length ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter().zip(b).map(|(x, y)| x - y).collect())
}

pub fn paired_t(a: &[f64], b: &[f64]) -> Result<TestResult, StatError> {
    let d = differences(a, b)?;
    if d.len() < 2 {
        return Err(degenerate("need at least two pairs"));
    }
    let n = d.len() as f64;
    let se = (variance(&d) / n).sqrt();
    if !(se > 0.0) {
        return Err(degenerate("constant differences"));
    }
    let t = mean(&d) / se;
    Ok(TestResult {
        statistic: t,
        p_value: two_sided_t_p(t, n - 1.0)?,
    })
}

/// Wilcoxon signed-rank test, zero differences dropped, normal
/// approximation with tie correction. The statistic is the smaller of the
/// two signed rank sums.
pub fn wilcoxon_signed_rank(a: &[f64], b: &[f64]) -> Result<TestResult, StatError> {
    let d: Vec<f64> = differences(a, b)?.into_iter().filter(|v| *v != 0.0).collect();
    if d.is_empty() {
        return Err(degenerate("all differences are zero"));
    }
    let n = d.len() as f64;
    let abs: Vec<f64> = d.iter().map(|v| v.abs()).collect();
    let (ranks, ties) = average_ranks(&abs);

    let w_plus: f64 = d.iter().zip(&ranks).filter(|(v, _)| **v > 0.0).map(|(_, r)| r).sum();
    let w_minus: f64 = d.iter().zip(&ranks).filter(|(v, _)| **v < 0.0).map(|(_, r)| r).sum();
    let t = w_plus.min(w_minus);

    let mu = n * (n + 1.0) / 4.0;
    let var = n * (n + 1.0) * (2.0 * n + 1.0) / 24.0 - tie_term(&ties) / 48.0;
    if !(var > 0.0) {
        return Err(degenerate("zero variance"));
    }
    let z = (t - mu) / var.sqrt();
    Ok(TestResult {
        statistic: t,
        p_value: two_sided_normal_p(z)?,
    })
}

/// Kruskal-Wallis H with tie correction, p from chi-squared on `k - 1`
/// degrees of freedom. Empty groups are ignored.
pub fn kruskal_wallis(groups: &[Vec<f64>]) -> Result<TestResult, StatError> {
    let groups: Vec<&Vec<f64>> = groups.iter().filter(|g| !g.is_empty()).collect();
    if groups.len() < 2 {
        return Err(degenerate("need at least two non-empty groups"));
    }
    let combined: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let n = combined.len() as f64;
    let (ranks, ties) = average_ranks(&combined);

    let mut offset = 0;
    let mut h = 0.0;
    for g in &groups {
        let r: f64 = ranks[offset..offset + g.len()].iter().sum();
        h += r * r / g.len() as f64;
        offset += g.len();
    }
    h = 12.0 / (n * (n + 1.0)) * h - 3.0 * (n + 1.0);

    let correction = 1.0 - tie_term(&ties) / (n.powi(3) - n);
    if !(correction > 0.0) {
        return Err(degenerate("all values identical"));
    }
    h /= correction;

    let chi = ChiSquared::new((groups.len() - 1) as f64).map_err(|e| degenerate(e.to_string()))?;
    Ok(TestResult {
        statistic: h,
        p_value: chi.sf(h),
    })
}

/// Multiple-comparison correction applied to one batch of p-values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Correction {
    #[default]
    BenjaminiHochberg,
    Bonferroni,
    None,
}

impl Correction {
    pub fn apply(&self, p_values: &[f64]) -> Vec<f64> {
        match self {
            Correction::BenjaminiHochberg => benjamini_hochberg(p_values),
            Correction::Bonferroni => bonferroni(p_values),
            Correction::None => p_values.to_vec(),
        }
    }
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Correction::BenjaminiHochberg => "fdr_bh",
            Correction::Bonferroni => "bonferroni",
            Correction::None => "none",
        })
    }
}

impl FromStr for Correction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fdr_bh" | "bh" | "benjamini-hochberg" => Ok(Correction::BenjaminiHochberg),
            "bonferroni" => Ok(Correction::Bonferroni),
            "none" => Ok(Correction::None),
            other => Err(format!("unknown correction '{other}'")),
        }
    }
}

/// Benjamini-Hochberg adjusted p-values, in input order.
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let m = p_values.len();
    let mut indexed: Vec<(usize, f64)> = p_values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let mut adjusted = vec![0.0; m];
    let mut running_min = f64::INFINITY;
    for i in (0..m).rev() {
        let adj = indexed[i].1 * m as f64 / (i + 1) as f64;
        running_min = running_min.min(adj).min(1.0);
        adjusted[indexed[i].0] = running_min;
    }
    adjusted
}

pub fn bonferroni(p_values: &[f64]) -> Vec<f64> {
    let m = p_values.len() as f64;
    p_values.iter().map(|p| (p * m).min(1.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn ranks_average_ties() {
        let (ranks, ties) = average_ranks(&[10.0, 20.0, 10.0, 30.0]);
        assert_eq!(ranks, vec![1.5, 3.0, 1.5, 4.0]);
        assert_eq!(ties, vec![2]);
    }

    #[test]
    fn pearson_and_spearman_values() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 5.0, 4.0, 5.0];
        let (r, p) = pearson(&x, &y);
        assert!(close(r, 0.7745966692414834, 1e-12));
        assert!(p > 0.1 && p < 0.2);
        let (rho, _) = spearman(&x, &y);
        assert!(close(rho, 0.7378647873726218, 1e-12));

        let (r, p) = pearson(&x, &[2.0, 4.0, 6.0, 8.0, 10.0]);
        assert!(close(r, 1.0, 1e-12));
        assert_eq!(p, 0.0);
    }

    #[test]
    fn constant_vectors_have_undefined_correlation() {
        let (r, p) = pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]);
        assert!(r.is_nan() && p.is_nan());
        let (r, p) = pearson(&[1.0, 2.0], &[2.0, 1.0]);
        assert!(close(r, -1.0, 1e-12));
        assert!(p.is_nan());
    }

    #[test]
    fn mann_whitney_separated_groups() {
        let res = mann_whitney_u(&[1.0, 2.0, 3.0, 4.0, 5.0], &[6.0, 7.0, 8.0, 9.0, 10.0]).unwrap();
        assert_eq!(res.statistic, 0.0);
        assert!(close(res.p_value, 0.012185780355344818, 1e-9));
    }

    #[test]
    fn t_tests() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 2.0, 4.0, 4.0, 6.0];
        let paired = paired_t(&a, &b).unwrap();
        assert!(close(paired.statistic, -2.449489742783178, 1e-9));
        assert!(paired.p_value > 0.05 && paired.p_value < 0.1);

        let ind = independent_t(&a, &[3.0, 4.0, 5.0, 6.0, 7.0]).unwrap();
        assert!(close(ind.statistic, -2.0, 1e-12));
        assert!(ind.p_value > 0.05 && ind.p_value < 0.1);
    }

    #[test]
    fn wilcoxon_drops_zero_differences() {
        let a = [1.1, 2.3, 3.2, 4.8, 5.0, 6.1, 7.3, 8.9];
        let b = [1.0, 2.0, 3.5, 4.0, 4.1, 5.0, 6.0, 7.0];
        let res = wilcoxon_signed_rank(&a, &b).unwrap();
        assert_eq!(res.statistic, 2.5);
        assert!(res.p_value > 0.01 && res.p_value < 0.05);

        let with_zero = wilcoxon_signed_rank(&[1.0, 2.0, 5.0], &[1.0, 1.0, 3.0]).unwrap();
        assert_eq!(with_zero.statistic, 0.0);
    }

    #[test]
    fn degenerate_inputs_fall_back_to_p_one() {
        let same = [0.5, 0.5, 0.5];
        for (paired, parametric) in [(false, false), (false, true), (true, false), (true, true)] {
            let res = pairwise_test(&same, &same, paired, parametric);
            assert_eq!(res.p_value, 1.0, "paired={paired} parametric={parametric}");
        }
        assert!(paired_t(&[1.0, 2.0], &[1.0]).is_err());
    }

    #[test]
    fn kruskal_wallis_separated_groups() {
        let groups = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]];
        let res = kruskal_wallis(&groups).unwrap();
        assert!(close(res.statistic, 7.2, 1e-9));
        assert!(close(res.p_value, (-3.6f64).exp(), 1e-9));
        assert!(kruskal_wallis(&[vec![1.0, 1.0], vec![1.0]]).is_err());
        assert!(kruskal_wallis(&[vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn corrections() {
        let p = [0.01, 0.04, 0.03, 0.005];
        let bh = benjamini_hochberg(&p);
        let want = [0.02, 0.04, 0.04, 0.02];
        for (got, want) in bh.iter().zip(want) {
            assert!(close(*got, want, 1e-12));
        }
        let bonf = Correction::Bonferroni.apply(&p);
        assert!(close(bonf[1], 0.16, 1e-12));
        assert_eq!(bonferroni(&[0.5, 0.9]), vec![1.0, 1.0]);
        assert_eq!(Correction::None.apply(&p), p.to_vec());
        assert!(benjamini_hochberg(&[]).is_empty());
        assert_eq!("fdr_bh".parse::<Correction>().unwrap(), Correction::default());
    }
}
