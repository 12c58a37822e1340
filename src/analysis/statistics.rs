//! Pluggable hypothesis tests and multiple-testing corrections
//!
//! Every pattern (cluster pair or higher-order structure) is summarised as a
//! two-group count table: hits out of trials in the focus group versus the
//! comparison group, plus the per-sample hit rates. Tests only see that
//! summary, so any test can be swapped in without touching the pipeline.

use rand::seq::SliceRandom;
use rand::{SeedableRng, rngs::StdRng};

use crate::math::probability::{chi_square_sf_1df, hypergeometric_ln_pmf, mean, normal_sf};

/// Relative slack when comparing table probabilities in Fisher's test
const FISHER_RELATIVE_TOLERANCE: f64 = 1e-7;

/// Hits and trials of one pattern, stratified by group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupCounts {
    /// Pattern occurrences across focus-group samples
    pub focus_hits: u64,
    /// Opportunities for the pattern across focus-group samples
    pub focus_trials: u64,
    /// Pattern occurrences across comparison-group samples
    pub other_hits: u64,
    /// Opportunities for the pattern across comparison-group samples
    pub other_trials: u64,
    /// Per-sample hit rates of focus samples with at least one trial
    pub focus_rates: Vec<f64>,
    /// Per-sample hit rates of comparison samples with at least one trial
    pub other_rates: Vec<f64>,
}

impl GroupCounts {
    /// Record one sample's hits and trials
    pub fn add_sample(&mut self, is_focus: bool, hits: u64, trials: u64) {
        let rate = (trials > 0).then(|| hits as f64 / trials as f64);
        if is_focus {
            self.focus_hits += hits;
            self.focus_trials += trials;
            self.focus_rates.extend(rate);
        } else {
            self.other_hits += hits;
            self.other_trials += trials;
            self.other_rates.extend(rate);
        }
    }

    /// Pooled focus-group rate
    pub fn focus_rate(&self) -> f64 {
        pooled_rate(self.focus_hits, self.focus_trials)
    }

    /// Pooled comparison-group rate
    pub fn other_rate(&self) -> f64 {
        pooled_rate(self.other_hits, self.other_trials)
    }

    /// Whether either group observed the pattern at all
    pub const fn has_signal(&self) -> bool {
        self.focus_hits > 0 || self.other_hits > 0
    }

    /// Observed in the focus group only
    pub const fn is_focus_exclusive(&self) -> bool {
        self.focus_hits > 0 && self.other_hits == 0
    }

    /// Focus rate over comparison rate
    ///
    /// Infinite for focus-exclusive patterns, zero when the focus group never
    /// observes the pattern.
    pub fn fold_change(&self) -> f64 {
        if self.focus_hits == 0 {
            return 0.0;
        }
        if self.is_focus_exclusive() {
            return f64::INFINITY;
        }
        let other = self.other_rate();
        if other > 0.0 {
            self.focus_rate() / other
        } else {
            f64::INFINITY
        }
    }

    /// 2x2 contingency table `[[a, b], [c, d]]` of hits versus misses
    pub const fn contingency(&self) -> [[u64; 2]; 2] {
        [
            [
                self.focus_hits,
                self.focus_trials.saturating_sub(self.focus_hits),
            ],
            [
                self.other_hits,
                self.other_trials.saturating_sub(self.other_hits),
            ],
        ]
    }
}

fn pooled_rate(hits: u64, trials: u64) -> f64 {
    if trials == 0 {
        0.0
    } else {
        hits as f64 / trials as f64
    }
}

/// A two-group significance test over pattern counts
pub trait SignificanceTest {
    /// Short identifier for logs and reports
    fn name(&self) -> &'static str;

    /// Two-group p-value, or `None` for a degenerate table
    ///
    /// Callers treat `None` as non-significant (p = 1).
    fn p_value(&self, counts: &GroupCounts) -> Option<f64>;
}

/// Fisher's exact test on the hit/miss contingency table (two-sided)
#[derive(Debug, Clone, Copy, Default)]
pub struct FisherExact;

impl SignificanceTest for FisherExact {
    fn name(&self) -> &'static str {
        "fisher"
    }

    fn p_value(&self, counts: &GroupCounts) -> Option<f64> {
        let [[a, b], [c, d]] = counts.contingency();
        let row1 = a + b;
        let row2 = c + d;
        let col1 = a + c;
        let col2 = b + d;
        if row1 == 0 || row2 == 0 || col1 == 0 || col2 == 0 {
            return None;
        }
        let total = row1 + row2;

        let observed = hypergeometric_ln_pmf(a, total, col1, row1);
        let cutoff = observed + FISHER_RELATIVE_TOLERANCE.ln_1p();
        let low = row1.saturating_sub(col2);
        let high = row1.min(col1);

        let p: f64 = (low..=high)
            .map(|k| hypergeometric_ln_pmf(k, total, col1, row1))
            .filter(|&ln_p| ln_p <= cutoff)
            .map(f64::exp)
            .sum();

        Some(p.clamp(0.0, 1.0))
    }
}

/// Pearson chi-square test with Yates continuity correction (1 df)
#[derive(Debug, Clone, Copy, Default)]
pub struct ChiSquare;

impl SignificanceTest for ChiSquare {
    fn name(&self) -> &'static str {
        "chi-square"
    }

    fn p_value(&self, counts: &GroupCounts) -> Option<f64> {
        let [[a, b], [c, d]] = counts.contingency();
        let [a, b, c, d] = [a as f64, b as f64, c as f64, d as f64];
        let margins = (a + b) * (c + d) * (a + c) * (b + d);
        if margins <= 0.0 {
            return None;
        }
        let n = a + b + c + d;
        let corrected = (a.mul_add(d, -(b * c)).abs() - n / 2.0).max(0.0);
        let statistic = n * corrected * corrected / margins;

        Some(chi_square_sf_1df(statistic).clamp(0.0, 1.0))
    }
}

/// Mann-Whitney U test on per-sample rates (two-sided, normal approximation)
#[derive(Debug, Clone, Copy, Default)]
pub struct MannWhitneyU;

impl SignificanceTest for MannWhitneyU {
    fn name(&self) -> &'static str {
        "mann-whitney"
    }

    fn p_value(&self, counts: &GroupCounts) -> Option<f64> {
        let n1 = counts.focus_rates.len();
        let n2 = counts.other_rates.len();
        if n1 == 0 || n2 == 0 {
            return None;
        }

        let mut pooled: Vec<(f64, bool)> = counts
            .focus_rates
            .iter()
            .map(|&r| (r, true))
            .chain(counts.other_rates.iter().map(|&r| (r, false)))
            .collect();
        pooled.sort_by(|x, y| x.0.total_cmp(&y.0));

        let mut focus_rank_sum = 0.0;
        let mut tie_term = 0.0;
        let mut start = 0;
        while start < pooled.len() {
            let value = pooled.get(start).map_or(0.0, |p| p.0);
            let end = pooled
                .iter()
                .skip(start)
                .position(|p| p.0.total_cmp(&value).is_ne())
                .map_or(pooled.len(), |offset| start + offset);
            let tied = (end - start) as f64;
            let average_rank = (start + end + 1) as f64 / 2.0;
            focus_rank_sum += average_rank
                * pooled
                    .get(start..end)
                    .map_or(0, |run| run.iter().filter(|p| p.1).count()) as f64;
            tie_term += tied.powi(3) - tied;
            start = end;
        }

        let (n1, n2) = (n1 as f64, n2 as f64);
        let n = n1 + n2;
        let u = n1.mul_add(-(n1 + 1.0) / 2.0, focus_rank_sum);
        let mu = n1 * n2 / 2.0;
        let variance = n1 * n2 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
        if variance <= 0.0 || !variance.is_finite() {
            return None;
        }

        let z = ((u - mu).abs() - 0.5).max(0.0) / variance.sqrt();
        Some((2.0 * normal_sf(z)).clamp(0.0, 1.0))
    }
}

/// Label-shuffling permutation test on the difference of mean sample rates
#[derive(Debug, Clone, Copy)]
pub struct PermutationTest {
    /// Number of label permutations
    pub permutations: usize,
    /// Seed for reproducible shuffles
    pub seed: u64,
}

impl SignificanceTest for PermutationTest {
    fn name(&self) -> &'static str {
        "permutation"
    }

    fn p_value(&self, counts: &GroupCounts) -> Option<f64> {
        let n1 = counts.focus_rates.len();
        if n1 == 0 || counts.other_rates.is_empty() || self.permutations == 0 {
            return None;
        }

        let observed = (mean(&counts.focus_rates)? - mean(&counts.other_rates)?).abs();
        let mut pooled: Vec<f64> = counts
            .focus_rates
            .iter()
            .chain(&counts.other_rates)
            .copied()
            .collect();

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut extreme = 0usize;
        for _ in 0..self.permutations {
            pooled.shuffle(&mut rng);
            let (left, right) = pooled.split_at(n1);
            let statistic = (mean(left)? - mean(right)?).abs();
            if statistic >= observed - f64::EPSILON {
                extreme += 1;
            }
        }

        Some((extreme + 1) as f64 / (self.permutations + 1) as f64)
    }
}

/// A multiple-hypothesis correction over one batch of p-values
pub trait FdrCorrection {
    /// Short identifier for logs and reports
    fn name(&self) -> &'static str;

    /// Adjusted p-values in input order, each within [raw p, 1]
    fn adjust(&self, p_values: &[f64]) -> Vec<f64>;
}

/// Benjamini-Hochberg step-up procedure
#[derive(Debug, Clone, Copy, Default)]
pub struct BenjaminiHochberg;

impl FdrCorrection for BenjaminiHochberg {
    fn name(&self) -> &'static str {
        "benjamini-hochberg"
    }

    fn adjust(&self, p_values: &[f64]) -> Vec<f64> {
        step_up(p_values, 1.0)
    }
}

/// Benjamini-Yekutieli procedure, valid under arbitrary dependence
#[derive(Debug, Clone, Copy, Default)]
pub struct BenjaminiYekutieli;

impl FdrCorrection for BenjaminiYekutieli {
    fn name(&self) -> &'static str {
        "benjamini-yekutieli"
    }

    fn adjust(&self, p_values: &[f64]) -> Vec<f64> {
        let harmonic: f64 = (1..=p_values.len()).map(|i| 1.0 / i as f64).sum();
        step_up(p_values, harmonic.max(1.0))
    }
}

/// Shared step-up adjustment `min_{j >= i} (m * c / j) * p_(j)`
fn step_up(p_values: &[f64], penalty: f64) -> Vec<f64> {
    let m = p_values.len();
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&i, &j| {
        let pi = p_values.get(i).copied().unwrap_or(1.0);
        let pj = p_values.get(j).copied().unwrap_or(1.0);
        pi.total_cmp(&pj).then(i.cmp(&j))
    });

    let mut adjusted = vec![1.0; m];
    let mut running_min = 1.0_f64;
    for (rank_index, &original) in order.iter().enumerate().rev() {
        let raw = p_values.get(original).copied().unwrap_or(1.0);
        let rank = (rank_index + 1) as f64;
        let candidate = raw * m as f64 * penalty / rank;
        running_min = running_min.min(candidate);
        if let Some(slot) = adjusted.get_mut(original) {
            *slot = running_min.clamp(raw, 1.0);
        }
    }
    adjusted
}

/// Available significance tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TestMethod {
    /// Fisher's exact test on pooled counts
    #[default]
    Fisher,
    /// Yates-corrected chi-square on pooled counts
    ChiSquare,
    /// Mann-Whitney U on per-sample rates
    MannWhitney,
    /// Permutation test on per-sample rates
    Permutation,
}

impl TestMethod {
    /// Instantiate the test strategy
    pub fn build(self, permutations: usize, seed: u64) -> Box<dyn SignificanceTest> {
        match self {
            Self::Fisher => Box::new(FisherExact),
            Self::ChiSquare => Box::new(ChiSquare),
            Self::MannWhitney => Box::new(MannWhitneyU),
            Self::Permutation => Box::new(PermutationTest { permutations, seed }),
        }
    }
}

/// Available multiple-testing corrections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FdrMethod {
    /// Benjamini-Hochberg
    #[default]
    #[value(name = "bh")]
    BenjaminiHochberg,
    /// Benjamini-Yekutieli
    #[value(name = "by")]
    BenjaminiYekutieli,
}

impl FdrMethod {
    /// Instantiate the correction strategy
    pub fn build(self) -> Box<dyn FdrCorrection> {
        match self {
            Self::BenjaminiHochberg => Box::new(BenjaminiHochberg),
            Self::BenjaminiYekutieli => Box::new(BenjaminiYekutieli),
        }
    }
}
