//! Coverage, enrichment and significance gates with deduplication
//!
//! Candidates of one order pass through the gates in a fixed sequence:
//! signal, coverage, fold, raw p-value, then adjusted p-value. Adjustment
//! runs only over the candidates that passed the raw p-value gate, so the
//! corrected family is the order's raw-significant candidates. Focus-exclusive
//! candidates pass both p-value gates and still count in the family.
//! Survivors sharing a canonical label set are reduced to one representative.

use std::cmp::Ordering;
use std::collections::HashMap;

use log::debug;

use crate::algorithm::structure::{Candidate, StructureArena, StructureStats, TupleId};
use crate::analysis::statistics::{FdrCorrection, GroupCounts, SignificanceTest};
use crate::spatial::sample::GroupId;

/// Thresholds applied to one order's candidates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterThresholds {
    /// Minimum aggregate coverage
    pub coverage: f64,
    /// Minimum focus/comparison fold
    pub fold: f64,
    /// Maximum raw and adjusted p-value
    pub p_value: f64,
}

/// A candidate that survived every gate
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    /// The candidate
    pub candidate: Candidate,
    /// Its statistics
    pub stats: StructureStats,
    /// Interned canonical labels
    pub tuple: TupleId,
}

/// Survivors of one order with per-gate rejection counts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    /// Accepted candidates in canonical order
    pub accepted: Vec<Evaluated>,
    /// Number of candidates received
    pub evaluated: usize,
    /// Rejected for never occurring in either group
    pub rejected_signal: usize,
    /// Rejected for low aggregate coverage
    pub rejected_coverage: usize,
    /// Rejected for low fold
    pub rejected_fold: usize,
    /// Rejected at the raw p-value gate
    pub rejected_p_value: usize,
    /// Rejected at the adjusted p-value gate
    pub rejected_adjusted: usize,
    /// Dropped as duplicates of a better-ranked candidate
    pub duplicates: usize,
}

/// Applies the acceptance gates to the candidates of one order
#[derive(Debug, Clone, Copy)]
pub struct SignificanceFilter {
    focus: GroupId,
    comparison: GroupId,
    thresholds: FilterThresholds,
}

impl SignificanceFilter {
    /// Create a filter for a focus/comparison group pair
    pub const fn new(focus: GroupId, comparison: GroupId, thresholds: FilterThresholds) -> Self {
        Self {
            focus,
            comparison,
            thresholds,
        }
    }

    /// Thresholds in effect
    pub const fn thresholds(&self) -> FilterThresholds {
        self.thresholds
    }

    /// Pool a candidate's per-sample occurrences by group
    pub fn group_counts(&self, candidate: &Candidate) -> GroupCounts {
        let mut counts = GroupCounts::default();
        for occurrence in &candidate.samples {
            if occurrence.group == self.focus || occurrence.group == self.comparison {
                counts.add_sample(
                    occurrence.group == self.focus,
                    occurrence.occurrences as u64,
                    occurrence.trials as u64,
                );
            }
        }
        counts
    }

    /// Fraction of focus samples in which a candidate occurs
    pub fn prevalence(&self, candidate: &Candidate) -> f64 {
        let focus: Vec<_> = candidate
            .samples
            .iter()
            .filter(|o| o.group == self.focus)
            .collect();
        if focus.is_empty() {
            return 0.0;
        }
        focus.iter().filter(|o| o.occurrences > 0).count() as f64 / focus.len() as f64
    }

    /// Gate, test, correct and deduplicate one order's candidates
    ///
    /// Canonical tuples of the survivors are interned in `arena`.
    pub fn apply(
        &self,
        candidates: Vec<Candidate>,
        test: &dyn SignificanceTest,
        fdr: &dyn FdrCorrection,
        arena: &mut StructureArena,
    ) -> FilterOutcome {
        let mut outcome = FilterOutcome {
            evaluated: candidates.len(),
            ..FilterOutcome::default()
        };

        // Signal, coverage and fold gates
        let mut testable: Vec<(Candidate, GroupCounts)> = Vec::new();
        for candidate in candidates {
            let counts = self.group_counts(&candidate);
            if !counts.has_signal() {
                outcome.rejected_signal += 1;
            } else if candidate.coverage < self.thresholds.coverage {
                outcome.rejected_coverage += 1;
            } else if counts.fold_change() < self.thresholds.fold {
                outcome.rejected_fold += 1;
            } else {
                testable.push((candidate, counts));
            }
        }

        // Raw p-value gate
        let mut significant: Vec<(Candidate, GroupCounts, f64)> = Vec::new();
        for (candidate, counts) in testable {
            let p_value = test.p_value(&counts).unwrap_or(1.0);
            if !counts.is_focus_exclusive() && p_value > self.thresholds.p_value {
                outcome.rejected_p_value += 1;
            } else {
                significant.push((candidate, counts, p_value));
            }
        }

        let raw: Vec<f64> = significant.iter().map(|(_, _, p)| *p).collect();
        let adjusted = fdr.adjust(&raw);

        let mut survivors: Vec<Evaluated> = Vec::new();
        for ((candidate, counts, p_value), adjusted_p) in significant.into_iter().zip(adjusted) {
            let adjusted_p = adjusted_p.max(p_value);
            if !counts.is_focus_exclusive() && adjusted_p > self.thresholds.p_value {
                outcome.rejected_adjusted += 1;
                continue;
            }

            let stats = StructureStats {
                fold_change: counts.fold_change(),
                p_value,
                adjusted_p,
                coverage: candidate.coverage,
                prevalence: self.prevalence(&candidate),
                mean_occurrence: candidate.mean_occurrence,
                counts,
            };
            let tuple = arena.intern(&candidate.canonical);
            survivors.push(Evaluated {
                candidate,
                stats,
                tuple,
            });
        }

        // One representative per canonical tuple
        let mut best: HashMap<TupleId, usize> = HashMap::new();
        for (index, evaluated) in survivors.iter().enumerate() {
            best.entry(evaluated.tuple)
                .and_modify(|current| {
                    let keep = survivors
                        .get(*current)
                        .is_some_and(|held| preference(held, evaluated).is_le());
                    if !keep {
                        *current = index;
                    }
                })
                .or_insert(index);
        }

        let mut winners: Vec<usize> = best.into_values().collect();
        winners.sort_unstable();
        outcome.duplicates = survivors.len() - winners.len();

        let mut accepted: Vec<Evaluated> = survivors
            .into_iter()
            .enumerate()
            .filter(|(index, _)| winners.binary_search(index).is_ok())
            .map(|(_, evaluated)| evaluated)
            .collect();
        accepted.sort_by(|a, b| a.candidate.canonical_cmp(&b.candidate));
        outcome.accepted = accepted;

        debug!(
            "Filter: {} evaluated, {} accepted (signal {}, coverage {}, fold {}, p {}, adjusted {}, duplicates {})",
            outcome.evaluated,
            outcome.accepted.len(),
            outcome.rejected_signal,
            outcome.rejected_coverage,
            outcome.rejected_fold,
            outcome.rejected_p_value,
            outcome.rejected_adjusted,
            outcome.duplicates
        );

        outcome
    }
}

/// Ranking among duplicates; `Less` means `a` is preferred
///
/// Highest fold, then lowest adjusted p-value, then discovery-order labels,
/// then the lowest parent id.
fn preference(a: &Evaluated, b: &Evaluated) -> Ordering {
    b.stats
        .fold_change
        .total_cmp(&a.stats.fold_change)
        .then(a.stats.adjusted_p.total_cmp(&b.stats.adjusted_p))
        .then_with(|| a.candidate.labels.cmp(&b.candidate.labels))
        .then(a.candidate.parent.cmp(&b.candidate.parent))
}
