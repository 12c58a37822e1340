//! Tests for group count summaries, significance tests and FDR corrections

#[cfg(test)]
mod tests {
    use stniche::analysis::statistics::{
        BenjaminiHochberg, BenjaminiYekutieli, ChiSquare, FdrCorrection, FdrMethod, FisherExact,
        GroupCounts, MannWhitneyU, PermutationTest, SignificanceTest, TestMethod,
    };

    fn counts(focus: &[(u64, u64)], other: &[(u64, u64)]) -> GroupCounts {
        let mut counts = GroupCounts::default();
        for &(hits, trials) in focus {
            counts.add_sample(true, hits, trials);
        }
        for &(hits, trials) in other {
            counts.add_sample(false, hits, trials);
        }
        counts
    }

    #[test]
    fn test_pooled_rates_and_fold() {
        let c = counts(&[(2, 10), (4, 10)], &[(1, 10), (2, 20)]);
        assert_eq!((c.focus_hits, c.focus_trials), (6, 20));
        assert_eq!((c.other_hits, c.other_trials), (3, 30));
        assert!((c.focus_rate() - 0.3).abs() < 1e-12);
        assert!((c.fold_change() - 3.0).abs() < 1e-12);
        assert_eq!(c.contingency(), [[6, 14], [3, 27]]);
        assert_eq!(c.focus_rates, vec![0.2, 0.4]);
    }

    // Samples without trials contribute no per-sample rate
    #[test]
    fn test_zero_trial_samples_skip_rates() {
        let c = counts(&[(0, 0), (1, 4)], &[(0, 0)]);
        assert_eq!(c.focus_rates, vec![0.25]);
        assert!(c.other_rates.is_empty());
    }

    #[test]
    fn test_fold_edge_cases() {
        let exclusive = counts(&[(3, 10)], &[(0, 10)]);
        assert!(exclusive.is_focus_exclusive());
        assert!(exclusive.fold_change().is_infinite());

        let absent = counts(&[(0, 10)], &[(4, 10)]);
        assert!(absent.fold_change().abs() < f64::EPSILON);
        assert!(absent.has_signal());

        let silent = counts(&[(0, 10)], &[(0, 10)]);
        assert!(!silent.has_signal());
        assert!(!silent.is_focus_exclusive());
    }

    // Reference value from the classic 2x2 table [[1, 9], [11, 3]]
    #[test]
    fn test_fisher_exact_reference() {
        let c = counts(&[(1, 10)], &[(11, 14)]);
        let p = FisherExact.p_value(&c);
        let Some(p) = p else {
            unreachable!("non-degenerate table");
        };
        assert!((p - 0.002_759).abs() < 1e-5, "got {p}");
    }

    #[test]
    fn test_fisher_degenerate_table() {
        assert_eq!(FisherExact.p_value(&counts(&[(0, 0)], &[(3, 9)])), None);
        assert_eq!(FisherExact.p_value(&counts(&[(0, 5)], &[(0, 9)])), None);
    }

    // Yates-corrected statistic for [[1, 9], [11, 3]] is 8.4
    #[test]
    fn test_chi_square_reference() {
        let c = counts(&[(1, 10)], &[(11, 14)]);
        let Some(p) = ChiSquare.p_value(&c) else {
            unreachable!("non-degenerate table");
        };
        assert!((p - 0.003_753).abs() < 1e-4, "got {p}");
    }

    // Completely separated groups of three give U = 9 and p near 0.08
    #[test]
    fn test_mann_whitney_separated_groups() {
        let c = counts(&[(9, 10), (8, 10), (17, 20)], &[(1, 10), (2, 10), (3, 20)]);
        let Some(p) = MannWhitneyU.p_value(&c) else {
            unreachable!("both groups have rates");
        };
        assert!(p > 0.05 && p < 0.1, "got {p}");
        assert_eq!(MannWhitneyU.p_value(&counts(&[(1, 2)], &[])), None);
    }

    #[test]
    fn test_permutation_is_seeded() {
        let c = counts(&[(9, 10), (8, 10), (7, 10)], &[(1, 10), (2, 10), (3, 10)]);
        let test = PermutationTest {
            permutations: 500,
            seed: 7,
        };
        let first = test.p_value(&c);
        let second = test.p_value(&c);
        assert_eq!(first, second);
        assert!(first.is_some_and(|p| p > 0.0 && p <= 1.0));
    }

    #[test]
    fn test_benjamini_hochberg() {
        let adjusted = BenjaminiHochberg.adjust(&[0.01, 0.04, 0.03, 0.005]);
        let expected = [0.02, 0.04, 0.04, 0.02];
        for (a, e) in adjusted.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "got {adjusted:?}");
        }
    }

    #[test]
    fn test_benjamini_yekutieli_is_stricter() {
        let raw = [0.01, 0.04, 0.03, 0.005];
        let bh = BenjaminiHochberg.adjust(&raw);
        let by = BenjaminiYekutieli.adjust(&raw);
        let harmonic = 1.0 + 1.0 / 2.0 + 1.0 / 3.0 + 1.0 / 4.0;
        for (b, y) in bh.iter().zip(&by) {
            assert!((y - b * harmonic).abs() < 1e-12);
        }
    }

    // Adjusted values stay within [raw, 1]
    #[test]
    fn test_adjustment_bounds() {
        let raw = [0.9, 0.95, 0.2, 1.0, 0.0];
        for adjusted in [BenjaminiHochberg.adjust(&raw), BenjaminiYekutieli.adjust(&raw)] {
            assert_eq!(adjusted.len(), raw.len());
            for (a, r) in adjusted.iter().zip(raw) {
                assert!(*a >= r && *a <= 1.0);
            }
        }
        assert!(BenjaminiHochberg.adjust(&[]).is_empty());
    }

    #[test]
    fn test_method_factories() {
        assert_eq!(TestMethod::default().build(10, 1).name(), "fisher");
        assert_eq!(TestMethod::ChiSquare.build(10, 1).name(), "chi-square");
        assert_eq!(TestMethod::MannWhitney.build(10, 1).name(), "mann-whitney");
        assert_eq!(TestMethod::Permutation.build(10, 1).name(), "permutation");
        assert_eq!(FdrMethod::default().build().name(), "benjamini-hochberg");
        assert_eq!(FdrMethod::BenjaminiYekutieli.build().name(), "benjamini-yekutieli");
    }
}
