//! Tests for the acceptance gates and duplicate resolution

#[cfg(test)]
mod tests {
    use stniche::algorithm::filter::{FilterThresholds, SignificanceFilter};
    use stniche::algorithm::structure::{
        Candidate, SampleOccurrence, StructureArena, StructureId,
    };
    use stniche::analysis::statistics::{
        BenjaminiHochberg, BenjaminiYekutieli, GroupCounts, SignificanceTest,
    };
    use stniche::spatial::sample::{ClusterId, GroupId, SampleId};

    const FOCUS: GroupId = GroupId(0);
    const OTHER: GroupId = GroupId(1);

    /// Returns the same p-value for every table
    struct FixedP(f64);

    impl SignificanceTest for FixedP {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn p_value(&self, _counts: &GroupCounts) -> Option<f64> {
            Some(self.0)
        }
    }

    /// Strong focus signal gets 0.04, anything weaker 0.5
    struct SplitP;

    impl SignificanceTest for SplitP {
        fn name(&self) -> &'static str {
            "split"
        }

        fn p_value(&self, counts: &GroupCounts) -> Option<f64> {
            Some(if counts.focus_hits >= 8 { 0.04 } else { 0.5 })
        }
    }

    fn occurrence(sample: u32, group: GroupId, hits: usize, trials: usize) -> SampleOccurrence {
        SampleOccurrence {
            sample: SampleId(sample),
            group,
            occurrences: hits,
            trials,
            coverage: if hits > 0 { 1.0 } else { 0.0 },
        }
    }

    fn candidate(
        labels: &[u32],
        parent: Option<u32>,
        focus: (usize, usize),
        other: (usize, usize),
        coverage: f64,
    ) -> Candidate {
        let labels: Vec<ClusterId> = labels.iter().copied().map(ClusterId).collect();
        let mut canonical = labels.clone();
        canonical.sort_unstable();
        Candidate {
            labels,
            canonical,
            parent: parent.map(StructureId),
            samples: vec![
                occurrence(0, FOCUS, focus.0, focus.1),
                occurrence(1, FOCUS, 0, focus.1),
                occurrence(2, OTHER, other.0, other.1),
            ],
            instances: Vec::new(),
            coverage,
            mean_occurrence: focus.0 as f64 / 2.0,
        }
    }

    fn filter() -> SignificanceFilter {
        SignificanceFilter::new(
            FOCUS,
            OTHER,
            FilterThresholds {
                coverage: 0.5,
                fold: 2.0,
                p_value: 0.05,
            },
        )
    }

    #[test]
    fn test_group_counts_and_prevalence() {
        let candidate = candidate(&[0, 1], None, (4, 10), (1, 10), 1.0);
        let counts = filter().group_counts(&candidate);

        assert_eq!((counts.focus_hits, counts.focus_trials), (4, 20));
        assert_eq!((counts.other_hits, counts.other_trials), (1, 10));
        assert!((filter().prevalence(&candidate) - 0.5).abs() < f64::EPSILON);
    }

    // Gates run in order: signal, coverage, fold, raw p
    #[test]
    fn test_rejection_counts_per_gate() {
        let candidates = vec![
            candidate(&[0, 1], None, (0, 10), (0, 10), 1.0),
            candidate(&[0, 2], None, (4, 10), (1, 10), 0.2),
            candidate(&[0, 3], None, (1, 10), (1, 10), 1.0),
            candidate(&[1, 2], None, (8, 10), (1, 10), 1.0),
        ];
        let mut arena = StructureArena::new();
        let outcome = filter().apply(candidates, &FixedP(0.2), &BenjaminiHochberg, &mut arena);

        assert_eq!(outcome.evaluated, 4);
        assert_eq!(outcome.rejected_signal, 1);
        assert_eq!(outcome.rejected_coverage, 1);
        assert_eq!(outcome.rejected_fold, 1);
        assert_eq!(outcome.rejected_p_value, 1);
        assert!(outcome.accepted.is_empty());
    }

    // BY inflates two raw p-values of 0.04 to 0.06
    #[test]
    fn test_adjusted_gate() {
        let candidates = vec![
            candidate(&[0, 1], None, (8, 10), (1, 10), 1.0),
            candidate(&[0, 2], None, (8, 10), (1, 10), 1.0),
        ];
        let mut arena = StructureArena::new();

        let by = filter().apply(
            candidates.clone(),
            &FixedP(0.04),
            &BenjaminiYekutieli,
            &mut arena,
        );
        assert_eq!(by.rejected_adjusted, 2);
        assert!(by.accepted.is_empty());

        let bh = filter().apply(candidates, &FixedP(0.04), &BenjaminiHochberg, &mut arena);
        assert_eq!(bh.accepted.len(), 2);
        for evaluated in &bh.accepted {
            assert!(evaluated.stats.adjusted_p >= evaluated.stats.p_value);
        }
    }

    // Only the two raw-significant candidates form the corrected family
    #[test]
    fn test_adjustment_over_raw_survivors() {
        let mut candidates = vec![
            candidate(&[0, 1], None, (8, 10), (1, 10), 1.0),
            candidate(&[0, 2], None, (8, 10), (1, 10), 1.0),
        ];
        for label in 3..11 {
            candidates.push(candidate(&[0, label], None, (6, 10), (1, 10), 1.0));
        }
        let mut arena = StructureArena::new();
        let outcome = filter().apply(candidates, &SplitP, &BenjaminiHochberg, &mut arena);

        assert_eq!(outcome.rejected_p_value, 8);
        assert_eq!(outcome.rejected_adjusted, 0);
        assert_eq!(outcome.accepted.len(), 2);
        for evaluated in &outcome.accepted {
            assert!((evaluated.stats.adjusted_p - 0.04).abs() < 1e-12);
        }
    }

    #[test]
    fn test_focus_exclusive_bypasses_p_gates() {
        let candidates = vec![candidate(&[0, 1], None, (3, 10), (0, 10), 1.0)];
        let mut arena = StructureArena::new();
        let outcome = filter().apply(candidates, &FixedP(0.9), &BenjaminiHochberg, &mut arena);

        let Some(evaluated) = outcome.accepted.first() else {
            unreachable!("exclusive candidate accepted");
        };
        assert!(evaluated.stats.fold_change.is_infinite());
        assert!(evaluated.stats.counts.is_focus_exclusive());
        assert!((evaluated.stats.p_value - 0.9).abs() < f64::EPSILON);
        assert_eq!(arena.tuple(evaluated.tuple).map(<[ClusterId]>::len), Some(2));
    }

    // Same label set reached from two parents: the higher fold wins
    #[test]
    fn test_duplicates_resolved_by_fold() {
        let candidates = vec![
            candidate(&[0, 1, 2], Some(0), (4, 10), (1, 10), 1.0),
            candidate(&[0, 2, 1], Some(1), (8, 10), (1, 10), 1.0),
            candidate(&[1, 2, 3], Some(1), (8, 10), (1, 10), 1.0),
        ];
        let mut arena = StructureArena::new();
        let outcome = filter().apply(candidates, &FixedP(0.001), &BenjaminiHochberg, &mut arena);

        assert_eq!(outcome.duplicates, 1);
        let kept: Vec<_> = outcome
            .accepted
            .iter()
            .map(|e| (e.candidate.labels.clone(), e.candidate.parent))
            .collect();
        assert_eq!(
            kept,
            vec![
                (vec![ClusterId(0), ClusterId(2), ClusterId(1)], Some(StructureId(1))),
                (vec![ClusterId(1), ClusterId(2), ClusterId(3)], Some(StructureId(1))),
            ]
        );
    }

    // Equal statistics fall back to discovery-order labels
    #[test]
    fn test_duplicate_tie_break_on_labels() {
        let candidates = vec![
            candidate(&[0, 2, 1], Some(1), (8, 10), (1, 10), 1.0),
            candidate(&[0, 1, 2], Some(0), (8, 10), (1, 10), 1.0),
        ];
        let mut arena = StructureArena::new();
        let outcome = filter().apply(candidates, &FixedP(0.001), &BenjaminiHochberg, &mut arena);

        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(
            outcome.accepted.first().map(|e| e.candidate.parent),
            Some(Some(StructureId(0)))
        );
    }
}
