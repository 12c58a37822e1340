//! Tests for groupwise cluster-pair adjacency

#[cfg(test)]
mod tests {
    use crate::common::{chain_table, graphs};
    use stniche::analysis::adjacency::{
        AdjacencyTable, AdjacencyThresholds, GroupwiseAdjacencyAnalyzer,
    };
    use stniche::analysis::statistics::{BenjaminiHochberg, FisherExact};
    use stniche::spatial::sample::{ClusterId, GroupId};

    const X: ClusterId = ClusterId(0);
    const Y: ClusterId = ClusterId(1);
    const Z: ClusterId = ClusterId(2);

    fn analyze(enrichment_fold: f64) -> AdjacencyTable {
        let built = graphs(&chain_table());
        GroupwiseAdjacencyAnalyzer::new(
            GroupId(0),
            GroupId(1),
            AdjacencyThresholds {
                enrichment_fold,
                p_threshold: 0.05,
            },
        )
        .analyze(&built, 3, &FisherExact, &BenjaminiHochberg)
    }

    // Per focus sample: X-Y 3, X-Z 2, Y-Z 4, Z-Z 7 of 16 edges
    #[test]
    fn test_pair_counts_per_group() {
        let table = analyze(2.0);
        assert_eq!(table.pairs().len(), 6);

        let Some(xy) = table.pair(X, Y) else {
            unreachable!("X-Y observed");
        };
        assert_eq!((xy.focus_count(), xy.comparison_count()), (6, 0));
        assert_eq!(xy.counts.focus_trials, 32);

        let Some(xz) = table.pair(X, Z) else {
            unreachable!("X-Z observed");
        };
        assert_eq!((xz.focus_count(), xz.comparison_count()), (4, 10));
        assert!((xz.fold - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_pair_lookup_is_symmetric() {
        let table = analyze(2.0);
        assert_eq!(table.pair(Y, X), table.pair(X, Y));
        assert_eq!(table.pair(Z, Y), table.pair(Y, Z));
        assert!(table.pair(X, X).is_none_or(|p| p.is_self_pair()));
    }

    // Z-Z is enriched but self pairs never enter the significant subset
    #[test]
    fn test_significant_subset() {
        let table = analyze(2.0);
        let significant: Vec<_> = table.significant().map(|p| p.labels()).collect();
        assert_eq!(significant, vec![[X, Y]]);
        assert_eq!(table.significant_count(), 1);

        let Some(zz) = table.pair(Z, Z) else {
            unreachable!("Z-Z observed");
        };
        assert!(zz.fold > 2.0);
    }

    #[test]
    fn test_focus_exclusive_pair() {
        let table = analyze(1000.0);
        let Some(xy) = table.pair(X, Y) else {
            unreachable!("X-Y observed");
        };
        assert!(xy.is_focus_exclusive());
        assert!(xy.fold.is_infinite());
        assert_eq!(table.significant_count(), 1);
    }

    #[test]
    fn test_adjusted_never_below_raw() {
        let table = analyze(2.0);
        for pair in table.pairs() {
            assert!(pair.adjusted_p >= pair.p_value);
            assert!(pair.adjusted_p <= 1.0);
        }
    }

    // Focus X spots average 1.5 Y neighbors; comparison X spots none
    #[test]
    fn test_mean_matrices() {
        let table = analyze(2.0);
        let x_to_y = table.focus_matrix().get([0, 1]).copied();
        assert_eq!(x_to_y, Some(1.5));
        assert_eq!(table.comparison_matrix().get([0, 1]).copied(), Some(0.0));

        let x_to_z = table.comparison_matrix().get([0, 2]).copied().unwrap_or(0.0);
        assert!((x_to_z - 5.0 / 3.0).abs() < 1e-12);

        let diff = table.difference_matrix();
        assert_eq!(diff.get([0, 1]).copied(), Some(1.5));
        assert!(diff.diag().iter().all(|v| *v == 0.0));
    }

    // Labels beyond the requested cluster count drop out of the matrices
    #[test]
    fn test_matrices_limited_to_cluster_count() {
        let built = graphs(&chain_table());
        let table = GroupwiseAdjacencyAnalyzer::new(
            GroupId(0),
            GroupId(1),
            AdjacencyThresholds {
                enrichment_fold: 2.0,
                p_threshold: 0.05,
            },
        )
        .analyze(&built, 2, &FisherExact, &BenjaminiHochberg);

        assert_eq!(table.focus_matrix().dim(), (2, 2));
        assert_eq!(table.focus_matrix().get([0, 1]).copied(), Some(1.5));
        assert_eq!(table.focus_matrix().get([1, 0]).copied(), Some(1.5));
        assert!(table.focus_matrix().get([0, 2]).is_none());
    }
}
