//! Tests for instance shape signatures

#[cfg(test)]
mod tests {
    use stniche::algorithm::shape::{PairSpacing, ShapeSignature, tally};
    use stniche::spatial::grid::GridTopology;
    use stniche::spatial::sample::ClusterId;

    const X: ClusterId = ClusterId(0);
    const Y: ClusterId = ClusterId(1);
    const Z: ClusterId = ClusterId(2);

    fn signature(spots: &[(ClusterId, [i32; 2])]) -> ShapeSignature {
        ShapeSignature::new(spots, &GridTopology::Hexagonal)
    }

    fn spacing(squared_distance: u64, a: ClusterId, b: ClusterId) -> PairSpacing {
        PairSpacing {
            squared_distance,
            labels: (a, b),
        }
    }

    // Three mutually adjacent spots of the doubled-column layout
    #[test]
    fn test_triangle_signature() {
        let triangle = signature(&[(Y, [0, 2]), (X, [0, 0]), (Z, [1, 1])]);
        assert_eq!(
            triangle.pairs(),
            [spacing(4, X, Y), spacing(4, X, Z), spacing(4, Y, Z)]
        );
    }

    #[test]
    fn test_invariant_under_motion_and_listing_order() {
        let bent = signature(&[(X, [0, 0]), (Y, [0, 2]), (Z, [1, 3])]);
        let shifted = signature(&[(Z, [5, 9]), (X, [4, 6]), (Y, [4, 8])]);
        let mirrored = signature(&[(X, [0, 6]), (Y, [0, 4]), (Z, [1, 3])]);

        assert_eq!(bent, shifted);
        assert_eq!(bent, mirrored);
        assert_eq!(
            bent.pairs(),
            [spacing(4, X, Y), spacing(4, Y, Z), spacing(12, X, Z)]
        );
    }

    // Same labels, different arrangement
    #[test]
    fn test_arrangements_distinguished() {
        let triangle = signature(&[(X, [0, 0]), (Y, [0, 2]), (Z, [1, 1])]);
        let bent = signature(&[(X, [0, 0]), (Y, [0, 2]), (Z, [1, 3])]);
        let straight = signature(&[(X, [0, 0]), (Y, [0, 2]), (Z, [0, 4])]);

        assert_ne!(triangle, bent);
        assert_ne!(bent, straight);
        assert_eq!(straight.pairs().last(), Some(&spacing(16, X, Z)));
    }

    #[test]
    fn test_square_metric() {
        let corner = ShapeSignature::new(&[(X, [0, 0]), (X, [1, 1])], &GridTopology::Square8);
        assert_eq!(corner.pairs(), [spacing(2, X, X)]);
    }

    // Most frequent first, ties in signature order
    #[test]
    fn test_tally_orders_by_count() {
        let triangle = signature(&[(X, [0, 0]), (Y, [0, 2]), (Z, [1, 1])]);
        let bent = signature(&[(X, [0, 0]), (Y, [0, 2]), (Z, [1, 3])]);
        let pair = signature(&[(X, [0, 0]), (Y, [0, 2])]);

        let counts = tally([
            bent.clone(),
            triangle.clone(),
            bent.clone(),
            pair.clone(),
            bent.clone(),
        ]);
        let summary: Vec<_> = counts
            .iter()
            .map(|c| (c.signature.clone(), c.instances))
            .collect();
        assert_eq!(summary, vec![(bent, 3), (pair, 1), (triangle, 1)]);
        assert!(tally(Vec::<ShapeSignature>::new()).is_empty());
    }
}
