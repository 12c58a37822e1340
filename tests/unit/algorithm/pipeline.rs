//! Tests for the discovery entry point and run accessors

#[cfg(test)]
mod tests {
    use crate::common::{chain_records, chain_table, scenario_config, spot};
    use stniche::algorithm::pipeline::{NicheMembership, discover};
    use stniche::algorithm::shape::PairSpacing;
    use stniche::algorithm::structure::StructureId;
    use stniche::io::configuration::IntegrityPolicy;
    use stniche::spatial::sample::{ClusterId, SampleId, SpotTable};
    use stniche::{DiscoveryConfig, NicheError};

    #[test]
    fn test_run_accessors() {
        let Ok(run) = discover(&chain_table(), &scenario_config()) else {
            unreachable!("chain scenario runs");
        };

        assert_eq!(run.highest_order(), Some(3));
        assert_eq!(run.graphs.len(), 4);
        assert!(run.skipped_samples.is_empty());
        assert!(run.iteration(4).is_some_and(|r| r.is_empty()));
        assert!(run.iteration(5).is_none());

        let triples = run.structures_at(3);
        assert_eq!(triples.len(), 1);
        let Some(xyz) = triples.first() else {
            unreachable!("one triple");
        };
        assert_eq!(xyz.canonical, vec![ClusterId(0), ClusterId(1), ClusterId(2)]);

        let lineage: Vec<_> = run.lineage(xyz.id).iter().map(|s| s.order()).collect();
        assert_eq!(lineage, vec![2, 3]);
    }

    // F1 occupies table indices 0..9; only (2,0) and (2,2) touch no X-Y edge
    #[test]
    fn test_realizing_spots_and_membership() {
        let Ok(run) = discover(&chain_table(), &scenario_config()) else {
            unreachable!("chain scenario runs");
        };
        let id = StructureId(1);

        let spots = run.realizing_spots(id);
        assert_eq!(spots.len(), 2);
        assert_eq!(spots.first(), Some(&(SampleId(0), vec![0, 1, 2, 3, 4, 5, 8])));
        assert_eq!(
            spots.get(1),
            Some(&(SampleId(1), vec![9, 10, 11, 12, 13, 14, 17]))
        );

        let membership = run.niche_membership(id);
        assert_eq!(membership.len(), 2);
        assert_eq!(
            membership.first(),
            Some(&NicheMembership {
                sample: SampleId(0),
                niche: vec![0, 1, 2, 3, 4, 5, 8],
                background: vec![6, 7],
            })
        );
        assert!(run.realizing_spots(StructureId(99)).is_empty());
    }

    // Half of the X-Y-Z triples close into triangles, half bend
    #[test]
    fn test_shapes_of_realizing_sets() {
        let table = chain_table();
        let Ok(run) = discover(&table, &scenario_config()) else {
            unreachable!("chain scenario runs");
        };
        let (x, y, z) = (ClusterId(0), ClusterId(1), ClusterId(2));
        let spacing = |squared_distance, labels| PairSpacing {
            squared_distance,
            labels,
        };

        let pair_shapes = run.shapes(StructureId(0), &table);
        let Some((sample, shapes)) = pair_shapes.first() else {
            unreachable!("X-Y realized in F1");
        };
        assert_eq!(*sample, SampleId(0));
        let counts: Vec<_> = shapes.iter().map(|s| s.instances).collect();
        assert_eq!(counts, vec![3]);

        let triple_shapes = run.shapes(StructureId(1), &table);
        assert_eq!(triple_shapes.len(), 2);
        let Some((_, shapes)) = triple_shapes.first() else {
            unreachable!("X-Y-Z realized in F1");
        };
        let summary: Vec<_> = shapes
            .iter()
            .map(|s| (s.signature.pairs().to_vec(), s.instances))
            .collect();
        assert_eq!(
            summary,
            vec![
                (
                    vec![spacing(4, (x, y)), spacing(4, (x, z)), spacing(4, (y, z))],
                    3
                ),
                (
                    vec![spacing(4, (x, y)), spacing(4, (y, z)), spacing(12, (x, z))],
                    3
                ),
            ]
        );
        assert!(run.shapes(StructureId(99), &table).is_empty());
    }

    #[test]
    fn test_unknown_group_rejected() {
        let config = DiscoveryConfig::for_groups("focus", "control");
        assert!(matches!(
            discover(&chain_table(), &config),
            Err(NicheError::UnknownLabel { kind: "group", .. })
        ));
    }

    fn table_with_broken_sample() -> SpotTable {
        let mut records = chain_records();
        records.push(spot("O3", "other", 0, 0, "X"));
        records.push(spot("O3", "other", 0, 0, "Y"));
        SpotTable::from_records(&records)
    }

    #[test]
    fn test_integrity_policy() {
        let table = table_with_broken_sample();

        let strict = scenario_config();
        assert!(matches!(
            discover(&table, &strict),
            Err(NicheError::DataIntegrity { ref sample, .. }) if sample == "O3"
        ));

        let lenient = DiscoveryConfig {
            integrity: IntegrityPolicy::SkipSample,
            ..scenario_config()
        };
        let Ok(run) = discover(&table, &lenient) else {
            unreachable!("broken sample skipped");
        };
        assert_eq!(run.skipped_samples, vec!["O3".to_string()]);
        assert_eq!(run.graphs.len(), 4);
        assert_eq!(run.highest_order(), Some(3));
    }

    #[test]
    fn test_invalid_parameter_never_skipped() {
        let config = DiscoveryConfig {
            max_order: Some(1),
            integrity: IntegrityPolicy::SkipSample,
            ..scenario_config()
        };
        assert!(matches!(
            discover(&chain_table(), &config),
            Err(NicheError::InvalidParameter { parameter: "max_order", .. })
        ));
    }
}
