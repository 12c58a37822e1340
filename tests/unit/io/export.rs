//! Tests for the JSON report

#[cfg(test)]
mod tests {
    use crate::common::{chain_table, scenario_config};
    use serde_json::Value;
    use stniche::discover;
    use stniche::io::export::DiscoveryReport;
    use tempfile::TempDir;

    fn report() -> DiscoveryReport {
        let table = chain_table();
        let config = scenario_config();
        let Ok(run) = discover(&table, &config) else {
            unreachable!("chain scenario runs");
        };
        DiscoveryReport::from_run(&run, &table, &config)
    }

    #[test]
    fn test_labels_resolved_to_names() {
        let report = report();
        assert_eq!(report.focus_group, "focus");
        assert_eq!(report.comparison_group, "other");
        assert_eq!(report.adjacency.clusters, vec!["X", "Y", "Z"]);
        assert_eq!(
            report.adjacency.significant,
            vec![["X".to_string(), "Y".to_string()]]
        );
        assert_eq!(report.parameters.test, "fisher");
        assert_eq!(report.parameters.offsets.len(), 6);

        let Some(triple) = report
            .iterations
            .get(1)
            .and_then(|i| i.structures.first())
        else {
            unreachable!("order 3 accepted X-Y-Z");
        };
        assert_eq!(triple.labels, vec!["X", "Y", "Z"]);
        assert_eq!(triple.lineage, vec![0, 1]);
        assert_eq!(triple.parent, Some(0));
        assert!(triple.focus_exclusive);
    }

    // F1 barcodes follow the synthesised sample:row x col pattern
    #[test]
    fn test_sample_detail() {
        let report = report();
        let Some(pair) = report.iterations.first().and_then(|i| i.structures.first()) else {
            unreachable!("order 2 accepted X-Y");
        };

        let Some(f1) = pair.samples.iter().find(|s| s.sample == "F1") else {
            unreachable!("F1 listed");
        };
        assert_eq!((f1.occurrences, f1.trials), (3, 16));
        assert_eq!(f1.group, "focus");
        assert_eq!(f1.spots, vec!["F1:0x0", "F1:0x2", "F1:0x4", "F1:1x5"]);

        // Every X-Y edge is one spot pitch long
        let Some(shape) = f1.shapes.first() else {
            unreachable!("F1 realizes X-Y");
        };
        assert_eq!((f1.shapes.len(), shape.instances), (1, 3));
        let Some(spacing) = shape.spacings.first() else {
            unreachable!("one spacing per pair");
        };
        assert_eq!((spacing.first.as_str(), spacing.second.as_str()), ("X", "Y"));
        assert!((spacing.distance - 1.0).abs() < 1e-12);

        let Some(o1) = pair.samples.iter().find(|s| s.sample == "O1") else {
            unreachable!("O1 listed");
        };
        assert!(o1.spots.is_empty() && o1.shapes.is_empty());
    }

    #[test]
    fn test_difference_matrix_diagonal() {
        let report = report();
        for (i, row) in report.adjacency.difference_matrix.iter().enumerate() {
            assert_eq!(row.len(), 3);
            assert!(row.get(i).is_some_and(|d| d.abs() < f64::EPSILON));
        }
    }

    // Infinite folds become null in JSON
    #[test]
    fn test_json_encoding() {
        let Ok(text) = report().to_json() else {
            unreachable!("report encodes");
        };
        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            unreachable!("valid JSON");
        };

        let fold = &value["iterations"][0]["structures"][0]["fold_change"];
        assert!(fold.is_null());
        assert_eq!(value["iterations"][2]["order"], 4);
        assert_eq!(value["iterations"][2]["structures"], Value::Array(Vec::new()));
    }

    #[test]
    fn test_write_json() {
        let Ok(dir) = TempDir::new() else {
            unreachable!("temp dir");
        };
        let path = dir.path().join("report.json");
        assert!(report().write_json(&path).is_ok());

        let Ok(text) = std::fs::read_to_string(&path) else {
            unreachable!("report written");
        };
        assert!(text.contains("\"focus_group\": \"focus\""));

        let missing = dir.path().join("absent").join("report.json");
        assert!(report().write_json(&missing).is_err());
    }
}
