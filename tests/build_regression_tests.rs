#[cfg(test)]
mod build_regression_tests {
    use std::collections::BTreeSet;
    use std::io::Write;
    use tempfile::{Builder, TempDir};

    use l1000geom::detail::{Assembly, DetailLevel};
    use l1000geom::error::GeometryError;
    use l1000geom::export::{detector_macro, find_overlaps, to_gdml};
    use l1000geom::geometry::{DetectorKind, VolumeRegistry};
    use l1000geom::metadata::generator::CLUSTER_CENTERS;
    use l1000geom::metadata::validate_detector_name;
    use l1000geom::orchestrator::{construct, GeometryRequest, MetadataSource};
    use l1000geom::placement::{cold_length, polar_to_cartesian};

    fn request(detail: DetailLevel) -> GeometryRequest {
        GeometryRequest {
            detail,
            ..GeometryRequest::default()
        }
    }

    fn build(request: &GeometryRequest) -> VolumeRegistry {
        construct(request).unwrap().registry
    }

    #[test]
    fn test_builds_are_deterministic() {
        for level in DetailLevel::ALL {
            assert_eq!(build(&request(level)), build(&request(level)), "level {}", level);
        }
    }

    #[test]
    fn test_generated_metadata_round_trip() {
        let geometry = construct(&request(DetailLevel::Full)).unwrap();

        let dir = TempDir::new().unwrap();
        let special_metadata = dir.path().join("special_metadata.yaml");
        let channelmap = dir.path().join("channelmap.json");
        geometry.metadata.write(&special_metadata, &channelmap).unwrap();

        let from_files = GeometryRequest {
            detail: DetailLevel::Full,
            metadata: MetadataSource::Files {
                special_metadata,
                channelmap,
            },
            ..GeometryRequest::default()
        };
        let reloaded = construct(&from_files).unwrap();
        assert_eq!(reloaded.metadata, geometry.metadata);
        assert_eq!(reloaded.registry, geometry.registry);
    }

    #[test]
    fn test_names_are_unique() {
        for level in DetailLevel::ALL {
            let registry = build(&request(level));
            let names: BTreeSet<&str> = registry.nodes().map(|n| n.name.as_str()).collect();
            assert_eq!(names.len(), registry.len(), "duplicate placement names at level {}", level);

            let uids: BTreeSet<u32> = registry.detectors().map(|(_, d)| d.uid).collect();
            assert_eq!(uids.len(), registry.detectors().count());
        }
    }

    #[test]
    fn test_germanium_detector_names() {
        let registry = build(&request(DetailLevel::Radiogenic));
        let geds: Vec<_> = registry
            .detectors()
            .filter(|(_, d)| d.kind == DetectorKind::Germanium)
            .collect();
        assert_eq!(geds.len(), 42 * 8);
        for (node, detector) in geds {
            assert!(validate_detector_name(&node.name).is_ok(), "{}", node.name);
            assert!(detector.uid >= 101);
        }
    }

    #[test]
    fn test_cryostat_is_always_built() {
        let request = GeometryRequest {
            detail: DetailLevel::Simple,
            assemblies: Some("wlsr".to_string()),
            ..GeometryRequest::default()
        };
        let registry = build(&request);
        for name in ["outercryostat", "vacuum_gap", "innercryostat", "lar"] {
            assert!(registry.contains(name), "{} missing", name);
        }
        assert!(!registry.contains("tank"));
        assert!(!registry.contains("string_1"));
    }

    #[test]
    fn test_unknown_assembly_is_rejected() {
        let request = GeometryRequest {
            assemblies: Some("hpge_strings,cryostat".to_string()),
            ..GeometryRequest::default()
        };
        assert!(matches!(construct(&request), Err(GeometryError::Config(_))));
    }

    #[test]
    fn test_string_placement() {
        let registry = build(&request(DetailLevel::Simple));
        let [x, y] = polar_to_cartesian(220.0, 60.0);
        let [sx, sy, _] = registry.node("string_2").unwrap().transform.translation;
        assert!((sx - x).abs() < 1e-9 && (sy - y).abs() < 1e-9);

        let [cx, cy] = CLUSTER_CENTERS[1];
        let [sx, sy, _] = registry.node("string_7").unwrap().transform.translation;
        assert!((sx - cx - 220.0).abs() < 1e-9 && (sy - cy).abs() < 1e-9);

        let top = registry.node("DUMMY00101").unwrap().transform.translation[2];
        let fourth = registry.node("DUMMY00104").unwrap().transform.translation[2];
        assert!((top - fourth - 3.0 * cold_length(140.1)).abs() < 1e-9);
    }

    #[test]
    fn test_override_changes_layout() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "string:\n  units:\n    n: 3\n    l: 150.0\n").unwrap();

        let request = GeometryRequest {
            detail: DetailLevel::Simple,
            config_override: Some(file.path().to_path_buf()),
            ..GeometryRequest::default()
        };
        let registry = build(&request);
        assert!(registry.contains("DUMMY00103"));
        assert!(!registry.contains("DUMMY00104"));
    }

    #[test]
    fn test_detector_substitution() {
        let mut db = Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            db,
            r#"{{"V01234A": {{"system": "geds",
                "geometry": {{"type": "bege", "height_in_mm": 30.0, "radius_in_mm": 37.5}},
                "production": {{"enrichment": 0.88, "manufacturer": "Mirion"}}}}}}"#
        )
        .unwrap();

        let request = GeometryRequest {
            detail: DetailLevel::Simple,
            metadata: MetadataSource::Substitute {
                request: l1000geom::metadata::DetectorOverride::parse("{'hpge': 'V01234A'}").unwrap(),
                database: db.path().to_path_buf(),
            },
            ..GeometryRequest::default()
        };
        let registry = build(&request);
        let detector = registry.logical("DUMMY00101").unwrap();
        assert_eq!(detector.material, "enriched_germanium_880");
    }

    #[test]
    fn test_gdml_export_is_consistent() {
        let geometry = construct(&request(DetailLevel::Full)).unwrap();
        let gdml = to_gdml(&geometry.registry, &geometry.catalog).unwrap();

        assert_eq!(gdml.matches("<physvol ").count(), geometry.registry.len() - 1);
        let placed: BTreeSet<&str> = geometry.registry.nodes().map(|n| n.logical.as_str()).collect();
        assert_eq!(gdml.matches("<volume ").count(), placed.len());
        assert!(gdml.contains("<world ref=\"world\"/>"));
        assert!(gdml.contains("<bordersurface name=\"bsurface_lar_ge_DUMMY00101\""));

        let macro_lines = detector_macro(&geometry.registry).lines().count();
        assert_eq!(macro_lines, geometry.registry.detectors().count());
    }

    #[test]
    fn test_no_overlaps() {
        for level in DetailLevel::ALL {
            let registry = build(&request(level));
            let overlaps = find_overlaps(&registry);
            assert!(
                overlaps.is_empty(),
                "level {}: {}",
                level,
                overlaps.iter().map(|o| o.to_string()).collect::<Vec<_>>().join("; ")
            );
        }
    }

    #[test]
    fn test_water_tank_selection() {
        let request = GeometryRequest {
            detail: DetailLevel::Full,
            assemblies: Some(
                [Assembly::Watertank, Assembly::WatertankInstrumentation]
                    .iter()
                    .map(|a| a.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            ..GeometryRequest::default()
        };
        let registry = build(&request);
        assert_eq!(registry.node("outercryostat").unwrap().mother.as_deref(), Some("tank_water"));
        assert!(registry.contains("tank_flange_1"));
        assert!(registry.contains("pmt_floor_101"));
        assert!(!registry.contains("string_1"));
        assert!(!registry.contains("calibration_tube_1"));
    }
}
