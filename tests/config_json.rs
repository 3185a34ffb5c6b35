use edge_sieve::prelude::*;

#[test]
fn suite_config_from_json() {
    let text = r#"{
        "n_ranks": 3,
        "bucket_count": 7,
        "cases": [
            { "key": "Plain", "payload": "Scalar", "vertex_width": "U32", "edge_width": "U64" },
            { "key": { "Tagged": { "tags": 3 } }, "payload": "Pair",
              "vertex_width": "U64", "edge_width": "U64", "property": "F64" }
        ]
    }"#;
    let cfg: SuiteConfig = serde_json::from_str(text).unwrap();
    assert_eq!(cfg.root, 0);
    assert!(cfg.check_correctness);
    assert_eq!(cfg.cases[0].property, PropertyKind::I32);
    assert_eq!(cfg.cases[1].key, KeyKind::Tagged { tags: 3 });

    let report = run_suite(&cfg, &karate_club()).unwrap();
    assert_eq!(report.cases.len(), 2);
    assert!(report.all_passed());
    assert_eq!(report.cases[1].case, "tagged-key/pair-payload/u64v/u64e/f64");
}

#[test]
fn suite_config_round_trips() {
    let cfg = SuiteConfig::default();
    let text = serde_json::to_string(&cfg).unwrap();
    let back: SuiteConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(back, cfg);
    let empty: SuiteConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, cfg);
}

#[test]
fn rmat_config_defaults_fill_missing_fields() {
    let cfg: RmatConfig = serde_json::from_str(r#"{ "scale": 6, "seed": 7 }"#).unwrap();
    assert_eq!(cfg.n_vertices(), 64);
    assert_eq!(cfg.edge_factor, RmatConfig::default().edge_factor);
    let a = generate_rmat(&cfg).unwrap();
    let b = generate_rmat(&cfg).unwrap();
    assert_eq!(a.edges, b.edges);

    let bad: RmatConfig = serde_json::from_str(r#"{ "a": 0.9 }"#).unwrap();
    assert!(matches!(generate_rmat(&bad), Err(GraphError::InvalidGeneratorConfig(_))));
}

#[test]
fn zero_tags_are_rejected_before_running() {
    let cfg: SuiteConfig = serde_json::from_str(
        r#"{ "cases": [ { "key": { "Tagged": { "tags": 0 } }, "payload": "Empty",
                         "vertex_width": "U32", "edge_width": "U32" } ] }"#,
    )
    .unwrap();
    assert!(matches!(run_suite(&cfg, &karate_club()), Err(GraphError::InvalidShape(_))));
}
