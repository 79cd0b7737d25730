mod common;

use common::{assert_success, fixture_dir, path_arg, read_json, run_ocdsmerge};
use serde_json::json;

#[test]
fn merge_replays_fragment_log_into_release_and_report() {
    let temp = tempfile::tempdir().expect("tempdir");
    let fragments = fixture_dir("basic-notice").join("fragments.json");
    let release_path = temp.path().join("out").join("release.json");
    let report_path = temp.path().join("report.json");

    let output = run_ocdsmerge(&[
        "merge",
        "--fragments",
        path_arg(&fragments),
        "--out",
        path_arg(&release_path),
        "--report",
        path_arg(&report_path),
    ]);
    assert_success(&output);

    let release = read_json(&release_path);
    assert_eq!(
        release,
        json!({
            "awards": [{ "id": "RES-0001", "relatedLots": ["LOT-0001"] }],
            "buyer": { "id": "ORG-0001" },
            "contracts": [{ "id": "CON-0001", "awardIDs": ["RES-0001"] }],
            "parties": [
                { "id": "ORG-0001", "name": "City of Springfield - Public Works", "roles": ["buyer"] },
                { "id": "ORG-0002", "name": "Acme Paving" }
            ],
            "tender": {
                "lots": [
                    { "id": "LOT-0001", "title": "Road resurfacing",
                      "value": { "amount": 250000, "currency": "EUR" } },
                    { "id": "LOT-0002", "title": "Bridge inspection" }
                ],
                "items": [
                    { "id": "1", "relatedLot": "LOT-0001",
                      "classification": { "scheme": "CPV", "id": "45233142" },
                      "additionalClassifications": [{ "scheme": "CPV", "id": "45233000" }] },
                    { "id": "2", "relatedLot": "LOT-0002",
                      "additionalClassifications": [{ "scheme": "CPV", "id": "71631450" }] }
                ]
            }
        })
    );

    let report = read_json(&report_path);
    assert_eq!(report["schema_version"], 1);
    assert_eq!(report["notice_id"], "00654321-2024");
    assert_eq!(report["terms_failed"], json!(["BT-24-Lot"]));
    assert_eq!(report["terms_empty"], json!(["BT-5010-Lot"]));
    assert_eq!(report["pruned"], true);
    let kinds: Vec<&str> = report["warnings"]
        .as_array()
        .expect("warnings array")
        .iter()
        .filter_map(|warning| warning["kind"].as_str())
        .collect();
    assert_eq!(kinds, ["extractor_failure", "unregistered_term"]);
}

#[test]
fn merge_without_prune_keeps_empty_values_on_stdout() {
    let fragments = fixture_dir("basic-notice").join("fragments.json");
    let output = run_ocdsmerge(&["merge", "--fragments", path_arg(&fragments), "--no-prune"]);
    assert_success(&output);

    let release: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("release JSON on stdout");
    assert_eq!(release["tender"]["procurementMethodDetails"], "");
}

#[test]
fn init_writes_a_config_that_validates_and_refuses_to_clobber() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = temp.path().join("terms.json");

    assert_success(&run_ocdsmerge(&["init", "--out", path_arg(&config)]));
    let written = read_json(&config);
    assert_eq!(written["schema_version"], 1);
    assert!(written["terms"].as_array().map(Vec::len).unwrap_or(0) > 20);

    let validated = run_ocdsmerge(&["validate", "--config", path_arg(&config)]);
    assert_success(&validated);
    assert!(String::from_utf8_lossy(&validated.stdout).contains("terms registered"));

    let again = run_ocdsmerge(&["init", "--out", path_arg(&config)]);
    assert!(!again.status.success());
    assert!(String::from_utf8_lossy(&again.stderr).contains("--force"));
    assert_success(&run_ocdsmerge(&["init", "--out", path_arg(&config), "--force"]));
}

#[test]
fn validate_rejects_unknown_policy_names() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = temp.path().join("terms.json");
    std::fs::write(
        &config,
        serde_json::to_vec(&json!({
            "schema_version": 1,
            "terms": [{ "id": "BT-13713-LotResult", "spec": { "collections": {
                "awards": { "fields": { "relatedLots": "append_unique" } }
            } } }]
        }))
        .expect("serialize config"),
    )
    .expect("write config");

    let output = run_ocdsmerge(&["validate", "--config", path_arg(&config)]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("append_unique"), "{stderr}");
}

#[test]
fn merge_honours_a_custom_config() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = temp.path().join("terms.json");
    let fragments = temp.path().join("fragments.json");
    std::fs::write(
        &config,
        serde_json::to_vec(&json!({
            "schema_version": 1,
            "prune": false,
            "terms": [{ "id": "BT-500-Organization-Company", "spec": { "collections": {
                "parties": { "fields": { "name": "overwrite" } }
            } } }]
        }))
        .expect("serialize config"),
    )
    .expect("write config");
    std::fs::write(
        &fragments,
        serde_json::to_vec(&json!({
            "schema_version": 1,
            "entries": [
                { "term": "BT-500-Organization-Company",
                  "fragment": { "parties": [{ "id": "ORG-1", "name": "Ministry - Finance" }] } },
                { "term": "BT-500-Organization-Company",
                  "fragment": { "parties": [{ "id": "ORG-1", "name": "Ministry", "email": "" }] } }
            ]
        }))
        .expect("serialize fragments"),
    )
    .expect("write fragments");

    let output = run_ocdsmerge(&[
        "merge",
        "--fragments",
        path_arg(&fragments),
        "--config",
        path_arg(&config),
    ]);
    assert_success(&output);
    let release: serde_json::Value = serde_json::from_slice(&output.stdout).expect("release JSON");
    assert_eq!(
        release["parties"],
        json!([{ "id": "ORG-1", "name": "Ministry", "email": "" }])
    );
}

#[test]
fn prune_command_cleans_a_document() {
    let temp = tempfile::tempdir().expect("tempdir");
    let input = temp.path().join("release.json");
    let out = temp.path().join("pruned.json");
    std::fs::write(
        &input,
        r#"{"tender":{"lots":[{"id":"LOT-1","techniques":{}}],"title":""},"date":null,"amount":0}"#,
    )
    .expect("write input");

    assert_success(&run_ocdsmerge(&[
        "prune",
        "--input",
        path_arg(&input),
        "--out",
        path_arg(&out),
    ]));
    assert_eq!(
        read_json(&out),
        json!({ "tender": { "lots": [{ "id": "LOT-1" }] }, "amount": 0 })
    );
}
