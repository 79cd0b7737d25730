use super::{
    config_stub, default_config, load_config, resolve_config, validate_config, write_config,
    ConvertConfig, CONFIG_SCHEMA_VERSION,
};
use crate::terms::TermRegistry;
use serde_json::json;

fn config_from(value: serde_json::Value) -> ConvertConfig {
    serde_json::from_value(value).expect("parse config")
}

#[test]
fn default_config_compiles_to_builtin_registry() {
    let config = default_config().expect("default config");
    assert!(config.prune);
    let registry = validate_config(&config).expect("valid config");
    assert_eq!(registry, TermRegistry::builtin().expect("builtin registry"));
}

#[test]
fn stub_round_trips_through_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("config.json");
    let stub: ConvertConfig =
        serde_json::from_str(&config_stub().expect("stub")).expect("parse stub");

    write_config(&path, &stub).expect("write config");
    let loaded = load_config(&path).expect("load config");
    assert_eq!(loaded, stub);
    assert_eq!(resolve_config(Some(&path)).expect("resolve"), stub);
}

#[test]
fn terms_keep_declaration_order() {
    let config = config_from(json!({
        "schema_version": CONFIG_SCHEMA_VERSION,
        "terms": [
            { "id": "BT-21-Lot", "spec": { "collections": { "tender.lots": {
                "fields": { "title": "overwrite" }
            } } } },
            { "id": "BT-137-Lot", "spec": { "collections": { "tender.lots": {} } } },
            { "id": "BT-500-Organization-Company", "spec": { "collections": { "parties": {
                "fields": { "name": { "policy": "preserve_if_richer", "rule": "department_qualifier" } }
            } } } }
        ]
    }));
    assert!(config.prune);
    let registry = validate_config(&config).expect("valid config");
    let ids: Vec<&str> = registry.iter().map(|term| term.id()).collect();
    assert_eq!(ids, ["BT-21-Lot", "BT-137-Lot", "BT-500-Organization-Company"]);
}

#[test]
fn unknown_policy_fails_validation() {
    let config = config_from(json!({
        "schema_version": CONFIG_SCHEMA_VERSION,
        "terms": [{ "id": "BT-13713-LotResult", "spec": { "collections": { "awards": {
            "fields": { "relatedLots": "concatenate" }
        } } } }]
    }));
    let err = validate_config(&config).expect_err("unknown policy");
    let chain = format!("{err:#}");
    assert!(chain.contains("concatenate"), "{chain}");
    assert!(chain.contains("BT-13713-LotResult:awards.relatedLots"), "{chain}");
}

#[test]
fn wrong_schema_version_is_rejected() {
    let config = config_from(json!({ "schema_version": 99, "terms": [] }));
    let err = validate_config(&config).expect_err("schema version");
    assert!(err.to_string().contains("schema_version 99"));
}

#[test]
fn unknown_config_keys_are_rejected() {
    let result = serde_json::from_value::<ConvertConfig>(json!({
        "schema_version": CONFIG_SCHEMA_VERSION,
        "prune": false,
        "term": []
    }));
    assert!(result.is_err());
}
