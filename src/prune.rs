//! Final clean-up pass removing empty containers before serialization.
//!
//! Runs once per notice after every fragment is merged; intermediate empty
//! containers are legal while merging.
use crate::release::ReleaseDocument;
use serde_json::{Map, Value};

/// Prune `value`; `None` means the whole value is empty and should be omitted.
///
/// `null`, `""`, `{}` and `[]` are empty, as is any container that only held
/// empty values. `0` and `false` are data and stay.
pub fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(key, value)| prune(value).map(|value| (key, value)))
                .collect();
            (!pruned.is_empty()).then_some(Value::Object(pruned))
        }
        Value::Array(items) => {
            let pruned: Vec<Value> = items.into_iter().filter_map(prune).collect();
            (!pruned.is_empty()).then_some(Value::Array(pruned))
        }
        other => Some(other),
    }
}

pub fn prune_release(release: ReleaseDocument) -> ReleaseDocument {
    match prune(release.into_value()) {
        Some(Value::Object(root)) => ReleaseDocument::from_map(root),
        _ => ReleaseDocument::new(),
    }
}
