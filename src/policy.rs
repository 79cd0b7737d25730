//! Field merge policies applied when two versions of one entity meet.
//!
//! A `null` contribution is a no-op under every policy: absent data never
//! erases what an earlier business term wrote.
use crate::error::{ReconcileError, ReconcileResult};
use crate::identity::{resolve, KeySpec, Resolution};
use crate::release::ensure_array;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergePolicy {
    /// New value replaces the existing one.
    Overwrite,
    /// Arrays of primitives treated as sets; first-seen order is kept.
    UnionSet,
    /// Arrays of sub-entities matched by key (whole value when no key) and merged.
    AppendDedupByKey(Option<KeySpec>),
    /// Objects merged per attribute; absent keys never erase present ones.
    DeepMerge,
    /// Overwrite unless the existing value already satisfies the rule.
    PreserveIfRicher(RicherRule),
}

impl MergePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            MergePolicy::Overwrite => "overwrite",
            MergePolicy::UnionSet => "union_set",
            MergePolicy::AppendDedupByKey(_) => "append_dedup_by_key",
            MergePolicy::DeepMerge => "deep_merge",
            MergePolicy::PreserveIfRicher(_) => "preserve_if_richer",
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::PreserveIfRicher(rule) => write!(f, "{}:{}", self.name(), rule),
            _ => f.write_str(self.name()),
        }
    }
}

/// Predicates deciding that an existing value is richer than any newcomer.
///
/// These encode business rules of the notice converters and are kept even
/// where they look arbitrary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RicherRule {
    /// Organisation names qualified with a department (`"Ministry - IT Dept"`).
    DepartmentQualifier,
    /// Any non-empty value; the first writer wins.
    NonEmpty,
}

impl RicherRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            RicherRule::DepartmentQualifier => "department_qualifier",
            RicherRule::NonEmpty => "non_empty",
        }
    }

    pub fn from_name(name: &str, path: &str) -> ReconcileResult<Self> {
        match name {
            "department_qualifier" => Ok(RicherRule::DepartmentQualifier),
            "non_empty" => Ok(RicherRule::NonEmpty),
            other => Err(ReconcileError::UnknownMergePolicy {
                path: path.to_string(),
                name: format!("preserve_if_richer:{other}"),
            }),
        }
    }

    pub fn is_rich(&self, existing: &Value) -> bool {
        match self {
            RicherRule::DepartmentQualifier => existing
                .as_str()
                .is_some_and(|name| name.contains(" - ")),
            RicherRule::NonEmpty => match existing {
                Value::Null => false,
                Value::String(text) => !text.is_empty(),
                Value::Array(items) => !items.is_empty(),
                Value::Object(map) => !map.is_empty(),
                Value::Bool(_) | Value::Number(_) => true,
            },
        }
    }
}

impl fmt::Display for RicherRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure form of [`merge_into`]: returns the merged value and its warnings.
pub fn merge_field(
    existing: Option<&Value>,
    new: &Value,
    policy: &MergePolicy,
    path: &str,
) -> (Value, Vec<ReconcileError>) {
    let mut merged = existing.cloned().unwrap_or(Value::Null);
    let problems = merge_into(&mut merged, new, policy, path);
    (merged, problems)
}

/// Merge `new` into `target` in place. `Value::Null` in `target` means "absent".
///
/// Returns the problems to surface as warnings: sub-entities skipped for a
/// missing key, or kept apart for a conflicting composite key. Only
/// [`MergePolicy::AppendDedupByKey`] with a key produces them.
pub fn merge_into(
    target: &mut Value,
    new: &Value,
    policy: &MergePolicy,
    path: &str,
) -> Vec<ReconcileError> {
    if new.is_null() {
        return Vec::new();
    }
    match policy {
        MergePolicy::Overwrite => {
            *target = new.clone();
            Vec::new()
        }
        MergePolicy::UnionSet => {
            union_set(target, new);
            Vec::new()
        }
        MergePolicy::AppendDedupByKey(key) => append_dedup(target, new, key.as_ref(), path),
        MergePolicy::DeepMerge => {
            deep_merge(target, new);
            Vec::new()
        }
        MergePolicy::PreserveIfRicher(rule) => {
            if !rule.is_rich(target) {
                *target = new.clone();
            }
            Vec::new()
        }
    }
}

fn union_set(target: &mut Value, new: &Value) {
    let items = ensure_array(target);
    let incoming: &[Value] = match new {
        Value::Array(values) => values,
        single => std::slice::from_ref(single),
    };
    for value in incoming {
        if !value.is_null() && !items.contains(value) {
            items.push(value.clone());
        }
    }
}

fn append_dedup(
    target: &mut Value,
    new: &Value,
    key: Option<&KeySpec>,
    path: &str,
) -> Vec<ReconcileError> {
    let items = ensure_array(target);
    let incoming: &[Value] = match new {
        Value::Array(values) => values,
        single => std::slice::from_ref(single),
    };
    let mut problems = Vec::new();
    for value in incoming {
        let Some(key_spec) = key else {
            if !value.is_null() && !items.contains(value) {
                items.push(value.clone());
            }
            continue;
        };
        let identity = match key_spec.key_of(value, path) {
            Ok(identity) => identity,
            Err(err) => {
                problems.push(err);
                continue;
            }
        };
        match resolve(items, &identity) {
            Resolution::Existing(index) => deep_merge(&mut items[index], value),
            Resolution::Conflicting { differing, .. } => {
                problems.push(ReconcileError::ConflictingCompositeKey {
                    path: path.to_string(),
                    primary: identity_primary(&identity),
                    differing: differing.join(","),
                });
                items.push(value.clone());
            }
            Resolution::New => items.push(value.clone()),
        }
    }
    problems
}

pub(crate) fn identity_primary(identity: &crate::identity::IdentityKey) -> String {
    identity
        .parts()
        .first()
        .map(|(field, value)| match value {
            Value::String(text) => format!("{field}={text}"),
            other => format!("{field}={other}"),
        })
        .unwrap_or_default()
}

/// Default attribute merge used wherever no policy is declared.
///
/// Objects recurse, arrays go through [`merge_arrays`], anything else overwrites.
pub fn deep_merge(target: &mut Value, new: &Value) {
    match new {
        Value::Null => {}
        Value::Object(incoming) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(existing) = target {
                merge_maps(existing, incoming);
            }
        }
        Value::Array(incoming) => {
            if !target.is_array() {
                *target = Value::Array(Vec::new());
            }
            if let Value::Array(existing) = target {
                merge_arrays(existing, incoming);
            }
        }
        scalar => *target = scalar.clone(),
    }
}

fn merge_maps(existing: &mut Map<String, Value>, incoming: &Map<String, Value>) {
    for (key, value) in incoming {
        if value.is_null() {
            continue;
        }
        let slot = existing.entry(key.clone()).or_insert(Value::Null);
        deep_merge(slot, value);
    }
}

/// Arrays of objects that all carry an `id` merge element-wise by `id`;
/// anything else is appended unless an equal element is already present.
///
/// Elements sharing an `id` under different `scheme`s are distinct entities.
pub fn merge_arrays(existing: &mut Vec<Value>, incoming: &[Value]) {
    let keyed = existing
        .iter()
        .chain(incoming)
        .filter(|value| !value.is_null())
        .all(has_id);
    for value in incoming {
        if value.is_null() {
            continue;
        }
        if keyed {
            if let Some(found) = existing
                .iter_mut()
                .find(|current| same_identified_element(current, value))
            {
                deep_merge(found, value);
                continue;
            }
        }
        if !existing.contains(value) {
            existing.push(value.clone());
        }
    }
}

fn has_id(value: &Value) -> bool {
    value.get("id").is_some_and(|id| !id.is_null())
}

fn same_identified_element(current: &Value, new: &Value) -> bool {
    if current.get("id") != new.get("id") {
        return false;
    }
    match (current.get("scheme"), new.get("scheme")) {
        (Some(existing), Some(incoming)) => existing == incoming,
        _ => true,
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
