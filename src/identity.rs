//! Entity resolution: identity keys and lookup within a collection.
use crate::error::{ReconcileError, ReconcileResult};
use crate::release::lookup;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Field(s) that identify an entity within one collection.
///
/// The first field is the primary component; composite keys such as
/// classifications use `(scheme, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeySpec {
    fields: Vec<String>,
}

impl KeySpec {
    pub fn id() -> Self {
        Self::single("id")
    }

    pub fn single(field: impl Into<String>) -> Self {
        Self {
            fields: vec![field.into()],
        }
    }

    pub fn composite<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn primary(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or_default()
    }

    pub fn is_composite(&self) -> bool {
        self.fields.len() > 1
    }

    pub(crate) fn validate(&self, path: &str) -> ReconcileResult<()> {
        if self.fields.is_empty() {
            return Err(ReconcileError::invalid_spec(path, "identity key has no fields"));
        }
        if self.fields.iter().any(|field| field.trim().is_empty()) {
            return Err(ReconcileError::invalid_spec(
                path,
                "identity key contains an empty field name",
            ));
        }
        Ok(())
    }

    /// Compute the identity of `entity`; `path` only labels the error.
    pub fn key_of(&self, entity: &Value, path: &str) -> ReconcileResult<IdentityKey> {
        let mut parts = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            match lookup(entity, field) {
                Some(value) if is_usable_key_value(value) => {
                    parts.push((field.clone(), value.clone()))
                }
                _ => {
                    return Err(ReconcileError::MissingIdentityKey {
                        path: path.to_string(),
                        missing: field.clone(),
                    })
                }
            }
        }
        Ok(IdentityKey { parts })
    }
}

impl Default for KeySpec {
    fn default() -> Self {
        Self::id()
    }
}

fn is_usable_key_value(value: &Value) -> bool {
    match value {
        Value::String(text) => !text.trim().is_empty(),
        Value::Number(_) | Value::Bool(_) => true,
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

/// Concrete identity of one entity: `(field, value)` pairs in key order.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityKey {
    parts: Vec<(String, Value)>,
}

impl IdentityKey {
    pub fn single(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            parts: vec![(field.into(), value.into())],
        }
    }

    pub fn parts(&self) -> &[(String, Value)] {
        &self.parts
    }

    pub fn matches(&self, entity: &Value) -> bool {
        self.parts
            .iter()
            .all(|(field, value)| lookup(entity, field) == Some(value))
    }

    fn matches_primary(&self, entity: &Value) -> bool {
        self.parts
            .first()
            .is_some_and(|(field, value)| lookup(entity, field) == Some(value))
    }

    fn differing_fields(&self, entity: &Value) -> Vec<String> {
        self.parts
            .iter()
            .filter(|(field, value)| lookup(entity, field) != Some(value))
            .map(|(field, _)| field.clone())
            .collect()
    }

    /// Minimal entity carrying only this key, used for implicit creation.
    pub fn to_entity(&self) -> Value {
        let mut entity = Value::Object(Map::new());
        for (field, value) in &self.parts {
            insert_path(&mut entity, field, value.clone());
        }
        entity
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .parts
            .iter()
            .map(|(field, value)| match value {
                Value::String(text) => format!("{field}={text}"),
                other => format!("{field}={other}"),
            })
            .collect();
        f.write_str(&rendered.join(","))
    }
}

fn insert_path(target: &mut Value, path: &str, value: Value) {
    let mut segments: Vec<&str> = crate::release::split_path(path).collect();
    let Some(last) = segments.pop() else {
        return;
    };
    let mut current = target;
    for segment in segments {
        let Value::Object(map) = current else {
            return;
        };
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if let Value::Object(map) = current {
        map.insert(last.to_string(), value);
    }
}

/// Outcome of looking a key up in a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Existing(usize),
    New,
    /// Composite key whose primary component matches an existing entity while
    /// other components differ; callers create a distinct entity.
    Conflicting { index: usize, differing: Vec<String> },
}

/// Find the entity in `collection` whose identity equals `key`. Pure lookup.
pub fn resolve(collection: &[Value], key: &IdentityKey) -> Resolution {
    if let Some(index) = collection.iter().position(|entity| key.matches(entity)) {
        return Resolution::Existing(index);
    }
    if key.parts.len() > 1 {
        if let Some(index) = collection
            .iter()
            .position(|entity| key.matches_primary(entity))
        {
            return Resolution::Conflicting {
                index,
                differing: key.differing_fields(&collection[index]),
            };
        }
    }
    Resolution::New
}
