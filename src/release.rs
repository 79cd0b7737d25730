//! The OCDS release under construction for one notice.
//!
//! Paths used throughout the crate are dotted object paths relative to some
//! root (`tender.lots`, `address.locality`); array indices never appear in them.
use crate::error::{ReconcileError, ReconcileResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Entity collections every release may carry, all keyed by `id`.
pub const STANDARD_COLLECTIONS: &[&str] = &[
    "parties",
    "tender.lots",
    "tender.lotGroups",
    "tender.items",
    "tender.documents",
    "bids.details",
    "bids.statistics",
    "awards",
    "contracts",
    "relatedProcesses",
    "withheldInformation",
    "statistics",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseDocument {
    root: Map<String, Value>,
}

impl ReleaseDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(root: Map<String, Value>) -> Self {
        Self { root }
    }

    pub fn from_value(value: Value) -> ReconcileResult<Self> {
        match value {
            Value::Object(root) => Ok(Self::from_map(root)),
            other => Err(ReconcileError::invalid_spec(
                "<release>",
                format!("release document must be a JSON object (got {})", kind_of(&other)),
            )),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.root
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup_in_map(&self.root, path)
    }

    pub fn collection(&self, path: &str) -> Option<&Vec<Value>> {
        self.get(path).and_then(Value::as_array)
    }

    /// Return the array at `path`, creating intermediate objects and the array itself.
    ///
    /// A non-array value already sitting at `path` is wrapped as the first element
    /// so it is never discarded.
    pub fn collection_mut(&mut self, path: &str) -> &mut Vec<Value> {
        let mut segments = split_path(path).peekable();
        let mut current = &mut self.root;
        loop {
            let segment = segments.next().unwrap_or_default();
            if segments.peek().is_none() {
                let slot = current
                    .entry(segment.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                return ensure_array(slot);
            }
            let slot = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            current = match slot {
                Value::Object(map) => map,
                _ => unreachable!("slot was just made an object"),
            };
        }
    }
}

/// Coerce `slot` into an array without losing whatever it held.
pub(crate) fn ensure_array(slot: &mut Value) -> &mut Vec<Value> {
    if !slot.is_array() {
        let previous = slot.take();
        *slot = Value::Array(if previous.is_null() {
            Vec::new()
        } else {
            vec![previous]
        });
    }
    match slot {
        Value::Array(items) => items,
        _ => unreachable!("slot was just made an array"),
    }
}

pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|segment| !segment.is_empty())
}

pub fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Follow a dotted path through nested objects.
pub fn lookup<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    split_path(path).try_fold(value, |current, segment| current.get(segment))
}

pub(crate) fn lookup_in_map<'v>(map: &'v Map<String, Value>, path: &str) -> Option<&'v Value> {
    let mut segments = split_path(path);
    let first = map.get(segments.next()?)?;
    segments.try_fold(first, |current, segment| current.get(segment))
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
