//! Fragment reconciliation: folds sparse business-term fragments into one release.
//!
//! The engine is stateless across notices. Every call mutates the
//! [`ReleaseDocument`] it is handed and returns a [`MergeReport`]; entity-level
//! problems are skipped and reported, never raised.
use crate::error::ReconcileError;
use crate::identity::{resolve, IdentityKey, Resolution};
use crate::policy::{deep_merge, identity_primary, merge_into, MergePolicy};
use crate::release::{ensure_array, join_path, kind_of, lookup, lookup_in_map, ReleaseDocument};
use crate::report::{MergeReport, Warning, WarningKind};
use crate::spec::{release_base_spec, MergeSpec};
use serde_json::{Map, Value};

mod scope;

use scope::{CollectionScope, Declared, Scope};

#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    base: MergeSpec,
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationEngine {
    /// Engine layering term specs over [`release_base_spec`].
    pub fn new() -> Self {
        Self::with_base(release_base_spec())
    }

    pub fn with_base(base: MergeSpec) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &MergeSpec {
        &self.base
    }

    /// Apply one business term's output. `None` means the term found nothing.
    pub fn apply(
        &self,
        release: &mut ReleaseDocument,
        term_id: &str,
        fragment: Option<&Value>,
        spec: &MergeSpec,
    ) -> MergeReport {
        let Some(fragment) = fragment else {
            tracing::debug!(term = term_id, "no fragment");
            return MergeReport::default();
        };
        let report = self.merge_inner(release, Some(term_id), fragment, spec);
        tracing::debug!(
            term = term_id,
            created = report.entities_created,
            merged = report.entities_merged,
            warnings = report.warnings.len(),
            "applied fragment"
        );
        report
    }

    /// Merge a fragment that is not attributed to any business term.
    pub fn merge(
        &self,
        release: &mut ReleaseDocument,
        fragment: &Value,
        spec: &MergeSpec,
    ) -> MergeReport {
        self.merge_inner(release, None, fragment, spec)
    }

    /// Make sure an entity with `key` exists in the collection at `path`.
    ///
    /// Creation adds only the key fields, so calling this in any order relative
    /// to the fragments that enrich the entity yields the same entity. A
    /// composite key that only partly matches an existing entity creates a
    /// distinct one and reports the conflict.
    pub fn ensure_entity(
        &self,
        release: &mut ReleaseDocument,
        path: &str,
        key: &IdentityKey,
    ) -> EnsuredEntity {
        let entities = release.collection_mut(path);
        match resolve(entities, key) {
            Resolution::Existing(index) => EnsuredEntity {
                index,
                created: false,
                conflict: None,
            },
            Resolution::New => {
                entities.push(key.to_entity());
                EnsuredEntity {
                    index: entities.len() - 1,
                    created: true,
                    conflict: None,
                }
            }
            Resolution::Conflicting { differing, .. } => {
                entities.push(key.to_entity());
                EnsuredEntity {
                    index: entities.len() - 1,
                    created: true,
                    conflict: Some(ReconcileError::ConflictingCompositeKey {
                        path: path.to_string(),
                        primary: identity_primary(key),
                        differing: differing.join(","),
                    }),
                }
            }
        }
    }

    fn merge_inner(
        &self,
        release: &mut ReleaseDocument,
        term: Option<&str>,
        fragment: &Value,
        spec: &MergeSpec,
    ) -> MergeReport {
        let mut pass = Pass {
            term,
            report: MergeReport::default(),
            pending: Vec::new(),
        };
        match fragment {
            Value::Object(fields) => {
                let scope = Scope::new(Some(spec.root()), Some(self.base.root()));
                pass.merge_object(release.as_map_mut(), fields, scope, "", "");
            }
            Value::Null => {}
            other => pass.warn(
                WarningKind::MalformedFragment,
                "",
                format!("fragment must be a JSON object (got {})", kind_of(other)),
            ),
        }

        for pending in std::mem::take(&mut pass.pending) {
            let ensured = self.ensure_entity(release, &pending.target, &pending.key);
            if let Some(conflict) = &ensured.conflict {
                pass.warn_error(conflict);
            }
            if ensured.created {
                tracing::debug!(target_path = %pending.target, key = %pending.key, "implicit entity");
                pass.report.entities_created += 1;
            }
        }
        pass.report
    }
}

/// Outcome of [`ReconciliationEngine::ensure_entity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredEntity {
    pub index: usize,
    pub created: bool,
    pub conflict: Option<ReconcileError>,
}

struct PendingRef {
    target: String,
    key: IdentityKey,
}

/// State of one fragment merge.
struct Pass<'t> {
    term: Option<&'t str>,
    report: MergeReport,
    pending: Vec<PendingRef>,
}

impl Pass<'_> {
    /// `rel` is the path within the current entity (or release root) and
    /// selects policies; `abs` only labels warnings.
    fn merge_object(
        &mut self,
        target: &mut Map<String, Value>,
        incoming: &Map<String, Value>,
        scope: Scope<'_>,
        rel: &str,
        abs: &str,
    ) {
        for (key, value) in incoming {
            if value.is_null() {
                continue;
            }
            let rel_path = join_path(rel, key);
            let abs_path = join_path(abs, key);
            match (scope.lookup(&rel_path), value) {
                (Some(Declared::Collection(collection)), _) => {
                    let slot = target.entry(key.clone()).or_insert(Value::Null);
                    self.merge_collection(ensure_array(slot), value, collection, &abs_path);
                }
                (Some(Declared::Policy(MergePolicy::DeepMerge)) | None, Value::Object(child)) => {
                    let slot = target
                        .entry(key.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if !slot.is_object() {
                        *slot = Value::Object(Map::new());
                    }
                    if let Value::Object(existing) = slot {
                        self.merge_object(existing, child, scope, &rel_path, &abs_path);
                    }
                }
                (Some(Declared::Policy(policy)), _) => {
                    let slot = target.entry(key.clone()).or_insert(Value::Null);
                    for err in merge_into(slot, value, policy, &abs_path) {
                        self.warn_error(&err);
                    }
                }
                (None, _) => {
                    let slot = target.entry(key.clone()).or_insert(Value::Null);
                    deep_merge(slot, value);
                }
            }
        }
    }

    fn merge_collection(
        &mut self,
        entities: &mut Vec<Value>,
        incoming: &Value,
        collection: CollectionScope<'_>,
        path: &str,
    ) {
        let items: &[Value] = match incoming {
            Value::Array(items) => items,
            Value::Object(_) => std::slice::from_ref(incoming),
            other => {
                self.warn(
                    WarningKind::MalformedFragment,
                    path,
                    format!("expected an array of entities (got {})", kind_of(other)),
                );
                return;
            }
        };

        for item in items {
            let Value::Object(fields) = item else {
                self.warn(
                    WarningKind::MalformedFragment,
                    path,
                    format!("entity must be an object (got {})", kind_of(item)),
                );
                continue;
            };
            let key = match collection.key().key_of(item, path) {
                Ok(key) => key,
                Err(err) => {
                    self.warn_error(&err);
                    continue;
                }
            };
            match resolve(entities, &key) {
                Resolution::Existing(index) => {
                    let entity_path = format!("{path}[{index}]");
                    if let Value::Object(existing) = &mut entities[index] {
                        self.merge_object(existing, fields, collection.section(), "", &entity_path);
                    }
                    self.report.entities_merged += 1;
                }
                Resolution::Conflicting { differing, .. } => {
                    self.warn_error(&ReconcileError::ConflictingCompositeKey {
                        path: path.to_string(),
                        primary: identity_primary(&key),
                        differing: differing.join(","),
                    });
                    self.create(entities, fields, collection, path);
                }
                Resolution::New => self.create(entities, fields, collection, path),
            }
            self.queue_references(item, collection);
        }
    }

    /// Append a structural copy of a fragment entity, normalised by its policies.
    fn create(
        &mut self,
        entities: &mut Vec<Value>,
        fields: &Map<String, Value>,
        collection: CollectionScope<'_>,
        path: &str,
    ) {
        let index = entities.len();
        let mut entity = Map::new();
        if let Some(field) = collection.sequential_id_field() {
            if lookup_in_map(fields, field).is_none() {
                let id = next_sequential_id(entities, field);
                entity.insert(field.to_string(), Value::String(id));
            }
        }
        self.merge_object(
            &mut entity,
            fields,
            collection.section(),
            "",
            &format!("{path}[{index}]"),
        );
        entities.push(Value::Object(entity));
        self.report.entities_created += 1;
    }

    fn queue_references(&mut self, item: &Value, collection: CollectionScope<'_>) {
        for reference in collection.references() {
            let Some(value) = lookup(item, &reference.field) else {
                continue;
            };
            let ids: &[Value] = match value {
                Value::Array(ids) => ids,
                single => std::slice::from_ref(single),
            };
            for id in ids {
                let usable = match id {
                    Value::String(text) => !text.trim().is_empty(),
                    Value::Number(_) => true,
                    _ => false,
                };
                if usable {
                    self.pending.push(PendingRef {
                        target: reference.target.clone(),
                        key: IdentityKey::single(reference.key.clone(), id.clone()),
                    });
                }
            }
        }
    }

    fn warn_error(&mut self, err: &ReconcileError) {
        self.push_warning(Warning::from_error(self.term, err));
    }

    fn warn(&mut self, kind: WarningKind, path: &str, message: String) {
        self.push_warning(Warning::new(kind, self.term, path, message));
    }

    fn push_warning(&mut self, warning: Warning) {
        tracing::warn!(
            term = self.term.unwrap_or("-"),
            kind = %warning.kind,
            "{}",
            warning.message
        );
        self.report.warnings.push(warning);
    }
}

/// 1-based position of the next entity, skipped forward past any taken value.
///
/// Numeric ids count as taken too: `2` and `"2"` are the same identifier.
fn next_sequential_id(entities: &[Value], field: &str) -> String {
    let mut candidate = entities.len() + 1;
    loop {
        let id = candidate.to_string();
        let taken = entities
            .iter()
            .any(|entity| lookup(entity, field).is_some_and(|value| id_matches(value, &id)));
        if !taken {
            return id;
        }
        candidate += 1;
    }
}

fn id_matches(value: &Value, id: &str) -> bool {
    match value {
        Value::String(text) => text == id,
        Value::Number(number) => number.to_string() == id,
        _ => false,
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
