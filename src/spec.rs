//! Declarative merge specs: identity keys and field policies per path.
//!
//! One [`MergeSpec`] accompanies each business term. Paths are relative to the
//! enclosing section: release-root paths at the top level (`tender.lots`),
//! entity-relative paths inside a collection (`address.locality`).
use crate::error::{ReconcileError, ReconcileResult};
use crate::identity::KeySpec;
use crate::policy::MergePolicy;
use crate::release::{join_path, split_path};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod base;
mod decl;

pub(crate) use base::lot_items;
pub use base::release_base_spec;
pub use decl::{CollectionDecl, PolicyDecl, SpecDecl};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSpec {
    root: SectionSpec,
}

/// Field policies and nested collections of one object level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionSpec {
    fields: BTreeMap<String, MergePolicy>,
    collections: BTreeMap<String, CollectionSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    key: KeySpec,
    sequential_id: Option<String>,
    references: Vec<EntityRef>,
    section: SectionSpec,
}

/// Identifiers in `field` of a merged entity must exist in `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub field: String,
    pub target: String,
    #[serde(default = "default_ref_key")]
    pub key: String,
}

fn default_ref_key() -> String {
    "id".to_string()
}

impl EntityRef {
    pub fn new(field: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            target: target.into(),
            key: default_ref_key(),
        }
    }
}

impl MergeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, path: impl Into<String>, policy: MergePolicy) -> Self {
        self.root.fields.insert(path.into(), policy);
        self
    }

    pub fn collection(mut self, path: impl Into<String>, spec: CollectionSpec) -> Self {
        self.root.collections.insert(path.into(), spec);
        self
    }

    pub fn root(&self) -> &SectionSpec {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn validate(&self) -> ReconcileResult<()> {
        self.root.validate("")
    }
}

impl SectionSpec {
    pub fn policy(&self, path: &str) -> Option<&MergePolicy> {
        self.fields.get(path)
    }

    pub fn collection(&self, path: &str) -> Option<&CollectionSpec> {
        self.collections.get(path)
    }

    pub fn fields(&self) -> &BTreeMap<String, MergePolicy> {
        &self.fields
    }

    pub fn collections(&self) -> &BTreeMap<String, CollectionSpec> {
        &self.collections
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.collections.is_empty()
    }

    fn validate(&self, prefix: &str) -> ReconcileResult<()> {
        for (path, policy) in &self.fields {
            let label = join_path(prefix, path);
            validate_path(path, &label)?;
            if self.collections.contains_key(path) {
                return Err(ReconcileError::invalid_spec(
                    label,
                    "path declared as both a field and a collection",
                ));
            }
            if let MergePolicy::AppendDedupByKey(Some(key)) = policy {
                key.validate(&label)?;
            }
        }
        for (path, collection) in &self.collections {
            let label = join_path(prefix, path);
            validate_path(path, &label)?;
            collection.validate(&label)?;
        }
        Ok(())
    }
}

fn validate_path(path: &str, label: &str) -> ReconcileResult<()> {
    if path.trim().is_empty() || split_path(path).count() != path.split('.').count() {
        return Err(ReconcileError::invalid_spec(
            label,
            "path must be non-empty dotted segments",
        ));
    }
    Ok(())
}

impl CollectionSpec {
    pub fn keyed_by(key: KeySpec) -> Self {
        Self {
            key,
            sequential_id: None,
            references: Vec::new(),
            section: SectionSpec::default(),
        }
    }

    pub fn keyed_by_id() -> Self {
        Self::keyed_by(KeySpec::id())
    }

    /// New entities lacking `field` get their 1-based position as a string.
    pub fn sequential_id(mut self, field: impl Into<String>) -> Self {
        self.sequential_id = Some(field.into());
        self
    }

    pub fn reference(mut self, reference: EntityRef) -> Self {
        self.references.push(reference);
        self
    }

    pub fn field(mut self, path: impl Into<String>, policy: MergePolicy) -> Self {
        self.section.fields.insert(path.into(), policy);
        self
    }

    pub fn collection(mut self, path: impl Into<String>, spec: CollectionSpec) -> Self {
        self.section.collections.insert(path.into(), spec);
        self
    }

    pub fn key(&self) -> &KeySpec {
        &self.key
    }

    pub fn sequential_id_field(&self) -> Option<&str> {
        self.sequential_id.as_deref()
    }

    pub fn references(&self) -> &[EntityRef] {
        &self.references
    }

    pub fn section(&self) -> &SectionSpec {
        &self.section
    }

    fn validate(&self, label: &str) -> ReconcileResult<()> {
        self.key.validate(label)?;
        if let Some(field) = &self.sequential_id {
            validate_path(field, &join_path(label, field))?;
        }
        for reference in &self.references {
            let ref_label = join_path(label, &reference.field);
            validate_path(&reference.field, &ref_label)?;
            validate_path(&reference.target, &ref_label)?;
            validate_path(&reference.key, &ref_label)?;
        }
        self.section.validate(label)
    }
}

#[cfg(test)]
mod tests {
    use super::{CollectionSpec, EntityRef, MergeSpec};
    use crate::error::ReconcileError;
    use crate::identity::KeySpec;
    use crate::policy::MergePolicy;

    #[test]
    fn builder_nests_collections_and_fields() {
        let spec = MergeSpec::new().collection(
            "tender.lots",
            CollectionSpec::keyed_by_id()
                .field("techniques", MergePolicy::DeepMerge)
                .collection(
                    "awardCriteria.criteria",
                    CollectionSpec::keyed_by(KeySpec::single("type")),
                ),
        );
        spec.validate().expect("valid spec");

        let lots = spec.root().collection("tender.lots").expect("lots declared");
        assert_eq!(lots.key(), &KeySpec::id());
        assert_eq!(
            lots.section().policy("techniques"),
            Some(&MergePolicy::DeepMerge)
        );
        assert!(lots.section().collection("awardCriteria.criteria").is_some());
    }

    #[test]
    fn validate_rejects_field_and_collection_on_same_path() {
        let spec = MergeSpec::new()
            .field("awards", MergePolicy::Overwrite)
            .collection("awards", CollectionSpec::keyed_by_id());
        let err = spec.validate().expect_err("ambiguous path");
        assert!(matches!(err, ReconcileError::InvalidSpec { ref path, .. } if path == "awards"));
    }

    #[test]
    fn validate_rejects_empty_keys_and_paths() {
        let spec = MergeSpec::new().collection(
            "parties",
            CollectionSpec::keyed_by(KeySpec::composite(Vec::<String>::new())),
        );
        assert!(spec.validate().is_err());

        let spec = MergeSpec::new().field("tender..value", MergePolicy::Overwrite);
        assert!(spec.validate().is_err());

        let spec = MergeSpec::new().collection(
            "awards",
            CollectionSpec::keyed_by_id().reference(EntityRef::new("relatedLots", "")),
        );
        assert!(spec.validate().is_err());
    }
}
