//! JSON form of merge specs, as written in config files.
//!
//! Policies are plain names (`"union_set"`) or objects carrying parameters
//! (`{"policy": "append_dedup_by_key", "key": ["scheme", "id"]}`). Compiling a
//! declaration is where unknown policy names are caught.
use super::{CollectionSpec, EntityRef, MergeSpec, SectionSpec};
use crate::error::{ReconcileError, ReconcileResult};
use crate::identity::KeySpec;
use crate::policy::{MergePolicy, RicherRule};
use crate::release::join_path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecDecl {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, PolicyDecl>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub collections: BTreeMap<String, CollectionDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionDecl {
    #[serde(default = "default_key")]
    pub key: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequential_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<EntityRef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, PolicyDecl>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub collections: BTreeMap<String, CollectionDecl>,
}

fn default_key() -> Vec<String> {
    vec!["id".to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolicyDecl {
    Name(String),
    Detailed {
        policy: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rule: Option<String>,
    },
}

impl PolicyDecl {
    pub fn compile(&self, path: &str) -> ReconcileResult<MergePolicy> {
        match self {
            PolicyDecl::Name(name) => match name.split_once(':') {
                Some(("preserve_if_richer", rule)) => Ok(MergePolicy::PreserveIfRicher(
                    RicherRule::from_name(rule, path)?,
                )),
                _ => compile_named(name, None, None, path),
            },
            PolicyDecl::Detailed { policy, key, rule } => {
                compile_named(policy, key.as_deref(), rule.as_deref(), path)
            }
        }
    }
}

fn compile_named(
    name: &str,
    key: Option<&[String]>,
    rule: Option<&str>,
    path: &str,
) -> ReconcileResult<MergePolicy> {
    let policy = match name {
        "overwrite" => MergePolicy::Overwrite,
        "union_set" => MergePolicy::UnionSet,
        "deep_merge" => MergePolicy::DeepMerge,
        "append_dedup_by_key" => {
            MergePolicy::AppendDedupByKey(key.map(|fields| KeySpec::composite(fields.to_vec())))
        }
        "preserve_if_richer" => {
            let rule = rule.ok_or_else(|| {
                ReconcileError::invalid_spec(path, "preserve_if_richer requires a rule")
            })?;
            MergePolicy::PreserveIfRicher(RicherRule::from_name(rule, path)?)
        }
        other => {
            return Err(ReconcileError::UnknownMergePolicy {
                path: path.to_string(),
                name: other.to_string(),
            })
        }
    };
    if key.is_some() && !matches!(policy, MergePolicy::AppendDedupByKey(_)) {
        return Err(ReconcileError::invalid_spec(
            path,
            format!("{name} does not take a key"),
        ));
    }
    if rule.is_some() && !matches!(policy, MergePolicy::PreserveIfRicher(_)) {
        return Err(ReconcileError::invalid_spec(
            path,
            format!("{name} does not take a rule"),
        ));
    }
    Ok(policy)
}

impl From<&MergePolicy> for PolicyDecl {
    fn from(policy: &MergePolicy) -> Self {
        match policy {
            MergePolicy::AppendDedupByKey(Some(key)) => PolicyDecl::Detailed {
                policy: policy.name().to_string(),
                key: Some(key.fields().to_vec()),
                rule: None,
            },
            MergePolicy::PreserveIfRicher(rule) => PolicyDecl::Detailed {
                policy: policy.name().to_string(),
                key: None,
                rule: Some(rule.as_str().to_string()),
            },
            other => PolicyDecl::Name(other.name().to_string()),
        }
    }
}

impl SpecDecl {
    /// Compile into a validated [`MergeSpec`].
    pub fn compile(&self) -> ReconcileResult<MergeSpec> {
        let spec = MergeSpec {
            root: compile_section(&self.fields, &self.collections, "")?,
        };
        spec.validate()?;
        Ok(spec)
    }
}

fn compile_section(
    fields: &BTreeMap<String, PolicyDecl>,
    collections: &BTreeMap<String, CollectionDecl>,
    prefix: &str,
) -> ReconcileResult<SectionSpec> {
    let mut section = SectionSpec::default();
    for (path, decl) in fields {
        let policy = decl.compile(&join_path(prefix, path))?;
        section.fields.insert(path.clone(), policy);
    }
    for (path, decl) in collections {
        let label = join_path(prefix, path);
        let collection = CollectionSpec {
            key: KeySpec::composite(decl.key.clone()),
            sequential_id: decl.sequential_id.clone(),
            references: decl.references.clone(),
            section: compile_section(&decl.fields, &decl.collections, &label)?,
        };
        section.collections.insert(path.clone(), collection);
    }
    Ok(section)
}

impl From<&MergeSpec> for SpecDecl {
    fn from(spec: &MergeSpec) -> Self {
        let (fields, collections) = declare_section(&spec.root);
        SpecDecl {
            fields,
            collections,
        }
    }
}

fn declare_section(
    section: &SectionSpec,
) -> (BTreeMap<String, PolicyDecl>, BTreeMap<String, CollectionDecl>) {
    let fields = section
        .fields
        .iter()
        .map(|(path, policy)| (path.clone(), PolicyDecl::from(policy)))
        .collect();
    let collections = section
        .collections
        .iter()
        .map(|(path, collection)| {
            let (fields, collections) = declare_section(&collection.section);
            let decl = CollectionDecl {
                key: collection.key.fields().to_vec(),
                sequential_id: collection.sequential_id.clone(),
                references: collection.references.clone(),
                fields,
                collections,
            };
            (path.clone(), decl)
        })
        .collect();
    (fields, collections)
}
