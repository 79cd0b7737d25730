//! Business terms: extractor interface and the ordered registry of merge specs.
//!
//! Registration order is the merge order. It is fixed when the registry is
//! built so the same notice always yields the same release.
use crate::error::{ReconcileError, ReconcileResult};
use crate::spec::{MergeSpec, SpecDecl};
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod catalog;

/// One business term's extraction step. XML handling lives behind `S`.
///
/// Returning `Ok(None)` means the notice carries nothing for this term; an
/// `Err` is isolated to the term by the converter.
pub trait Extractor<S: ?Sized> {
    fn term_id(&self) -> &str;
    fn extract(&self, source: &S) -> anyhow::Result<Option<Value>>;
}

/// Extractor backed by a closure.
pub struct FnExtractor<F> {
    term: String,
    extract: F,
}

pub fn extractor_fn<S, F>(term: impl Into<String>, extract: F) -> FnExtractor<F>
where
    S: ?Sized,
    F: Fn(&S) -> anyhow::Result<Option<Value>>,
{
    FnExtractor {
        term: term.into(),
        extract,
    }
}

impl<S, F> Extractor<S> for FnExtractor<F>
where
    S: ?Sized,
    F: Fn(&S) -> anyhow::Result<Option<Value>>,
{
    fn term_id(&self) -> &str {
        &self.term
    }

    fn extract(&self, source: &S) -> anyhow::Result<Option<Value>> {
        (self.extract)(source)
    }
}

/// Config-file form of a registered term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TermDecl {
    pub id: String,
    #[serde(default)]
    pub spec: SpecDecl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredTerm {
    id: String,
    spec: MergeSpec,
}

impl RegisteredTerm {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn spec(&self) -> &MergeSpec {
        &self.spec
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermRegistry {
    terms: Vec<RegisteredTerm>,
}

impl TermRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in eForms term catalog.
    pub fn builtin() -> ReconcileResult<Self> {
        let mut registry = Self::new();
        for (id, spec) in catalog::builtin_terms() {
            registry.register(id, spec)?;
        }
        Ok(registry)
    }

    pub fn from_decls(decls: &[TermDecl]) -> ReconcileResult<Self> {
        let mut registry = Self::new();
        for decl in decls {
            let spec = decl
                .spec
                .compile()
                .map_err(|err| within_term(&decl.id, err))?;
            registry.register(decl.id.clone(), spec)?;
        }
        Ok(registry)
    }

    pub fn to_decls(&self) -> Vec<TermDecl> {
        self.terms
            .iter()
            .map(|term| TermDecl {
                id: term.id.clone(),
                spec: SpecDecl::from(&term.spec),
            })
            .collect()
    }

    /// Append a term. Duplicate ids and invalid specs are rejected.
    pub fn register(&mut self, id: impl Into<String>, spec: MergeSpec) -> ReconcileResult<()> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ReconcileError::invalid_spec("<terms>", "term id must not be empty"));
        }
        if self.get(trimmed).is_some() {
            return Err(ReconcileError::invalid_spec(
                trimmed,
                "term registered more than once",
            ));
        }
        spec.validate().map_err(|err| within_term(trimmed, err))?;
        self.terms.push(RegisteredTerm {
            id: trimmed.to_string(),
            spec,
        });
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&MergeSpec> {
        self.terms
            .iter()
            .find(|term| term.id == id)
            .map(|term| &term.spec)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTerm> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

fn within_term(term: &str, err: ReconcileError) -> ReconcileError {
    match err {
        ReconcileError::UnknownMergePolicy { path, name } => ReconcileError::UnknownMergePolicy {
            path: format!("{term}:{path}"),
            name,
        },
        ReconcileError::InvalidSpec { path, message } => ReconcileError::InvalidSpec {
            path: format!("{term}:{path}"),
            message,
        },
        other => other,
    }
}
