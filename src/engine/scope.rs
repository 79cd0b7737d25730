//! Layered lookup of a term's spec over the release-wide base spec.
use crate::identity::KeySpec;
use crate::policy::MergePolicy;
use crate::spec::{CollectionSpec, EntityRef, SectionSpec};

/// What a path resolves to in the first layer that declares it.
pub(super) enum Declared<'s> {
    Policy(&'s MergePolicy),
    Collection(CollectionScope<'s>),
}

#[derive(Clone, Copy)]
pub(super) struct Scope<'s> {
    term: Option<&'s SectionSpec>,
    base: Option<&'s SectionSpec>,
}

impl<'s> Scope<'s> {
    pub(super) fn new(term: Option<&'s SectionSpec>, base: Option<&'s SectionSpec>) -> Self {
        Self { term, base }
    }

    pub(super) fn lookup(&self, path: &str) -> Option<Declared<'s>> {
        let base_collection = self.base.and_then(|section| section.collection(path));
        if let Some(term) = self.term {
            if let Some(policy) = term.policy(path) {
                return Some(Declared::Policy(policy));
            }
            if let Some(collection) = term.collection(path) {
                return Some(Declared::Collection(CollectionScope {
                    primary: collection,
                    fallback: base_collection,
                }));
            }
        }
        let base = self.base?;
        if let Some(policy) = base.policy(path) {
            return Some(Declared::Policy(policy));
        }
        base_collection.map(|collection| {
            Declared::Collection(CollectionScope {
                primary: collection,
                fallback: None,
            })
        })
    }
}

#[derive(Clone, Copy)]
pub(super) struct CollectionScope<'s> {
    primary: &'s CollectionSpec,
    fallback: Option<&'s CollectionSpec>,
}

impl<'s> CollectionScope<'s> {
    pub(super) fn key(&self) -> &'s KeySpec {
        self.primary.key()
    }

    pub(super) fn sequential_id_field(&self) -> Option<&'s str> {
        self.primary
            .sequential_id_field()
            .or_else(|| self.fallback.and_then(CollectionSpec::sequential_id_field))
    }

    pub(super) fn references(&self) -> impl Iterator<Item = &'s EntityRef> {
        self.primary
            .references()
            .iter()
            .chain(self.fallback.map(CollectionSpec::references).unwrap_or_default())
    }

    pub(super) fn section(&self) -> Scope<'s> {
        Scope::new(
            Some(self.primary.section()),
            self.fallback.map(CollectionSpec::section),
        )
    }
}
