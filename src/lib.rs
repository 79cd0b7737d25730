//! Reconciliation of eForms business-term fragments into OCDS release documents.
//!
//! Each business term maps one slice of a notice to a sparse JSON fragment.
//! [`engine::ReconciliationEngine`] folds those fragments into a single
//! [`release::ReleaseDocument`], matching entities by declared identity keys
//! and combining fields by per-path merge policies.
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod fragments;
pub mod identity;
pub mod policy;
pub mod prune;
pub mod release;
pub mod report;
pub mod spec;
pub mod terms;

pub use convert::{Conversion, Converter};
pub use engine::ReconciliationEngine;
pub use error::{ReconcileError, ReconcileResult};
pub use release::ReleaseDocument;
pub use spec::{CollectionSpec, EntityRef, MergeSpec};
pub use terms::{Extractor, TermRegistry};
