//! Machine-readable accounting of what a merge or conversion did.
use crate::error::ReconcileError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    MissingIdentityKey,
    ConflictingCompositeKey,
    ExtractorFailure,
    UnregisteredTerm,
    MalformedFragment,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::MissingIdentityKey => "missing_identity_key",
            WarningKind::ConflictingCompositeKey => "conflicting_composite_key",
            WarningKind::ExtractorFailure => "extractor_failure",
            WarningKind::UnregisteredTerm => "unregistered_term",
            WarningKind::MalformedFragment => "malformed_fragment",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recovered problem: the offending entity or term was skipped, the rest merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    pub path: String,
    pub message: String,
}

impl Warning {
    pub fn new(
        kind: WarningKind,
        term: Option<&str>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            term: term.map(str::to_string),
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn from_error(term: Option<&str>, err: &ReconcileError) -> Self {
        let (kind, path) = match err {
            ReconcileError::MissingIdentityKey { path, .. } => {
                (WarningKind::MissingIdentityKey, path.clone())
            }
            ReconcileError::ConflictingCompositeKey { path, .. } => {
                (WarningKind::ConflictingCompositeKey, path.clone())
            }
            ReconcileError::ExtractorFailure { .. } => (WarningKind::ExtractorFailure, String::new()),
            ReconcileError::UnknownMergePolicy { path, .. }
            | ReconcileError::InvalidSpec { path, .. } => {
                (WarningKind::MalformedFragment, path.clone())
            }
        };
        Self::new(kind, term, path, err.to_string())
    }
}

/// Outcome of applying one fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub entities_created: usize,
    pub entities_merged: usize,
    pub warnings: Vec<Warning>,
}

/// Outcome of converting one notice, written next to the release by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice_id: Option<String>,
    pub terms_applied: Vec<String>,
    pub terms_empty: Vec<String>,
    pub terms_failed: Vec<String>,
    pub entities_created: usize,
    pub entities_merged: usize,
    pub pruned: bool,
    pub warnings: Vec<Warning>,
}

impl Default for ConversionReport {
    fn default() -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            notice_id: None,
            terms_applied: Vec::new(),
            terms_empty: Vec::new(),
            terms_failed: Vec::new(),
            entities_created: 0,
            entities_merged: 0,
            pruned: false,
            warnings: Vec::new(),
        }
    }
}

impl ConversionReport {
    pub fn record_merge(&mut self, term: &str, merge: MergeReport) {
        self.terms_applied.push(term.to_string());
        self.entities_created += merge.entities_created;
        self.entities_merged += merge.entities_merged;
        self.warnings.extend(merge.warnings);
    }

    pub fn warning_count(&self, kind: WarningKind) -> usize {
        self.warnings
            .iter()
            .filter(|warning| warning.kind == kind)
            .count()
    }
}
