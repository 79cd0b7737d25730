//! Error types for fragment reconciliation.
//!
//! Entity-level variants are recovered by the engine and turned into
//! [`crate::report::Warning`] records; spec-level variants are returned when a
//! registry or config is built so broken merge specs never reach a notice.
use thiserror::Error;

/// Result type for reconciliation operations
pub type ReconcileResult<T> = std::result::Result<T, ReconcileError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// A fragment entity lacks a component of its identity key
    #[error("entity at {path} has no usable identity key (missing {missing})")]
    MissingIdentityKey { path: String, missing: String },

    /// A declarative spec names a policy or rule the engine does not know
    #[error("unknown merge policy {name:?} at {path}")]
    UnknownMergePolicy { path: String, name: String },

    /// An extractor returned an error instead of a fragment
    #[error("extractor for {term} failed: {message}")]
    ExtractorFailure { term: String, message: String },

    /// Same primary key component as an existing entity, different remainder
    #[error("entity at {path} shares {primary} with an existing entity but differs in {differing}")]
    ConflictingCompositeKey {
        path: String,
        primary: String,
        differing: String,
    },

    /// Structurally invalid merge spec or registry
    #[error("invalid merge spec at {path}: {message}")]
    InvalidSpec { path: String, message: String },
}

impl ReconcileError {
    pub fn invalid_spec(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Spec-level errors abort startup; everything else is recovered per entity or term.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnknownMergePolicy { .. } | Self::InvalidSpec { .. }
        )
    }
}
