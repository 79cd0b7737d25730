//! Fragment logs: pre-extracted business-term output for one notice.
//!
//! A log lets the merge be replayed and audited without the XML extractors.
//! Each entry carries either the fragment a term produced or the error it hit.
use crate::terms::Extractor;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

pub const FRAGMENT_LOG_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FragmentLog {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice_id: Option<String>,
    #[serde(default)]
    pub entries: Vec<RecordedFragment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordedFragment {
    pub term: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FragmentLog {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("read fragment log {}", path.display()))?;
        let log: FragmentLog = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse fragment log {}", path.display()))?;
        log.validate()
            .with_context(|| format!("validate fragment log {}", path.display()))?;
        Ok(log)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != FRAGMENT_LOG_SCHEMA_VERSION {
            return Err(anyhow!(
                "unsupported fragment log schema_version {}",
                self.schema_version
            ));
        }
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.term.trim().is_empty() {
                return Err(anyhow!("entry {index} has an empty term"));
            }
            if entry.fragment.is_some() && entry.error.is_some() {
                return Err(anyhow!(
                    "entry {index} ({}) has both a fragment and an error",
                    entry.term
                ));
            }
        }
        Ok(())
    }

    /// Entries as extractors, in log order.
    pub fn extractors<S: ?Sized>(&self) -> Vec<&dyn Extractor<S>> {
        self.entries
            .iter()
            .map(|entry| entry as &dyn Extractor<S>)
            .collect()
    }
}

/// Replays the recorded outcome whatever the source document is.
impl<S: ?Sized> Extractor<S> for RecordedFragment {
    fn term_id(&self) -> &str {
        &self.term
    }

    fn extract(&self, _source: &S) -> Result<Option<Value>> {
        match &self.error {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(self.fragment.clone()),
        }
    }
}
