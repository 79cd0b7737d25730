//! Converter configuration: which terms are registered, in what order, with which specs.
//!
//! The config is a plain JSON file so the term catalog can be reviewed and
//! edited without recompiling. Without one, the built-in catalog applies.
use crate::terms::{TermDecl, TermRegistry};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
const CONFIG_DIR_NAME: &str = "ocdsmerge";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvertConfig {
    pub schema_version: u32,
    #[serde(default = "default_prune")]
    pub prune: bool,
    /// Registration order is merge order.
    #[serde(default)]
    pub terms: Vec<TermDecl>,
}

fn default_prune() -> bool {
    true
}

/// Config equivalent to running without one: the built-in catalog, pruning on.
pub fn default_config() -> Result<ConvertConfig> {
    let registry = TermRegistry::builtin().context("build built-in term catalog")?;
    Ok(ConvertConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        prune: true,
        terms: registry.to_decls(),
    })
}

/// Render the default config as pretty JSON for `init`.
pub fn config_stub() -> Result<String> {
    let config = default_config()?;
    serde_json::to_string_pretty(&config).context("serialize config stub")
}

pub fn load_config(path: &Path) -> Result<ConvertConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: ConvertConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

/// Persist a config to disk in a stable JSON format.
pub fn write_config(path: &Path, config: &ConvertConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create config dir {}", parent.display()))?;
    }
    let mut text = serde_json::to_string_pretty(config).context("serialize config")?;
    text.push('\n');
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Check the schema version and compile every term spec.
///
/// Unknown policies and invalid specs fail here, before any notice is touched.
pub fn validate_config(config: &ConvertConfig) -> Result<TermRegistry> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {} (expected {CONFIG_SCHEMA_VERSION})",
            config.schema_version
        ));
    }
    if config.terms.is_empty() {
        return Err(anyhow!("config registers no terms"));
    }
    let registry = TermRegistry::from_decls(&config.terms).context("compile term specs")?;
    Ok(registry)
}

/// `$XDG_CONFIG_HOME/ocdsmerge/config.json` or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Pick the config for a run: an explicit path, else the user config file if
/// present, else the built-in defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ConvertConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match default_config_path().filter(|path| path.is_file()) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using user config");
            load_config(&path)
        }
        None => default_config(),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
