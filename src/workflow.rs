use crate::cli::{InitArgs, MergeArgs, PruneArgs, ValidateArgs};
use anyhow::{anyhow, Context, Result};
use ocds_merge::config;
use ocds_merge::convert::Converter;
use ocds_merge::fragments::FragmentLog;
use ocds_merge::prune::prune;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;

pub fn run_merge(args: MergeArgs) -> Result<()> {
    let config = config::resolve_config(args.config.as_deref())?;
    let registry = config::validate_config(&config)?;
    let log = FragmentLog::load(&args.fragments)?;

    let conversion = Converter::new(&registry)
        .prune(config.prune && !args.no_prune)
        .notice_id(log.notice_id.clone())
        .convert(&(), &log.extractors::<()>());

    write_json(args.out.as_deref(), &conversion.release)?;
    if let Some(path) = args.report.as_deref() {
        write_json(Some(path), &conversion.report)?;
    }
    Ok(())
}

pub fn run_validate(args: ValidateArgs) -> Result<()> {
    let config = config::load_config(&args.config)?;
    let registry = config::validate_config(&config)
        .with_context(|| format!("validate {}", args.config.display()))?;
    println!(
        "{}: {} terms registered (prune: {})",
        args.config.display(),
        registry.len(),
        config.prune
    );
    Ok(())
}

pub fn run_init(args: InitArgs) -> Result<()> {
    if args.out.exists() && !args.force {
        return Err(anyhow!(
            "{} already exists (use --force to overwrite)",
            args.out.display()
        ));
    }
    let stub = config::config_stub()?;
    fs::write(&args.out, format!("{stub}\n"))
        .with_context(|| format!("write {}", args.out.display()))?;
    println!("wrote {}", args.out.display());
    Ok(())
}

pub fn run_prune(args: PruneArgs) -> Result<()> {
    let bytes =
        fs::read(&args.input).with_context(|| format!("read {}", args.input.display()))?;
    let value: Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse JSON {}", args.input.display()))?;
    let pruned = prune(value).unwrap_or_else(|| Value::Object(Default::default()));
    write_json(args.out.as_deref(), &pruned)
}

/// Pretty JSON to `path`, or stdout when no path is given.
fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value).context("serialize JSON output")?;
    text.push('\n');
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))
        }
        None => std::io::stdout()
            .lock()
            .write_all(text.as_bytes())
            .context("write stdout"),
    }
}
