//! CLI argument parsing for the fragment merge workflow.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "ocdsmerge",
    version,
    about = "Merge eForms business-term fragments into OCDS releases",
    after_help = "Commands:\n  merge --fragments <file>   Replay a fragment log into one release\n  validate --config <file>   Compile a term config without merging\n  init --out <file>          Write the built-in term catalog as a config\n  prune --input <file>       Drop empty values from a JSON document\n\nExamples:\n  ocdsmerge init --out terms.json\n  ocdsmerge merge --fragments notice.fragments.json --config terms.json --out release.json\n  ocdsmerge prune --input release.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Log each applied term and implicit entity (RUST_LOG overrides)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Merge(MergeArgs),
    Validate(ValidateArgs),
    Init(InitArgs),
    Prune(PruneArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Replay a fragment log into an OCDS release")]
pub struct MergeArgs {
    /// Fragment log JSON ({schema_version, notice_id, entries})
    #[arg(long, value_name = "FILE")]
    pub fragments: PathBuf,

    /// Term config; defaults to the user config file, then the built-in catalog
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output path for the release (stdout when omitted)
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Output path for the conversion report JSON
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Keep empty values in the release
    #[arg(long)]
    pub no_prune: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Load and compile a term config")]
pub struct ValidateArgs {
    #[arg(long, value_name = "FILE")]
    pub config: PathBuf,
}

#[derive(Parser, Debug)]
#[command(about = "Write the built-in term catalog as an editable config")]
pub struct InitArgs {
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Remove null, empty strings and empty containers from a JSON document")]
pub struct PruneArgs {
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output path (stdout when omitted)
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}
