use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod workflow;

use cli::{Command, RootArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Merge(args) => workflow::run_merge(args),
        Command::Validate(args) => workflow::run_validate(args),
        Command::Init(args) => workflow::run_init(args),
        Command::Prune(args) => workflow::run_prune(args),
    }
}

/// Logs go to stderr; stdout carries JSON output.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "ocds_merge=debug"
    } else {
        "ocds_merge=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
