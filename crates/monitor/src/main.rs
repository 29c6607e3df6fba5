//! Drowsiness Monitor - Main Entry Point

use clap::Parser;
use monitor::args::Args;
use monitor::{init_logging, run};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    run(args)
}
