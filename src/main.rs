use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Packbench workspace shell
#[derive(Parser)]
#[command(name = "packbench-core", version, about)]
struct Args {
    /// Data directory (defaults to ~/.packbench)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Install service origin, e.g. https://bench.example
    #[arg(long)]
    origin: Option<String>,

    /// Keep all state in memory; nothing is written to disk
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    packbench_core::util::init_logging();

    let args = Args::parse();

    info!("Starting Packbench shell");

    packbench_core::shell::run(args.data_dir, args.origin, args.ephemeral).await
}
