// CLI binary entry point for oggscope
//
// This is the main entry point for the oggscope command-line tool.

mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Config;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_logging(config.verbose);

    cli::run(&config)?;
    Ok(())
}
