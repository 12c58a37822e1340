//! CLI entry point for spatial niche discovery

use clap::Parser;
use stniche::io::cli::{Cli, DiscoveryRunner};

fn main() -> stniche::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    let mut runner = DiscoveryRunner::new(cli);
    runner.process().map(|_| ())
}
