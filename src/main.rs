//! Main entry point for the jl (Jump List) CLI application.

use anyhow::Context;
use clap::Parser;
use jl::{app::App, cli::Args, cli::Config};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::from_args(args).context("invalid arguments")?;
    App::new(config).run().context("jump list decoding failed")
}

/// `RUST_LOG` wins over `-v`
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
