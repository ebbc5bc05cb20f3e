//! # samlmd
//!
//! Command-line tools for SAML 2.0 metadata and assertions.

#![forbid(unsafe_code)]
#![deny(warnings)]

use clap::Parser;
use samlmd_cli::{
    cli::{Cli, Command},
    commands::{run_config, run_inspect, run_roundtrip, run_sign, run_verify},
    config::CliConfig,
    output::error,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match CliConfig::load() {
        Ok(c) => c,
        Err(e) => {
            error(&format!("Failed to load configuration: {}", e));
            std::process::exit(1);
        }
    };
    let format = cli.output.unwrap_or(config.output_format);

    let result = match cli.command {
        Command::Inspect(args) => run_inspect(args, format),
        Command::Roundtrip(args) => run_roundtrip(args, format),
        Command::Sign(args) => run_sign(args, &config, format),
        Command::Verify(args) => run_verify(args, &config, format),
        Command::Config(cmd) => run_config(cmd, &mut config),
    };

    if let Err(e) = result {
        error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}
