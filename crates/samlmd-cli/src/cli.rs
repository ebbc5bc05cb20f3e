//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{OutputFormat, SigningAlgorithm};

/// samlmd - inspect, sign and verify SAML 2.0 metadata and assertions.
#[derive(Debug, Parser)]
#[command(name = "samlmd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (overrides config).
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Summarize a metadata document or assertion.
    Inspect(FileArgs),

    /// Parse and re-serialize a document, checking nothing is lost.
    Roundtrip(RoundtripArgs),

    /// Sign the root element of a document.
    Sign(SignArgs),

    /// Verify every signature in a document.
    Verify(VerifyArgs),

    /// Configuration management.
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// A document to read.
#[derive(Debug, Args)]
pub struct FileArgs {
    /// Path to the XML document.
    pub file: PathBuf,
}

/// Round trip arguments.
#[derive(Debug, Args)]
pub struct RoundtripArgs {
    /// Path to the XML document.
    pub file: PathBuf,

    /// Print the re-serialized document.
    #[arg(long)]
    pub print: bool,
}

/// Signing arguments.
#[derive(Debug, Args)]
pub struct SignArgs {
    /// Path to the XML document.
    pub file: PathBuf,

    /// PEM private key (PKCS#8, or PKCS#1 for RSA).
    #[arg(short, long)]
    pub key: Option<PathBuf>,

    /// PEM certificate to embed in `KeyInfo`.
    #[arg(short, long)]
    pub cert: Option<PathBuf>,

    /// Signature algorithm (overrides config).
    #[arg(short, long, value_enum)]
    pub algorithm: Option<SigningAlgorithm>,

    /// Where to write the signed document; stdout when omitted.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Indent the written document.
    #[arg(long)]
    pub pretty: bool,
}

/// Verification arguments.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Path to the XML document.
    pub file: PathBuf,

    /// Trusted PEM certificates (repeatable).
    #[arg(short, long = "cert")]
    pub certs: Vec<PathBuf>,

    /// Accept legacy SHA-1 signatures.
    #[arg(long)]
    pub allow_sha1: bool,
}

/// Config commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,

    /// Set a configuration value.
    Set {
        /// Configuration key.
        key: String,

        /// Configuration value.
        value: String,
    },

    /// Print the configuration file path.
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sign() {
        let cli = Cli::try_parse_from([
            "samlmd", "sign", "md.xml", "--key", "k.pem", "--cert", "c.pem", "-a", "ecdsa-sha256", "--out",
            "signed.xml",
        ])
        .unwrap();
        match cli.command {
            Command::Sign(args) => {
                assert_eq!(args.algorithm, Some(SigningAlgorithm::EcdsaSha256));
                assert_eq!(args.out, Some(PathBuf::from("signed.xml")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn verify_takes_several_certificates() {
        let cli = Cli::try_parse_from(["samlmd", "verify", "md.xml", "-c", "a.pem", "-c", "b.pem", "-o", "json"])
            .unwrap();
        assert_eq!(cli.output, Some(OutputFormat::Json));
        match cli.command {
            Command::Verify(args) => assert_eq!(args.certs.len(), 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
