//! Configuration management commands.

use std::path::PathBuf;

use crate::cli::ConfigCommand;
use crate::output::{info, success};
use crate::CliConfig;

/// Runs a config command.
pub fn run_config(cmd: ConfigCommand, config: &mut CliConfig) -> crate::CliResult<()> {
    match cmd {
        ConfigCommand::Show => show_config(config),
        ConfigCommand::Set { key, value } => {
            set_value(config, &key, &value)?;
            config.save()?;
            success(&format!("Set {key} = {value}"));
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", CliConfig::config_path()?.display());
            Ok(())
        }
    }
}

/// Shows the current configuration.
fn show_config(config: &CliConfig) -> crate::CliResult<()> {
    let config_path = CliConfig::config_path()?;

    info(&format!("Configuration file: {}", config_path.display()));
    println!();
    println!("output_format: {:?}", config.output_format);
    println!("algorithm: {:?}", config.algorithm);
    if let Some(key) = &config.signing_key {
        println!("signing_key: {}", key.display());
    }
    if let Some(cert) = &config.signing_certificate {
        println!("signing_certificate: {}", cert.display());
    }
    for cert in &config.trusted_certificates {
        println!("trusted_certificate: {}", cert.display());
    }
    Ok(())
}

fn optional_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

/// Applies `key = value` to `config`.
pub fn set_value(config: &mut CliConfig, key: &str, value: &str) -> crate::CliResult<()> {
    match key {
        "output_format" | "output" => config.output_format = value.parse()?,
        "algorithm" => config.algorithm = value.parse()?,
        "signing_key" | "key" => config.signing_key = optional_path(value),
        "signing_certificate" | "cert" => config.signing_certificate = optional_path(value),
        "trusted_certificates" | "trust" => {
            config.trusted_certificates = value
                .split(',')
                .map(str::trim)
                .filter(|path| !path.is_empty())
                .map(PathBuf::from)
                .collect();
        }
        _ => {
            return Err(crate::CliError::InvalidArgument(format!(
                "Unknown configuration key: {key}. Known keys: output_format, algorithm, \
                 signing_key, signing_certificate, trusted_certificates"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputFormat, SigningAlgorithm};

    #[test]
    fn sets_known_keys() {
        let mut config = CliConfig::default();
        set_value(&mut config, "output", "json").unwrap();
        set_value(&mut config, "algorithm", "ecdsa-sha512").unwrap();
        set_value(&mut config, "key", "/keys/sign.pem").unwrap();
        set_value(&mut config, "trust", "a.pem, b.pem").unwrap();
        assert_eq!(config.output_format, OutputFormat::Json);
        assert_eq!(config.algorithm, SigningAlgorithm::EcdsaSha512);
        assert_eq!(config.signing_key, Some(PathBuf::from("/keys/sign.pem")));
        assert_eq!(config.trusted_certificates.len(), 2);

        set_value(&mut config, "key", "none").unwrap();
        assert!(config.signing_key.is_none());
    }

    #[test]
    fn rejects_unknown_keys_and_values() {
        let mut config = CliConfig::default();
        assert!(set_value(&mut config, "server_url", "x").is_err());
        assert!(set_value(&mut config, "output", "xml").is_err());
    }
}
