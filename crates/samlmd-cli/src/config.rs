//! CLI configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Output format.
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Default PEM private key for `sign`.
    pub signing_key: Option<PathBuf>,

    /// Default PEM certificate embedded by `sign`.
    pub signing_certificate: Option<PathBuf>,

    /// Default signature algorithm for `sign`.
    #[serde(default)]
    pub algorithm: SigningAlgorithm,

    /// PEM certificates trusted by `verify` when none are given.
    #[serde(default)]
    pub trusted_certificates: Vec<PathBuf>,
}

impl CliConfig {
    /// Loads configuration from file.
    pub fn load() -> crate::CliResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&content).map_err(|e| {
                crate::CliError::Config(format!("failed to parse config: {e}"))
            })?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Saves configuration to file.
    pub fn save(&self) -> crate::CliResult<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            crate::CliError::Config(format!("failed to serialize config: {e}"))
        })?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Gets the configuration file path.
    pub fn config_path() -> crate::CliResult<PathBuf> {
        let home = dirs_next::home_dir()
            .ok_or_else(|| crate::CliError::Config("could not determine home directory".to_string()))?;
        Ok(home.join(".samlmd").join("samlmd.toml"))
    }

    /// The key path from the command line, else the configured one.
    pub fn effective_key(&self, arg: Option<PathBuf>) -> Option<PathBuf> {
        arg.or_else(|| self.signing_key.clone())
    }

    /// The certificate path from the command line, else the configured one.
    pub fn effective_certificate(&self, arg: Option<PathBuf>) -> Option<PathBuf> {
        arg.or_else(|| self.signing_certificate.clone())
    }

    /// Trusted certificates from the command line, else the configured ones.
    pub fn effective_trust(&self, args: Vec<PathBuf>) -> Vec<PathBuf> {
        if args.is_empty() {
            self.trusted_certificates.clone()
        } else {
            args
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
    /// YAML format.
    Yaml,
    /// Quiet (minimal output).
    Quiet,
}

impl std::str::FromStr for OutputFormat {
    type Err = crate::CliError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            "quiet" => Ok(Self::Quiet),
            _ => Err(crate::CliError::InvalidArgument(format!(
                "Unknown output format: {value}. Supported: table, json, yaml, quiet"
            ))),
        }
    }
}

/// Signature algorithms offered for signing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SigningAlgorithm {
    /// RSA with SHA-256.
    #[default]
    RsaSha256,
    /// RSA with SHA-384.
    RsaSha384,
    /// RSA with SHA-512.
    RsaSha512,
    /// ECDSA with SHA-256.
    EcdsaSha256,
    /// ECDSA with SHA-384.
    EcdsaSha384,
    /// ECDSA with SHA-512.
    EcdsaSha512,
}

impl SigningAlgorithm {
    /// The XML-DSig algorithm.
    #[must_use]
    pub const fn to_model(self) -> samlmd::SignatureAlgorithm {
        match self {
            Self::RsaSha256 => samlmd::SignatureAlgorithm::RsaSha256,
            Self::RsaSha384 => samlmd::SignatureAlgorithm::RsaSha384,
            Self::RsaSha512 => samlmd::SignatureAlgorithm::RsaSha512,
            Self::EcdsaSha256 => samlmd::SignatureAlgorithm::EcdsaSha256,
            Self::EcdsaSha384 => samlmd::SignatureAlgorithm::EcdsaSha384,
            Self::EcdsaSha512 => samlmd::SignatureAlgorithm::EcdsaSha512,
        }
    }
}

impl std::str::FromStr for SigningAlgorithm {
    type Err = crate::CliError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        <Self as clap::ValueEnum>::from_str(value, true).map_err(|_| {
            crate::CliError::InvalidArgument(format!(
                "Unknown algorithm: {value}. Supported: rsa-sha256, rsa-sha384, rsa-sha512, \
                 ecdsa-sha256, ecdsa-sha384, ecdsa-sha512"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let config: CliConfig = toml::from_str(
            r#"
            output_format = "json"
            algorithm = "ecdsa-sha384"
            trusted_certificates = ["/etc/saml/idp.pem"]
            "#,
        )
        .unwrap();
        assert_eq!(config.output_format, OutputFormat::Json);
        assert_eq!(config.algorithm, SigningAlgorithm::EcdsaSha384);
        assert!(config.signing_key.is_none());
        assert_eq!(config.effective_trust(Vec::new()).len(), 1);
    }

    #[test]
    fn arguments_override_config() {
        let config = CliConfig {
            signing_key: Some(PathBuf::from("config.pem")),
            ..CliConfig::default()
        };
        assert_eq!(
            config.effective_key(Some(PathBuf::from("arg.pem"))),
            Some(PathBuf::from("arg.pem"))
        );
        assert_eq!(config.effective_key(None), Some(PathBuf::from("config.pem")));
    }

    #[test]
    fn algorithm_names() {
        assert_eq!("RSA-SHA512".parse::<SigningAlgorithm>().unwrap(), SigningAlgorithm::RsaSha512);
        assert!("rsa-sha1".parse::<SigningAlgorithm>().is_err());
        assert_eq!(
            SigningAlgorithm::EcdsaSha256.to_model(),
            samlmd::SignatureAlgorithm::EcdsaSha256
        );
    }
}
