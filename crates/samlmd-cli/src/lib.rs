//! # samlmd-cli
//!
//! CLI tools for SAML 2.0 metadata and assertions.
//!
//! This crate provides command-line utilities for:
//! - Inspecting entities, roles and endpoints of a metadata document
//! - Checking that a document survives a parse and re-serialization
//! - Signing a document's root element
//! - Verifying every signature in a document against trusted certificates

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod document;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use config::CliConfig;
pub use error::{CliError, CliResult};
