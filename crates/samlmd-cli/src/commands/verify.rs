//! `verify`: check every signature in a document.

use samlmd::metadata::MetadataDocument;
use samlmd::{Signable, XmlSignatureValidator};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::VerifyArgs;
use crate::config::OutputFormat;
use crate::document::Document;
use crate::output::{output, success};
use crate::CliConfig;

/// Outcome for one signed element.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct VerifyRow {
    /// Path of the element from the root.
    #[tabled(rename = "Element")]
    pub element: String,
    /// `ID` of the element.
    #[tabled(rename = "ID")]
    pub id: String,
    /// `valid`, or the reason it failed.
    #[tabled(rename = "Result")]
    pub result: String,
}

/// Runs `verify`.
pub fn run_verify(args: VerifyArgs, config: &CliConfig, format: OutputFormat) -> crate::CliResult<()> {
    let trusted = config.effective_trust(args.certs);
    if trusted.is_empty() {
        return Err(crate::CliError::InvalidArgument(
            "no trusted certificates: pass --cert or set trusted_certificates in the configuration"
                .to_string(),
        ));
    }
    let pems = trusted
        .iter()
        .map(std::fs::read_to_string)
        .collect::<Result<Vec<_>, _>>()?;
    let pem_refs: Vec<&str> = pems.iter().map(String::as_str).collect();
    let validator = XmlSignatureValidator::from_pem(&pem_refs)?.allow_sha1(args.allow_sha1);

    let document = Document::load(&args.file)?;
    let rows = verify_document(&document, &validator);
    output(&rows, &rows, format, "No signatures found.")?;

    if rows.is_empty() {
        return Err(crate::CliError::Verification("document carries no signature".to_string()));
    }
    let failed = rows.iter().filter(|row| row.result != "valid").count();
    if failed > 0 {
        return Err(crate::CliError::Verification(format!(
            "{failed} of {} signatures failed",
            rows.len()
        )));
    }
    if format == OutputFormat::Table {
        success(&format!("{} signature(s) valid", rows.len()));
    }
    Ok(())
}

/// Verifies the root and every signed entity or role beneath it.
pub fn verify_document(document: &Document, validator: &XmlSignatureValidator) -> Vec<VerifyRow> {
    let mut rows = Vec::new();
    check(&mut rows, document.kind().to_string(), document.root(), validator);

    if let Document::Metadata(metadata) = document {
        let nested = matches!(metadata, MetadataDocument::Entities(_));
        for entity in metadata.entities() {
            let path = format!("EntityDescriptor[{}]", entity.entity_id());
            if nested {
                check(&mut rows, path.clone(), entity, validator);
            }
            for role in entity.roles() {
                if let Some(signable) = role.as_signable() {
                    check(&mut rows, format!("{path}/{}", role.local_name()), signable, validator);
                }
            }
        }
    }
    rows
}

fn check(rows: &mut Vec<VerifyRow>, element: String, signable: &dyn Signable, validator: &XmlSignatureValidator) {
    if !signable.is_signed() {
        return;
    }
    let result = match signable.verify(validator) {
        Ok(()) => "valid".to_string(),
        Err(e) => e.to_string(),
    };
    rows.push(VerifyRow {
        element,
        id: signable.id().unwrap_or_default().to_string(),
        result,
    });
}
