//! `sign`: sign the root element of a document.

use samlmd::xml::{self, XmlElement};
use samlmd::{SamlError, XmlSigner, XMLDSIG_NS};

use crate::cli::SignArgs;
use crate::config::OutputFormat;
use crate::document::Document;
use crate::output::success;
use crate::CliConfig;

/// Runs `sign`.
pub fn run_sign(args: SignArgs, config: &CliConfig, format: OutputFormat) -> crate::CliResult<()> {
    let key_path = config.effective_key(args.key).ok_or_else(|| {
        crate::CliError::InvalidArgument(
            "no signing key: pass --key or set signing_key in the configuration".to_string(),
        )
    })?;
    let key_pem = std::fs::read_to_string(&key_path)?;
    let certificate_pem = config
        .effective_certificate(args.cert)
        .map(std::fs::read_to_string)
        .transpose()?;
    let algorithm = args.algorithm.unwrap_or(config.algorithm).to_model();

    let signer = XmlSigner::from_pem(&key_pem, certificate_pem.as_deref(), algorithm)?;
    let document = Document::load(&args.file)?;
    let kind = document.kind();
    let text = sign_document(document, &signer, args.pretty)?;
    tracing::info!(file = %args.file.display(), algorithm = algorithm.uri(), pretty = args.pretty, "signed document");

    match &args.out {
        Some(path) => {
            std::fs::write(path, text)?;
            if format != OutputFormat::Quiet {
                success(&format!("Signed {kind} -> {}", path.display()));
            }
        }
        None => println!("{text}"),
    }
    Ok(())
}

/// Signs the root of `document` and returns the signed text.
///
/// Indentation sits inside the signed element, so with `pretty` the
/// document is indented first and the indented tree is what gets signed.
pub fn sign_document(mut document: Document, signer: &XmlSigner, pretty: bool) -> crate::CliResult<String> {
    if !pretty {
        document.root_mut().sign(signer)?;
        return document.to_text(false);
    }

    if document.root().is_signed() {
        return Err(SamlError::AlreadySigned.into());
    }
    let mut indented = xml::parse(&document.to_text(true)?)?;
    if indented.child_elements().any(contains_signature) {
        return Err(crate::CliError::InvalidArgument(
            "--pretty would alter content covered by nested signatures".to_string(),
        ));
    }
    signer.sign_in_place(&mut indented, document.root().id())?;
    Ok(xml::write(&indented)?)
}

fn contains_signature(element: &XmlElement) -> bool {
    element.is(XMLDSIG_NS, "Signature") || element.child_elements().any(contains_signature)
}
