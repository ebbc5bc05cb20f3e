//! `roundtrip`: parse, re-serialize and compare.

use samlmd::xml;

use crate::cli::RoundtripArgs;
use crate::config::OutputFormat;
use crate::document::Document;
use crate::output::success;

/// Runs `roundtrip`.
///
/// Fails unless the re-serialized document is structurally equal to the
/// input, which holds for unknown and extension content as well.
pub fn run_roundtrip(args: RoundtripArgs, format: OutputFormat) -> crate::CliResult<()> {
    let text = std::fs::read_to_string(&args.file)?;
    let original = xml::parse(&text)?;
    let document = Document::from_root(&original)?;
    let written = document.to_xml();

    check_equal(&original, &written)?;
    if args.print {
        println!("{}", document.to_text(false)?);
    } else if format != OutputFormat::Quiet {
        success(&format!(
            "{} re-serialized without loss ({})",
            args.file.display(),
            document.kind()
        ));
    }
    Ok(())
}

/// Compares the parsed and written trees.
pub fn check_equal(original: &xml::XmlElement, written: &xml::XmlElement) -> crate::CliResult<()> {
    if original.structurally_eq(written) {
        return Ok(());
    }
    let first = first_difference(original, written, &mut Vec::new())
        .unwrap_or_else(|| original.local_name.clone());
    Err(crate::CliError::Mismatch(format!("first difference at /{first}")))
}

/// Path to the first element whose serialization differs.
fn first_difference(a: &xml::XmlElement, b: &xml::XmlElement, path: &mut Vec<String>) -> Option<String> {
    path.push(a.local_name.clone());
    let children_a: Vec<_> = a.child_elements().collect();
    let children_b: Vec<_> = b.child_elements().collect();
    if children_a.len() == children_b.len() {
        for (child_a, child_b) in children_a.iter().zip(&children_b) {
            if !child_a.structurally_eq(child_b) {
                return first_difference(child_a, child_b, path);
            }
        }
    }
    Some(path.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_the_differing_child() {
        let a = xml::parse(r#"<r xmlns="urn:x"><a/><b n="1"/></r>"#).unwrap();
        let b = xml::parse(r#"<r xmlns="urn:x"><a/><b n="2"/></r>"#).unwrap();
        let err = check_equal(&a, &b).unwrap_err();
        assert!(matches!(err, crate::CliError::Mismatch(message) if message.ends_with("/r/b")));
        assert!(check_equal(&a, &a).is_ok());
    }
}
