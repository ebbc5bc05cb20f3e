//! Enveloped signature storage for signable elements.

use tracing::{debug, warn};

use crate::error::{SamlError, SamlResult};
use crate::types::{SAML_NS, XMLDSIG_NS};
use crate::xml::{XmlElement, XmlNode};

use super::{XmlSignature, XmlSignatureValidator, XmlSigner};

/// A signature attached to an element, with the bytes it covers.
#[derive(Debug, Clone)]
pub struct AttachedSignature {
    signature: XmlSignature,
    element: XmlElement,
    signed_content: Option<Vec<u8>>,
}

impl AttachedSignature {
    pub(crate) fn new(signature: XmlSignature, element: XmlElement, signed_content: Option<Vec<u8>>) -> Self {
        Self {
            signature,
            element,
            signed_content,
        }
    }

    /// The parsed signature fields.
    #[must_use]
    pub const fn signature(&self) -> &XmlSignature {
        &self.signature
    }

    /// The `ds:Signature` subtree.
    #[must_use]
    pub const fn element(&self) -> &XmlElement {
        &self.element
    }

    /// Canonical form of the owning element without this signature; the
    /// input to the reference digest.
    ///
    /// `None` when the reference asks for a transform this crate cannot
    /// apply, such as inclusive canonicalization. Such a signature never
    /// verifies.
    #[must_use]
    pub fn signed_content(&self) -> Option<&[u8]> {
        self.signed_content.as_deref()
    }
}

impl PartialEq for AttachedSignature {
    fn eq(&self, other: &Self) -> bool {
        self.element.structurally_eq(&other.element)
    }
}

/// Whether a signable element carries a signature.
#[derive(Debug, Clone, PartialEq)]
pub enum SignatureState {
    /// No signature.
    Unsigned,
    /// Signed; terminal.
    Signed(AttachedSignature),
}

/// Holder of a [`SignatureState`] that only moves from unsigned to signed.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureSlot {
    state: SignatureState,
}

impl SignatureSlot {
    pub(crate) const fn unsigned() -> Self {
        Self {
            state: SignatureState::Unsigned,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &SignatureState {
        &self.state
    }

    /// Returns the signature, if any.
    #[must_use]
    pub const fn signature(&self) -> Option<&AttachedSignature> {
        match &self.state {
            SignatureState::Signed(signature) => Some(signature),
            SignatureState::Unsigned => None,
        }
    }

    /// Returns true once a signature is attached.
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        matches!(self.state, SignatureState::Signed(_))
    }

    fn attach(&mut self, signature: AttachedSignature) -> SamlResult<()> {
        if self.is_signed() {
            return Err(SamlError::AlreadySigned);
        }
        self.state = SignatureState::Signed(signature);
        Ok(())
    }

    /// Inserts the signature subtree at its schema position in `element`.
    pub(crate) fn insert_into(&self, element: &mut XmlElement) {
        if let Some(signature) = self.signature() {
            let position = signature_position(element.child_elements());
            element.insert_child_element(position, signature.element.clone());
        }
    }
}

/// Index among child elements where the signature belongs: after a leading
/// `saml:Issuer`, otherwise first.
pub(super) fn signature_position<'a>(mut children: impl Iterator<Item = &'a XmlElement>) -> usize {
    match children.next() {
        Some(first) if first.is(SAML_NS, "Issuer") => 1,
        _ => 0,
    }
}

/// Splits the `ds:Signature` child off `element`.
///
/// Returns the signature slot and the remaining child elements in order,
/// ready for dispatch.
///
/// # Errors
///
/// Returns [`SamlError::MultipleElements`] for a second signature and
/// [`SamlError::SignatureStructure`] for a malformed one.
pub(crate) fn extract_signature(element: &XmlElement) -> SamlResult<(SignatureSlot, Vec<&XmlElement>)> {
    let mut found: Option<(usize, &XmlElement)> = None;
    let mut rest = Vec::new();
    for (index, child) in element.child_elements().enumerate() {
        if child.is(XMLDSIG_NS, "Signature") {
            if found.is_some() {
                return Err(SamlError::multiple("Signature"));
            }
            found = Some((index, child));
        } else {
            rest.push(child);
        }
    }

    let Some((index, signature_element)) = found else {
        return Ok((SignatureSlot::unsigned(), rest));
    };

    let expected = signature_position(rest.iter().copied());
    if index != expected {
        warn!(
            element = %element.expanded_name(),
            position = index,
            expected,
            "signature is not at its schema position"
        );
    }

    let signature = XmlSignature::from_xml(signature_element)?;

    let mut unsigned = element.clone();
    unsigned.children.retain(|node| {
        !matches!(node, XmlNode::Element(child) if child.is(XMLDSIG_NS, "Signature"))
    });
    let signed_content = signature
        .reference_canonicalization()
        .and_then(|c14n| c14n.apply_with_prefixes(&unsigned, &signature.reference_prefixes));
    if signed_content.is_none() {
        warn!(
            element = %element.expanded_name(),
            transforms = ?signature.transforms,
            "signature reference uses an unsupported transform"
        );
    }

    let attached = AttachedSignature::new(signature, signature_element.clone(), signed_content);
    Ok((
        SignatureSlot {
            state: SignatureState::Signed(attached),
        },
        rest,
    ))
}

/// An element that may carry an enveloped signature over itself.
pub trait Signable {
    /// The `ID` the signature reference points at, if the element has one.
    fn id(&self) -> Option<&str>;

    /// The signature slot.
    fn signature_slot(&self) -> &SignatureSlot;

    /// Mutable access used by [`Signable::sign`].
    fn signature_slot_mut(&mut self) -> &mut SignatureSlot;

    /// Serializes the element without its signature.
    fn to_unsigned_xml(&self) -> XmlElement;

    /// Serializes the element with its signature, if any, in place.
    fn to_signed_xml(&self) -> XmlElement {
        let mut element = self.to_unsigned_xml();
        self.signature_slot().insert_into(&mut element);
        element
    }

    /// Returns true once signed.
    fn is_signed(&self) -> bool {
        self.signature_slot().is_signed()
    }

    /// Returns the attached signature.
    fn signature(&self) -> Option<&AttachedSignature> {
        self.signature_slot().signature()
    }

    /// Signs the element as it currently serializes.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::AlreadySigned`] on a second call, or the
    /// signer's error.
    fn sign(&mut self, signer: &XmlSigner) -> SamlResult<()> {
        if self.is_signed() {
            return Err(SamlError::AlreadySigned);
        }
        let unsigned = self.to_unsigned_xml();
        let attached = signer.sign_element(&unsigned, self.id())?;
        debug!(element = %unsigned.expanded_name(), id = ?self.id(), "attached signature");
        self.signature_slot_mut().attach(attached)
    }

    /// Verifies the attached signature.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureInvalid`] if the element is unsigned or
    /// the signature does not verify.
    fn verify(&self, validator: &XmlSignatureValidator) -> SamlResult<()> {
        let signature = self
            .signature()
            .ok_or_else(|| SamlError::SignatureInvalid("element is not signed".to_string()))?;
        validator.validate(signature, self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse;

    const SIGNED: &str = r##"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_a"><saml:Issuer>https://idp</saml:Issuer><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo><ds:CanonicalizationMethod Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"/><ds:SignatureMethod Algorithm="http://www.w3.org/2001/04/xmldsig-more#rsa-sha256"/><ds:Reference URI="#_a"><ds:Transforms><ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/></ds:Transforms><ds:DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/><ds:DigestValue>AAEC</ds:DigestValue></ds:Reference></ds:SignedInfo><ds:SignatureValue>AwQF</ds:SignatureValue></ds:Signature><saml:Subject/></saml:Assertion>"##;

    #[test]
    fn extracts_signature_and_remaining_children() {
        let root = parse(SIGNED).unwrap();
        let (slot, rest) = extract_signature(&root).unwrap();
        assert!(slot.is_signed());
        let names: Vec<_> = rest.iter().map(|e| e.local_name.as_str()).collect();
        assert_eq!(names, ["Issuer", "Subject"]);

        let content = String::from_utf8(slot.signature().unwrap().signed_content().unwrap().to_vec()).unwrap();
        assert!(!content.contains("Signature"));
        assert!(content.starts_with("<saml:Assertion xmlns:saml="));
    }

    #[test]
    fn unsupported_transform_leaves_no_signed_content() {
        let inclusive = SIGNED.replacen(
            "</ds:Transforms>",
            r#"<ds:Transform Algorithm="http://www.w3.org/TR/2001/REC-xml-c14n-20010315"/></ds:Transforms>"#,
            1,
        );
        let (slot, _) = extract_signature(&parse(&inclusive).unwrap()).unwrap();
        let attached = slot.signature().unwrap();
        assert!(attached.signed_content().is_none());

        let validator = XmlSignatureValidator::new(Vec::new());
        let err = validator.validate(attached, Some("_a")).unwrap_err();
        assert!(err.to_string().contains("unsupported transform"));
    }

    #[test]
    fn prefix_list_reaches_the_signed_content() {
        let with_prefixes = SIGNED
            .replacen(
                r#"ID="_a">"#,
                r#"xmlns:xs="http://www.w3.org/2001/XMLSchema" ID="_a">"#,
                1,
            )
            .replacen(
                "</ds:Transforms>",
                concat!(
                    r#"<ds:Transform Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#">"#,
                    r#"<ec:InclusiveNamespaces xmlns:ec="http://www.w3.org/2001/10/xml-exc-c14n#" PrefixList="xs"/>"#,
                    "</ds:Transform></ds:Transforms>"
                ),
                1,
            );
        let (slot, _) = extract_signature(&parse(&with_prefixes).unwrap()).unwrap();
        let content = slot.signature().unwrap().signed_content().unwrap();
        assert!(String::from_utf8_lossy(content)
            .starts_with(r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" xmlns:xs="http://www.w3.org/2001/XMLSchema" ID="_a">"#));
    }

    #[test]
    fn unsigned_element_has_empty_slot() {
        let root = parse(r#"<a><b/></a>"#).unwrap();
        let (slot, rest) = extract_signature(&root).unwrap();
        assert!(!slot.is_signed());
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn second_signature_is_rejected() {
        let doubled = SIGNED.replacen("<saml:Subject/>", "<ds:Signature xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\"/>", 1);
        match extract_signature(&parse(&doubled).unwrap()) {
            Err(SamlError::MultipleElements { local_name }) => assert_eq!(local_name, "Signature"),
            other => panic!("unexpected result: {:?}", other.map(|(s, _)| s.is_signed())),
        }
    }

    #[test]
    fn reinsertion_follows_issuer() {
        let root = parse(SIGNED).unwrap();
        let (slot, _) = extract_signature(&root).unwrap();

        let mut rebuilt = XmlElement::new(SAML_NS, "Assertion");
        rebuilt.append_child(XmlElement::new(SAML_NS, "Issuer"));
        rebuilt.append_child(XmlElement::new(SAML_NS, "Subject"));
        slot.insert_into(&mut rebuilt);

        let names: Vec<_> = rebuilt.child_elements().map(|e| e.local_name.as_str()).collect();
        assert_eq!(names, ["Issuer", "Signature", "Subject"]);
    }

    #[test]
    fn attach_is_one_way() {
        let root = parse(SIGNED).unwrap();
        let (slot, _) = extract_signature(&root).unwrap();
        let attached = slot.signature().unwrap().clone();

        let mut fresh = SignatureSlot::unsigned();
        fresh.attach(attached.clone()).unwrap();
        assert!(matches!(fresh.attach(attached), Err(SamlError::AlreadySigned)));
    }
}
