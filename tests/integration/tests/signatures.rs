//! Signing and verifying enveloped signatures.

use samlmd::metadata::{EntitiesDescriptor, EntitiesMember, EntityDescriptor, MetadataDocument, RoleDescriptor};
use samlmd::signature::SignatureConfig;
use samlmd::{xml, Assertion, SamlElement, SamlError, Signable};
use samlmd_crypto::SignatureAlgorithm;

use crate::common::{child_names, tree, TestKeys, ASSERTION, IDP_METADATA, SP_METADATA};

#[test]
fn signed_entity_verifies_after_reparsing() -> anyhow::Result<()> {
    let keys = TestKeys::generate()?;
    let mut entity = EntityDescriptor::from_xml_str(SP_METADATA)?;
    assert!(!entity.is_signed());

    entity.sign(&keys.signer)?;
    assert!(entity.is_signed());
    entity.verify(&keys.validator)?;

    let text = entity.to_xml_string()?;
    let reparsed = EntityDescriptor::from_xml_str(&text)?;
    assert!(reparsed.is_signed());
    reparsed.verify(&keys.validator)?;
    Ok(())
}

#[test]
fn signature_leads_metadata_children() -> anyhow::Result<()> {
    let keys = TestKeys::generate()?;
    let mut entity = EntityDescriptor::from_xml_str(IDP_METADATA)?;
    entity.sign(&keys.signer)?;

    let names = child_names(&entity.to_xml());
    assert_eq!(names[0], "Signature");
    assert_eq!(names[1], "Extensions");
    Ok(())
}

#[test]
fn signature_follows_assertion_issuer() -> anyhow::Result<()> {
    let keys = TestKeys::generate_with(SignatureAlgorithm::Es384)?;
    let mut assertion = Assertion::from_xml_str(ASSERTION)?;
    assertion.sign(&keys.signer)?;

    let element = assertion.to_xml();
    assert_eq!(
        child_names(&element),
        ["Issuer", "Signature", "Subject", "Conditions", "AuthnStatement", "AttributeStatement"]
    );

    let reparsed = Assertion::from_xml_str(&assertion.to_xml_string()?)?;
    reparsed.verify(&keys.validator)?;
    let reference = reparsed.signature().map(|s| s.signature().reference_uri.clone());
    assert_eq!(reference.as_deref(), Some("#_assertion"));
    Ok(())
}

#[test]
fn tampering_breaks_verification() -> anyhow::Result<()> {
    let keys = TestKeys::generate()?;
    let mut entity = EntityDescriptor::from_xml_str(SP_METADATA)?;
    entity.sign(&keys.signer)?;

    let tampered = entity
        .to_xml_string()?
        .replace("https://sp.example.com/acs", "https://evil.example.com/acs");
    let reparsed = EntityDescriptor::from_xml_str(&tampered)?;
    match reparsed.verify(&keys.validator) {
        Err(SamlError::SignatureInvalid(reason)) => assert!(reason.contains("Digest")),
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[test]
fn untrusted_key_is_rejected() -> anyhow::Result<()> {
    let signing = TestKeys::generate()?;
    let other = TestKeys::generate()?;
    let mut assertion = Assertion::from_xml_str(ASSERTION)?;
    assertion.sign(&signing.signer)?;

    assert!(matches!(
        assertion.verify(&other.validator),
        Err(SamlError::SignatureInvalid(_))
    ));
    Ok(())
}

#[test]
fn second_signature_is_refused() -> anyhow::Result<()> {
    let keys = TestKeys::generate()?;
    let mut assertion = Assertion::from_xml_str(ASSERTION)?;
    assertion.sign(&keys.signer)?;
    assert!(matches!(assertion.sign(&keys.signer), Err(SamlError::AlreadySigned)));
    Ok(())
}

#[test]
fn unsigned_element_does_not_verify() -> anyhow::Result<()> {
    let keys = TestKeys::generate()?;
    let entity = EntityDescriptor::from_xml_str(SP_METADATA)?;
    assert!(matches!(entity.verify(&keys.validator), Err(SamlError::SignatureInvalid(_))));
    Ok(())
}

#[test]
fn nested_signatures_verify_inside_an_aggregate() -> anyhow::Result<()> {
    let entity_keys = TestKeys::generate()?;
    let group_keys = TestKeys::generate()?;

    let mut entity = EntityDescriptor::from_xml_str(SP_METADATA)?;
    entity.sign(&entity_keys.signer)?;
    let mut group = EntitiesDescriptor::new(vec![EntitiesMember::Entity(entity)])?
        .with_name("urn:example:signed")?
        .with_id("_group")?;
    group.sign(&group_keys.signer)?;

    let document = MetadataDocument::from_xml_str(&group.to_xml_string()?)?;
    document.root().verify(&group_keys.validator)?;
    let nested = document.find_entity("https://sp.example.com").expect("nested entity");
    nested.verify(&entity_keys.validator)?;
    assert!(nested.verify(&group_keys.validator).is_err());
    Ok(())
}

#[test]
fn signed_role_keeps_its_own_signature() -> anyhow::Result<()> {
    let keys = TestKeys::generate()?;
    let entity = EntityDescriptor::from_xml_str(SP_METADATA)?;
    let Some(RoleDescriptor::SpSso(sp)) = entity.roles().first() else {
        panic!("expected an SP role");
    };

    let mut sp = sp.clone();
    assert!(sp.sign(&keys.signer).is_ok());
    let role = RoleDescriptor::from(sp);
    assert!(role.is_signed());
    let entity = EntityDescriptor::with_roles("https://sp.example.com", vec![role])?;

    let reparsed = EntityDescriptor::from_xml_str(&entity.to_xml_string()?)?;
    assert!(!reparsed.is_signed());
    let signable = reparsed.roles()[0].as_signable().expect("typed role");
    assert!(signable.is_signed());
    signable.verify(&keys.validator)?;
    Ok(())
}

#[test]
fn prefix_list_covers_types_named_in_values() -> anyhow::Result<()> {
    let keys = TestKeys::generate()?;
    let validator = keys.validator;
    let signer = keys.signer.with_config(SignatureConfig {
        inclusive_prefixes: vec!["xs".to_string()],
        ..SignatureConfig::default()
    });

    // `xs` is bound on the assertion and only used inside an xsi:type value.
    let text = ASSERTION
        .replacen(
            r#"Version="2.0""#,
            r#"xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" Version="2.0""#,
            1,
        )
        .replacen(
            "<saml:AttributeValue>user@example.com",
            r#"<saml:AttributeValue xsi:type="xs:string">user@example.com"#,
            1,
        );
    let mut root = tree(&text)?;
    let attached = signer.sign_element(&root, Some("_assertion"))?;
    let content = String::from_utf8(attached.signed_content().expect("exclusive c14n").to_vec())?;
    assert!(content.starts_with(concat!(
        r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" "#,
        r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#
    )));

    root.insert_child_element(1, attached.element().clone());
    let signed = xml::write(&root)?;
    assert!(signed.contains(r#"PrefixList="xs""#));

    let reparsed = Assertion::from_xml_str(&signed)?;
    let signature = reparsed.signature().expect("signed assertion").signature();
    assert_eq!(signature.reference_prefixes, ["xs"]);
    reparsed.verify(&validator)?;
    Ok(())
}
