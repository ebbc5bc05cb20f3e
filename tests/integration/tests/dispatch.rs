//! Child dispatch as seen through whole documents.

use samlmd::metadata::{EntityDescriptor, IdpSsoDescriptor, KeyInfo, RoleDescriptor};
use samlmd::{Assertion, SamlElement, SamlError};

use crate::common::{child_names, tree, ASSERTION, IDP_METADATA, SP_METADATA};

fn unexpected(result: Result<impl std::fmt::Debug, SamlError>) -> (String, String) {
    match result {
        Err(SamlError::UnexpectedElement { namespace, local_name }) => (namespace, local_name),
        other => panic!("expected UnexpectedElement, got {other:?}"),
    }
}

#[test]
fn closed_entity_rejects_unknown_metadata_child() {
    let xml = SP_METADATA.replace("</md:SPSSODescriptor>", "</md:SPSSODescriptor><md:Bogus/>");
    let (namespace, local_name) = unexpected(EntityDescriptor::from_xml_str(&xml));
    assert_eq!(namespace, "urn:oasis:names:tc:SAML:2.0:metadata");
    assert_eq!(local_name, "Bogus");
}

#[test]
fn role_extension_point_keeps_unknown_metadata_child() -> anyhow::Result<()> {
    let xml = SP_METADATA.replace(
        "<md:AttributeConsumingService",
        "<md:Bogus/><md:AttributeConsumingService",
    );
    let original = tree(&xml)?;
    let entity = EntityDescriptor::from_xml(&original)?;
    let Some(RoleDescriptor::SpSso(sp)) = entity.roles().first() else {
        panic!("expected an SP role");
    };
    assert_eq!(sp.unknown_children().len(), 1);
    assert!(entity.to_xml().structurally_eq(&original));
    Ok(())
}

#[test]
fn closed_assertion_rejects_unknown_assertion_child() {
    let xml = ASSERTION.replace("<saml:Subject>", "<saml:Evidence/><saml:Subject>");
    let (_, local_name) = unexpected(Assertion::from_xml_str(&xml));
    assert_eq!(local_name, "Evidence");
}

#[test]
fn foreign_children_are_kept_by_role_descriptors() -> anyhow::Result<()> {
    let xml = SP_METADATA.replace(
        "<md:AttributeConsumingService",
        "<x:Hint xmlns:x=\"urn:example:hint\">kept</x:Hint><md:AttributeConsumingService",
    );
    let original = tree(&xml)?;
    let entity = EntityDescriptor::from_xml(&original)?;
    let Some(RoleDescriptor::SpSso(sp)) = entity.roles().first() else {
        panic!("expected an SP role");
    };
    assert_eq!(sp.unknown_children().len(), 1);
    assert!(entity.to_xml().structurally_eq(&original));
    Ok(())
}

#[test]
fn repeated_single_children_are_rejected() {
    let xml = IDP_METADATA.replace(
        "<md:ContactPerson",
        "<md:Organization><md:OrganizationName xml:lang=\"en\">Again</md:OrganizationName><md:OrganizationDisplayName xml:lang=\"en\">Again</md:OrganizationDisplayName><md:OrganizationURL xml:lang=\"en\">https://again.example.com</md:OrganizationURL></md:Organization><md:ContactPerson",
    );
    match EntityDescriptor::from_xml_str(&xml) {
        Err(SamlError::MultipleElements { local_name }) => assert_eq!(local_name, "Organization"),
        other => panic!("unexpected result: {other:?}"),
    }

    let doubled = ASSERTION.replace("<saml:OneTimeUse/>", "<saml:OneTimeUse/><saml:OneTimeUse/>");
    match Assertion::from_xml_str(&doubled) {
        Err(SamlError::MultipleElements { local_name }) => assert_eq!(local_name, "OneTimeUse"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn generic_role_descriptor_is_kept_opaque() -> anyhow::Result<()> {
    let xml = r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:fed="http://docs.oasis-open.org/wsfed/federation/200706" entityID="https://sts.example.com"><md:RoleDescriptor xsi:type="fed:SecurityTokenServiceType" protocolSupportEnumeration="http://docs.oasis-open.org/wsfed/federation/200706"><fed:TokenTypesOffered/></md:RoleDescriptor></md:EntityDescriptor>"#;
    let original = tree(xml)?;
    let entity = EntityDescriptor::from_xml(&original)?;

    match entity.roles() {
        [RoleDescriptor::Other(chunk)] => assert_eq!(chunk.local_name(), "RoleDescriptor"),
        other => panic!("unexpected roles: {other:?}"),
    }
    assert!(entity.roles()[0].as_signable().is_none());
    assert!(entity.to_xml().structurally_eq(&original));
    Ok(())
}

#[test]
fn key_info_mixes_typed_and_opaque_children() -> anyhow::Result<()> {
    let xml = r##"<ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:KeyName>signing</ds:KeyName><ds:RetrievalMethod URI="#key"/><ds:X509Data><ds:X509Certificate>AAEC</ds:X509Certificate></ds:X509Data></ds:KeyInfo>"##;
    let original = tree(xml)?;
    let key_info = KeyInfo::from_xml(&original)?;
    assert_eq!(child_names(&key_info.to_xml()), ["KeyName", "RetrievalMethod", "X509Data"]);
    assert!(key_info.to_xml().structurally_eq(&original));
    Ok(())
}

#[test]
fn permissive_extensions_accept_anything() -> anyhow::Result<()> {
    let xml = IDP_METADATA.replace(
        "<mdui:UIInfo>",
        "<md:NotAMetadataElement/><mdui:UIInfo>",
    );
    let entity = EntityDescriptor::from_xml_str(&xml)?;
    let extensions = entity.extensions().expect("extensions");
    assert_eq!(extensions.children().len(), 2);
    Ok(())
}

#[test]
fn foreign_child_stays_with_its_sibling_when_roles_are_reordered() -> anyhow::Result<()> {
    let xml = concat!(
        r#"<md:IDPSSODescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">"#,
        r#"<md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://idp.example.com/sso"/>"#,
        r#"<x:Hint xmlns:x="urn:example:hint"/>"#,
        "<md:NameIDFormat>urn:oasis:names:tc:SAML:2.0:nameid-format:persistent</md:NameIDFormat>",
        "</md:IDPSSODescriptor>"
    );
    let idp = IdpSsoDescriptor::from_xml_str(xml)?;
    assert_eq!(
        child_names(&idp.to_xml()),
        ["NameIDFormat", "SingleSignOnService", "Hint"]
    );
    Ok(())
}
