//! Parsing and re-serializing metadata documents.

use chrono::{TimeZone, Utc};
use samlmd::metadata::{
    AssertionConsumerService, EntitiesDescriptor, EntitiesMember, EntityDescriptor, Endpoint, IdpSsoDescriptor,
    KeyUse, MetadataDocument, RoleDescriptor, RoleDescriptorBase, SingleSignOnService, SpSsoDescriptor,
    SsoDescriptorBase,
};
use samlmd::xml;
use samlmd::{SamlBinding, SamlElement, SamlError, Signable};

use crate::common::{child_names, tree, TestKeys, AGGREGATE_METADATA, IDP_METADATA, SP_METADATA};

#[test]
fn idp_metadata_survives_a_round_trip() -> anyhow::Result<()> {
    let original = tree(IDP_METADATA)?;
    let entity = EntityDescriptor::from_xml(&original)?;

    assert_eq!(entity.entity_id(), "https://idp.example.com/saml");
    let idp = entity.idp_sso_descriptors().next().expect("IdP role");
    assert!(idp.want_authn_requests_signed());
    assert_eq!(idp.single_sign_on_services().len(), 2);
    assert_eq!(
        idp.single_sign_on_service(SamlBinding::HttpPost).map(|s| s.location()),
        Some("https://idp.example.com/sso/post")
    );
    assert_eq!(idp.sso().role().keys_for(KeyUse::Signing).count(), 1);
    assert!(entity.organization().is_some());
    assert_eq!(entity.contacts().len(), 1);

    assert!(entity.to_xml().structurally_eq(&original));
    Ok(())
}

#[test]
fn signature_over_alternate_spellings_survives_the_model() -> anyhow::Result<()> {
    let compact = concat!(
        r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" ID="_sp" entityID="https://sp.example.com" validUntil="2099-01-01T01:00:00+01:00">"#,
        r#"<md:SPSSODescriptor WantAssertionsSigned="1" AuthnRequestsSigned="0" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">"#,
        r#"<md:AssertionConsumerService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://sp.example.com/acs" index="01" isDefault="1"/>"#,
        "</md:SPSSODescriptor></md:EntityDescriptor>"
    );
    let keys = TestKeys::generate()?;
    let mut root = tree(compact)?;
    let attached = keys.signer.sign_element(&root, Some("_sp"))?;
    root.insert_child_element(0, attached.element().clone());
    let signed = xml::write(&root)?;

    let entity = EntityDescriptor::from_xml_str(&signed)?;
    let sp = entity.sp_sso_descriptors().next().expect("SP role");
    assert!(sp.want_assertions_signed());
    assert!(!sp.authn_requests_signed());
    assert_eq!(sp.assertion_consumer_service(1).map(|acs| acs.is_default()), Some(Some(true)));
    assert_eq!(
        entity.validity().valid_until(),
        Some(&Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap())
    );

    let rewritten = entity.to_xml_string()?;
    assert!(rewritten.contains(r#"validUntil="2099-01-01T01:00:00+01:00""#));
    assert!(rewritten.contains(r#"WantAssertionsSigned="1""#));
    assert!(rewritten.contains(r#"index="01""#));
    EntityDescriptor::from_xml_str(&rewritten)?.verify(&keys.validator)?;
    Ok(())
}

#[test]
fn serialized_text_parses_to_an_equal_value() -> anyhow::Result<()> {
    let entity = EntityDescriptor::from_xml_str(SP_METADATA)?;
    let reparsed = EntityDescriptor::from_xml_str(&entity.to_xml_string()?)?;
    assert_eq!(entity, reparsed);

    let pretty = xml::write_pretty(&entity.to_xml())?;
    assert_eq!(EntityDescriptor::from_xml_str(&pretty)?, entity);
    Ok(())
}

#[test]
fn default_assertion_consumer_service_honours_is_default() -> anyhow::Result<()> {
    let entity = EntityDescriptor::from_xml_str(SP_METADATA)?;
    let sp = entity.sp_sso_descriptors().next().expect("SP role");
    assert!(sp.authn_requests_signed());
    assert!(sp.want_assertions_signed());

    let default = sp.default_assertion_consumer_service().expect("default ACS");
    assert_eq!(default.index(), 0);
    assert_eq!(default.endpoint().location(), "https://sp.example.com/acs");
    assert_eq!(
        sp.assertion_consumer_service(1).map(|acs| acs.endpoint().location()),
        Some("https://sp.example.com/acs/redirect")
    );
    assert_eq!(sp.attribute_consuming_services().len(), 1);
    Ok(())
}

#[test]
fn aggregate_walks_nested_groups_depth_first() -> anyhow::Result<()> {
    let document = MetadataDocument::from_xml_str(AGGREGATE_METADATA)?;
    let ids: Vec<_> = document.entities().map(EntityDescriptor::entity_id).collect();
    assert_eq!(ids, ["https://sp.example.com", "https://aa.example.com"]);

    let aa = document.find_entity("https://aa.example.com").expect("nested entity");
    assert_eq!(aa.attribute_authority_descriptors().count(), 1);
    assert!(document.find_entity("https://missing.example.com").is_none());

    assert!(document.to_xml().structurally_eq(&tree(AGGREGATE_METADATA)?));
    Ok(())
}

#[test]
fn foreign_children_keep_their_position() -> anyhow::Result<()> {
    let original = tree(AGGREGATE_METADATA)?;
    let document = MetadataDocument::from_xml(&original)?;
    let aa = document.find_entity("https://aa.example.com").expect("nested entity");
    assert_eq!(aa.roles().len(), 1);
    assert_eq!(aa.unknown_children().len(), 1);

    let nested = original
        .child_elements()
        .find(|child| child.local_name == "EntitiesDescriptor")
        .and_then(|group| group.child_elements().next())
        .expect("nested entity element");
    assert_eq!(child_names(nested), ["AttributeAuthorityDescriptor", "ApplicationServiceType"]);
    assert_eq!(child_names(&aa.to_xml()), child_names(nested));
    Ok(())
}

#[test]
fn extensions_content_is_kept_verbatim() -> anyhow::Result<()> {
    let entity = EntityDescriptor::from_xml_str(IDP_METADATA)?;
    let extensions = entity.extensions().expect("extensions");
    let ui = extensions
        .find("urn:oasis:names:tc:SAML:metadata:ui", "UIInfo")
        .expect("UIInfo chunk");
    assert_eq!(ui.local_name(), "UIInfo");
    assert!(ui.to_xml().child_elements().any(|child| child.text() == "Example IdP"));
    Ok(())
}

#[test]
fn validity_propagates_from_roles() -> anyhow::Result<()> {
    let entity = EntityDescriptor::from_xml_str(IDP_METADATA)?;
    assert!(!entity.is_expired(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()));
    assert!(entity.is_expired(Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap()));

    let expiring_role = SP_METADATA.replace(
        "<md:SPSSODescriptor ",
        "<md:SPSSODescriptor validUntil=\"2020-01-01T00:00:00Z\" ",
    );
    let entity = EntityDescriptor::from_xml_str(&expiring_role)?;
    assert!(entity.validity().valid_until().is_none());
    assert!(entity.is_expired(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
    Ok(())
}

#[test]
fn built_metadata_parses_back() -> anyhow::Result<()> {
    let idp = IdpSsoDescriptor::new(
        SsoDescriptorBase::new(RoleDescriptorBase::saml2()),
        vec![SingleSignOnService::for_binding(SamlBinding::HttpRedirect, "https://idp.example.com/sso")?],
    )?
    .with_want_authn_requests_signed(true);
    let sp = SpSsoDescriptor::new(
        SsoDescriptorBase::new(RoleDescriptorBase::saml2()),
        vec![AssertionConsumerService::new(
            Endpoint::for_binding(SamlBinding::HttpPost, "https://sp.example.com/acs")?,
            0,
        )],
    )?;

    let group = EntitiesDescriptor::new(vec![
        EntitiesMember::Entity(EntityDescriptor::with_roles("https://idp.example.com", vec![idp.into()])?),
        EntitiesMember::Entity(EntityDescriptor::with_roles("https://sp.example.com", vec![sp.into()])?),
    ])?
    .with_name("urn:example:built")?;

    let text = group.to_xml_string()?;
    let parsed = EntitiesDescriptor::from_xml_str(&text)?;
    assert_eq!(parsed, group);
    assert_eq!(parsed.name(), Some("urn:example:built"));
    assert!(matches!(
        parsed.entities().next().map(|entity| &entity.roles()[0]),
        Some(RoleDescriptor::IdpSso(_))
    ));
    Ok(())
}

#[test]
fn required_children_are_enforced_on_parse() {
    let no_acs = r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="https://sp.example.com"><md:SPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol"/></md:EntityDescriptor>"#;
    match EntityDescriptor::from_xml_str(no_acs) {
        Err(SamlError::Validation { field, .. }) => assert_eq!(field, "AssertionConsumerService"),
        other => panic!("unexpected result: {other:?}"),
    }

    let empty_group = r#"<md:EntitiesDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata"/>"#;
    match EntitiesDescriptor::from_xml_str(empty_group) {
        Err(SamlError::Validation { field, .. }) => assert_eq!(field, "EntityDescriptor"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn wrong_root_is_a_schema_mismatch() {
    let err = EntityDescriptor::from_xml_str(AGGREGATE_METADATA).unwrap_err();
    match err {
        SamlError::SchemaMismatch { expected, found } => {
            assert!(expected.ends_with("EntityDescriptor"));
            assert!(found.ends_with("EntitiesDescriptor"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
