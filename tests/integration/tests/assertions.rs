//! Assertion parsing, building and validation.

use chrono::{DateTime, Duration, TimeZone, Utc};
use samlmd::{
    Assertion, AttributeStatement, AuthnContextClass, AuthnStatement, Conditions, Issuer, NameId, SamlElement,
    SamlError, Signable, Subject, SubjectConfirmation, SubjectConfirmationData,
};

use crate::common::{TestKeys, ASSERTION};

const SP: &str = "https://sp.example.com";

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap()
}

fn validation_field(result: Result<(), SamlError>) -> String {
    match result {
        Err(SamlError::Validation { field, .. }) => field,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn parsed_assertion_exposes_its_content() -> anyhow::Result<()> {
    let assertion = Assertion::from_xml_str(ASSERTION)?;
    assert_eq!(assertion.id(), "_assertion");
    assert_eq!(assertion.version(), "2.0");
    assert_eq!(assertion.issuer().value(), "https://idp.example.com/saml");

    let subject = assertion.subject().expect("subject");
    assert_eq!(subject.name_id().map(NameId::value), Some("user-1"));
    let bearer = subject.bearer_confirmation().expect("bearer confirmation");
    let data = bearer.data().expect("confirmation data");
    assert_eq!(data.recipient(), Some("https://sp.example.com/acs"));
    assert_eq!(data.in_response_to(), Some("_req"));

    let conditions = assertion.conditions().expect("conditions");
    assert!(conditions.is_one_time_use());
    assert!(conditions.allows_audience(SP));

    let authn = assertion.authn_statements().next().expect("authn statement");
    assert_eq!(authn.session_index(), Some("_session"));
    assert_eq!(
        authn.authn_context().class().and_then(|class_ref| class_ref.class()),
        Some(AuthnContextClass::PasswordProtectedTransport)
    );

    let roles: Vec<_> = assertion
        .attributes()
        .find(|attribute| attribute.name() == "role")
        .map(|attribute| attribute.text_values().collect())
        .unwrap_or_default();
    assert_eq!(roles, ["admin", "dev"]);
    Ok(())
}

#[test]
fn assertion_round_trips_structurally() -> anyhow::Result<()> {
    let original = samlmd::xml::parse(ASSERTION)?;
    let assertion = Assertion::from_xml(&original)?;
    assert!(assertion.to_xml().structurally_eq(&original));
    assert_eq!(Assertion::from_xml_str(&assertion.to_xml_string()?)?, assertion);
    Ok(())
}

#[test]
fn validation_follows_the_conditions_window() -> anyhow::Result<()> {
    let assertion = Assertion::from_xml_str(ASSERTION)?;
    assertion.validate(SP, at(0))?;
    assertion.validate(SP, at(4))?;

    assert_eq!(validation_field(assertion.validate(SP, at(5))), "NotOnOrAfter");
    let early = at(0) - Duration::seconds(1);
    assert_eq!(validation_field(assertion.validate(SP, early)), "NotBefore");
    assert_eq!(
        validation_field(assertion.validate("https://other.example.com", at(1))),
        "Audience"
    );
    Ok(())
}

#[test]
fn every_audience_restriction_must_allow_the_audience() -> anyhow::Result<()> {
    let xml = ASSERTION.replace(
        "<saml:OneTimeUse/>",
        "<saml:AudienceRestriction><saml:Audience>https://other.example.com</saml:Audience></saml:AudienceRestriction>",
    );
    let assertion = Assertion::from_xml_str(&xml)?;
    assert_eq!(validation_field(assertion.validate(SP, at(1))), "Audience");
    Ok(())
}

#[test]
fn built_assertion_signs_and_validates() -> anyhow::Result<()> {
    let keys = TestKeys::generate()?;
    let data = SubjectConfirmationData::for_request("_req", "https://sp.example.com/acs")?;
    let subject = Subject::new(NameId::email("user@example.com")?)
        .with_confirmation(SubjectConfirmation::bearer().with_data(data));
    let mut assertion = Assertion::new(Issuer::new("https://idp.example.com/saml")?)
        .with_subject(subject)
        .with_conditions(Conditions::new().with_validity(5)?.with_audience(SP)?.one_time_use())
        .with_authn_statement(AuthnStatement::new(AuthnContextClass::PasswordProtectedTransport))
        .with_attribute_statement(AttributeStatement::from_pairs([(
            "groups".to_string(),
            vec!["staff".to_string(), "ops".to_string()],
        )])?);

    assertion.validate(SP, Utc::now())?;
    assertion.sign(&keys.signer)?;

    let parsed = Assertion::from_xml_str(&assertion.to_xml_string()?)?;
    parsed.verify(&keys.validator)?;
    parsed.validate(SP, Utc::now())?;
    assert!(parsed.id().starts_with('_'));
    assert_eq!(parsed.attribute_statements().count(), 1);
    Ok(())
}

#[test]
fn unsupported_version_fails_validation() -> anyhow::Result<()> {
    let assertion = Assertion::from_xml_str(&ASSERTION.replace("Version=\"2.0\"", "Version=\"1.1\""))?;
    assert_eq!(validation_field(assertion.validate(SP, at(1))), "Version");
    Ok(())
}

#[test]
fn authz_decision_statements_are_kept_opaque() -> anyhow::Result<()> {
    let xml = ASSERTION.replace(
        "</saml:Assertion>",
        "<saml:AuthzDecisionStatement Resource=\"https://sp.example.com/doc\" Decision=\"Permit\"><saml:Action Namespace=\"urn:oasis:names:tc:SAML:1.0:action:rwedc\">Read</saml:Action></saml:AuthzDecisionStatement></saml:Assertion>",
    );
    let original = samlmd::xml::parse(&xml)?;
    let assertion = Assertion::from_xml(&original)?;
    assert_eq!(assertion.statements().len(), 3);
    assert!(assertion.to_xml().structurally_eq(&original));
    Ok(())
}
