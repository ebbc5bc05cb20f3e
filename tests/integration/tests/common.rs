//! Common test utilities and fixtures.

use samlmd::xml::{self, XmlElement};
use samlmd::{XmlSignatureValidator, XmlSigner};
use samlmd_crypto::{EcdsaSigningKey, SignatureAlgorithm};

/// Identity provider metadata with a signing key, an organization and a
/// foreign extension child.
pub const IDP_METADATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns:mdui="urn:oasis:names:tc:SAML:metadata:ui" ID="_idp" entityID="https://idp.example.com/saml" validUntil="2099-01-01T00:00:00Z">
  <md:Extensions>
    <mdui:UIInfo><mdui:DisplayName xml:lang="en">Example IdP</mdui:DisplayName></mdui:UIInfo>
  </md:Extensions>
  <md:IDPSSODescriptor WantAuthnRequestsSigned="true" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
    <md:KeyDescriptor use="signing">
      <ds:KeyInfo><ds:X509Data><ds:X509Certificate>MIIBszCCAVmgAwIBAgIUY2VydA==</ds:X509Certificate></ds:X509Data></ds:KeyInfo>
    </md:KeyDescriptor>
    <md:SingleLogoutService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp.example.com/slo"/>
    <md:NameIDFormat>urn:oasis:names:tc:SAML:2.0:nameid-format:persistent</md:NameIDFormat>
    <md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp.example.com/sso"/>
    <md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://idp.example.com/sso/post"/>
  </md:IDPSSODescriptor>
  <md:Organization>
    <md:OrganizationName xml:lang="en">Example</md:OrganizationName>
    <md:OrganizationDisplayName xml:lang="en">Example Inc.</md:OrganizationDisplayName>
    <md:OrganizationURL xml:lang="en">https://example.com</md:OrganizationURL>
  </md:Organization>
  <md:ContactPerson contactType="technical"><md:EmailAddress>mailto:ops@example.com</md:EmailAddress></md:ContactPerson>
</md:EntityDescriptor>"#;

/// Service provider metadata with two assertion consumer services.
pub const SP_METADATA: &str = r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" ID="_sp" entityID="https://sp.example.com">
  <md:SPSSODescriptor AuthnRequestsSigned="true" WantAssertionsSigned="true" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
    <md:AssertionConsumerService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://sp.example.com/acs/redirect" index="1"/>
    <md:AssertionConsumerService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://sp.example.com/acs" index="0" isDefault="true"/>
    <md:AttributeConsumingService index="0">
      <md:ServiceName xml:lang="en">Portal</md:ServiceName>
      <md:RequestedAttribute Name="mail" isRequired="true"/>
    </md:AttributeConsumingService>
  </md:SPSSODescriptor>
</md:EntityDescriptor>"#;

/// An aggregate holding an entity, a nested group and a foreign role.
pub const AGGREGATE_METADATA: &str = r#"<md:EntitiesDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" ID="_fed" Name="urn:example:federation">
  <md:EntityDescriptor entityID="https://sp.example.com">
    <md:SPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
      <md:AssertionConsumerService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://sp.example.com/acs" index="0"/>
    </md:SPSSODescriptor>
  </md:EntityDescriptor>
  <md:EntitiesDescriptor Name="urn:example:nested">
    <md:EntityDescriptor entityID="https://aa.example.com">
      <md:AttributeAuthorityDescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
        <md:AttributeService Binding="urn:oasis:names:tc:SAML:2.0:bindings:SOAP" Location="https://aa.example.com/query"/>
      </md:AttributeAuthorityDescriptor>
      <fed:ApplicationServiceType xmlns:fed="http://docs.oasis-open.org/wsfed/federation/200706" protocolSupportEnumeration="http://docs.oasis-open.org/wsfed/federation/200706"/>
    </md:EntityDescriptor>
  </md:EntitiesDescriptor>
</md:EntitiesDescriptor>"#;

/// A bearer assertion for `https://sp.example.com`.
pub const ASSERTION: &str = r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" Version="2.0" ID="_assertion" IssueInstant="2024-01-01T00:00:00Z">
  <saml:Issuer>https://idp.example.com/saml</saml:Issuer>
  <saml:Subject>
    <saml:NameID Format="urn:oasis:names:tc:SAML:2.0:nameid-format:persistent">user-1</saml:NameID>
    <saml:SubjectConfirmation Method="urn:oasis:names:tc:SAML:2.0:cm:bearer">
      <saml:SubjectConfirmationData NotOnOrAfter="2024-01-01T00:05:00Z" Recipient="https://sp.example.com/acs" InResponseTo="_req"/>
    </saml:SubjectConfirmation>
  </saml:Subject>
  <saml:Conditions NotBefore="2024-01-01T00:00:00Z" NotOnOrAfter="2024-01-01T00:05:00Z">
    <saml:AudienceRestriction><saml:Audience>https://sp.example.com</saml:Audience></saml:AudienceRestriction>
    <saml:OneTimeUse/>
  </saml:Conditions>
  <saml:AuthnStatement AuthnInstant="2024-01-01T00:00:00Z" SessionIndex="_session">
    <saml:AuthnContext><saml:AuthnContextClassRef>urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport</saml:AuthnContextClassRef></saml:AuthnContext>
  </saml:AuthnStatement>
  <saml:AttributeStatement>
    <saml:Attribute Name="mail"><saml:AttributeValue>user@example.com</saml:AttributeValue></saml:Attribute>
    <saml:Attribute Name="role"><saml:AttributeValue>admin</saml:AttributeValue><saml:AttributeValue>dev</saml:AttributeValue></saml:Attribute>
  </saml:AttributeStatement>
</saml:Assertion>"#;

/// A fresh signer with the validator that trusts its key.
pub struct TestKeys {
    /// Signer over a generated key.
    pub signer: XmlSigner,
    /// Validator trusting only that key.
    pub validator: XmlSignatureValidator,
}

impl TestKeys {
    /// Generates a P-256 key pair.
    pub fn generate() -> anyhow::Result<Self> {
        Self::generate_with(SignatureAlgorithm::Es256)
    }

    /// Generates a key pair for an ECDSA algorithm.
    pub fn generate_with(algorithm: SignatureAlgorithm) -> anyhow::Result<Self> {
        init_tracing();
        let key = EcdsaSigningKey::generate(algorithm)?;
        let validator = XmlSignatureValidator::new(Vec::new()).with_public_key(key.public_key());
        Ok(Self {
            signer: XmlSigner::new(key),
            validator,
        })
    }
}

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("samlmd=debug")
        .with_test_writer()
        .try_init();
}

/// Parses `text` into a tree.
pub fn tree(text: &str) -> anyhow::Result<XmlElement> {
    Ok(xml::parse(text)?)
}

/// Local names of the element children of `element`.
pub fn child_names(element: &XmlElement) -> Vec<String> {
    element.child_elements().map(|child| child.local_name.clone()).collect()
}
