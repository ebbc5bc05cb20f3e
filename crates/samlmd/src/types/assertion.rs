//! SAML assertion types.
//!
//! An [`Assertion`] carries an issuer, an optional subject and conditions,
//! and any number of statements. Assertions are [`Signable`]; the signature
//! goes directly after the `saml:Issuer`.

use chrono::{DateTime, Duration, Utc};

use crate::chunk::Chunk;
use crate::dispatch::{known_child, ChildPolicy, DispatchEntry, DispatchTable, UnknownChildren};
use crate::element::{expect, new_element, text_element, SamlElement};
use crate::error::{SamlError, SamlResult};
use crate::metadata::ForeignAttributes;
use crate::signature::{extract_signature, Signable, SignatureSlot};
use crate::lexical::Lexical;
use crate::validation::{
    require_child, require_non_empty, require_non_empty_list, require_uri, required_attribute, set_once,
};
use crate::xml::XmlElement;

use super::{Attribute, AuthnContextClass, Issuer, NameId, SAML_NS};

/// The only assertion version this model produces.
pub const SAML_VERSION: &str = "2.0";

text_element!(
    /// An audience URI (`saml:Audience`).
    Audience, SAML_NS, "Audience", require_uri
);

text_element!(
    /// Reference to an authentication context class (`saml:AuthnContextClassRef`).
    AuthnContextClassRef, SAML_NS, "AuthnContextClassRef", require_uri
);

text_element!(
    /// Reference to an authentication context declaration (`saml:AuthnContextDeclRef`).
    AuthnContextDeclRef, SAML_NS, "AuthnContextDeclRef", require_uri
);

text_element!(
    /// An authority involved in authenticating the subject (`saml:AuthenticatingAuthority`).
    AuthenticatingAuthority, SAML_NS, "AuthenticatingAuthority", require_uri
);

impl From<AuthnContextClass> for AuthnContextClassRef {
    fn from(class: AuthnContextClass) -> Self {
        Self {
            value: class.uri().to_string(),
        }
    }
}

impl AuthnContextClassRef {
    /// The well-known class this reference names, if any.
    #[must_use]
    pub fn class(&self) -> Option<AuthnContextClass> {
        AuthnContextClass::from_uri(&self.value)
    }
}

type Instant = Lexical<DateTime<Utc>>;

/// The `NotBefore` / `NotOnOrAfter` pair shared by conditions and
/// confirmation data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ValidityWindow {
    not_before: Option<Instant>,
    not_on_or_after: Option<Instant>,
}

impl ValidityWindow {
    fn new(not_before: Option<DateTime<Utc>>, not_on_or_after: Option<DateTime<Utc>>) -> SamlResult<Self> {
        Self::checked(not_before.map(Lexical::new), not_on_or_after.map(Lexical::new))
    }

    fn read(element: &XmlElement) -> SamlResult<Self> {
        Self::checked(
            Lexical::optional(element, "NotBefore")?,
            Lexical::optional(element, "NotOnOrAfter")?,
        )
    }

    fn checked(not_before: Option<Instant>, not_on_or_after: Option<Instant>) -> SamlResult<Self> {
        if let (Some(start), Some(end)) = (&not_before, &not_on_or_after) {
            if start.value() >= end.value() {
                return Err(SamlError::validation("NotOnOrAfter", "must be later than NotBefore"));
            }
        }
        Ok(Self {
            not_before,
            not_on_or_after,
        })
    }

    fn not_before(&self) -> Option<&DateTime<Utc>> {
        self.not_before.as_ref().map(Lexical::value)
    }

    fn not_on_or_after(&self) -> Option<&DateTime<Utc>> {
        self.not_on_or_after.as_ref().map(Lexical::value)
    }

    fn contains(&self, now: DateTime<Utc>) -> bool {
        self.not_before().map_or(true, |start| now >= *start)
            && self.not_on_or_after().map_or(true, |end| now < *end)
    }

    fn write(&self, element: &mut XmlElement) {
        element.set_optional_attribute("NotBefore", self.not_before.as_ref());
        element.set_optional_attribute("NotOnOrAfter", self.not_on_or_after.as_ref());
    }
}

// ============================================================================
// Subject
// ============================================================================

static CONFIRMATION_DATA_CHILDREN: DispatchTable<Chunk> = DispatchTable {
    context: "SubjectConfirmationData",
    namespace: SAML_NS,
    policy: ChildPolicy::Permissive,
    entries: &[],
};

/// Constraints on how the subject may be confirmed
/// (`saml:SubjectConfirmationData`).
///
/// The content model is open, so child elements such as `ds:KeyInfo` are
/// kept as chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectConfirmationData {
    window: ValidityWindow,
    recipient: Option<String>,
    in_response_to: Option<String>,
    address: Option<String>,
    attributes: ForeignAttributes,
    content: UnknownChildren,
}

impl SubjectConfirmationData {
    /// Empty confirmation data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bearer data answering `request_id`, delivered to `recipient` and valid
    /// for five minutes.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `recipient` is not a URI or
    /// `request_id` is empty.
    pub fn for_request(request_id: impl Into<String>, recipient: impl Into<String>) -> SamlResult<Self> {
        Self::new()
            .with_recipient(recipient)?
            .with_in_response_to(request_id)?
            .with_window(None, Some(Utc::now() + Duration::minutes(5)))
    }

    /// Sets `NotBefore` and `NotOnOrAfter`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if the window is empty.
    pub fn with_window(
        mut self,
        not_before: Option<DateTime<Utc>>,
        not_on_or_after: Option<DateTime<Utc>>,
    ) -> SamlResult<Self> {
        self.window = ValidityWindow::new(not_before, not_on_or_after)?;
        Ok(self)
    }

    /// Sets `Recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `recipient` is not a URI.
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> SamlResult<Self> {
        let recipient = recipient.into();
        require_uri("Recipient", &recipient)?;
        self.recipient = Some(recipient);
        Ok(self)
    }

    /// Sets `InResponseTo`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `request_id` is empty.
    pub fn with_in_response_to(mut self, request_id: impl Into<String>) -> SamlResult<Self> {
        let request_id = request_id.into();
        require_non_empty("InResponseTo", &request_id)?;
        self.in_response_to = Some(request_id);
        Ok(self)
    }

    /// Sets `Address`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `address` is empty.
    pub fn with_address(mut self, address: impl Into<String>) -> SamlResult<Self> {
        let address = address.into();
        require_non_empty("Address", &address)?;
        self.address = Some(address);
        Ok(self)
    }

    /// Appends an element such as `ds:KeyInfo`.
    #[must_use]
    pub fn with_content(mut self, chunk: Chunk) -> Self {
        self.content.push(chunk);
        self
    }

    /// `NotBefore`.
    #[must_use]
    pub fn not_before(&self) -> Option<&DateTime<Utc>> {
        self.window.not_before()
    }

    /// `NotOnOrAfter`.
    #[must_use]
    pub fn not_on_or_after(&self) -> Option<&DateTime<Utc>> {
        self.window.not_on_or_after()
    }

    /// `Recipient`.
    #[must_use]
    pub fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref()
    }

    /// `InResponseTo`.
    #[must_use]
    pub fn in_response_to(&self) -> Option<&str> {
        self.in_response_to.as_deref()
    }

    /// `Address`.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Namespace-qualified attributes.
    #[must_use]
    pub const fn attributes(&self) -> &ForeignAttributes {
        &self.attributes
    }

    /// Child elements in document order.
    pub fn content(&self) -> impl Iterator<Item = &Chunk> {
        self.content.iter()
    }
}

impl SamlElement for SubjectConfirmationData {
    const NAMESPACE: &'static str = SAML_NS;
    const LOCAL_NAME: &'static str = "SubjectConfirmationData";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let mut data = Self {
            window: ValidityWindow::read(element)?,
            ..Self::new()
        };
        if let Some(recipient) = element.attribute("Recipient") {
            data = data.with_recipient(recipient)?;
        }
        if let Some(request_id) = element.attribute("InResponseTo") {
            data = data.with_in_response_to(request_id)?;
        }
        if let Some(address) = element.attribute("Address") {
            data = data.with_address(address)?;
        }
        data.attributes = ForeignAttributes::read(element, SAML_NS);
        let (_, content) = CONFIRMATION_DATA_CHILDREN.resolve_all(element.child_elements())?;
        data.content = content;
        Ok(data)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        self.window.write(&mut element);
        element.set_optional_attribute("Recipient", self.recipient.as_deref());
        element.set_optional_attribute("InResponseTo", self.in_response_to.as_deref());
        element.set_optional_attribute("Address", self.address.as_deref());
        self.attributes.write(&mut element);
        self.content.weave_into(&mut element);
        element
    }
}

enum ConfirmationChild {
    NameId(NameId),
    Data(SubjectConfirmationData),
}

static CONFIRMATION_CHILDREN: DispatchTable<ConfirmationChild> = DispatchTable {
    context: "SubjectConfirmation",
    namespace: SAML_NS,
    policy: ChildPolicy::Closed,
    entries: &[
        known_child!(NameId => ConfirmationChild::NameId),
        known_child!(SubjectConfirmationData => ConfirmationChild::Data),
    ],
};

/// How the relying party confirms the subject (`saml:SubjectConfirmation`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectConfirmation {
    method: String,
    name_id: Option<NameId>,
    data: Option<SubjectConfirmationData>,
    unknown: UnknownChildren,
}

impl SubjectConfirmation {
    /// Bearer confirmation method.
    pub const BEARER: &'static str = "urn:oasis:names:tc:SAML:2.0:cm:bearer";
    /// Holder-of-key confirmation method.
    pub const HOLDER_OF_KEY: &'static str = "urn:oasis:names:tc:SAML:2.0:cm:holder-of-key";
    /// Sender-vouches confirmation method.
    pub const SENDER_VOUCHES: &'static str = "urn:oasis:names:tc:SAML:2.0:cm:sender-vouches";

    /// Creates a confirmation with `method`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `method` is not a URI.
    pub fn new(method: impl Into<String>) -> SamlResult<Self> {
        let method = method.into();
        require_uri("Method", &method)?;
        Ok(Self {
            method,
            name_id: None,
            data: None,
            unknown: UnknownChildren::default(),
        })
    }

    /// A bearer confirmation.
    #[must_use]
    pub fn bearer() -> Self {
        Self {
            method: Self::BEARER.to_string(),
            name_id: None,
            data: None,
            unknown: UnknownChildren::default(),
        }
    }

    /// Sets the identifier of the confirming party.
    #[must_use]
    pub fn with_name_id(mut self, name_id: NameId) -> Self {
        self.name_id = Some(name_id);
        self
    }

    /// Sets the confirmation data.
    #[must_use]
    pub fn with_data(mut self, data: SubjectConfirmationData) -> Self {
        self.data = Some(data);
        self
    }

    /// The `Method` URI.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns true for bearer confirmations.
    #[must_use]
    pub fn is_bearer(&self) -> bool {
        self.method == Self::BEARER
    }

    /// The confirming party.
    #[must_use]
    pub const fn name_id(&self) -> Option<&NameId> {
        self.name_id.as_ref()
    }

    /// The confirmation data.
    #[must_use]
    pub const fn data(&self) -> Option<&SubjectConfirmationData> {
        self.data.as_ref()
    }
}

impl SamlElement for SubjectConfirmation {
    const NAMESPACE: &'static str = SAML_NS;
    const LOCAL_NAME: &'static str = "SubjectConfirmation";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let mut confirmation = Self::new(required_attribute(element, "Method")?)?;
        let (resolved, unknown) = CONFIRMATION_CHILDREN.resolve_all(element.child_elements())?;
        for child in resolved {
            match child {
                ConfirmationChild::NameId(name_id) => set_once(&mut confirmation.name_id, name_id, "NameID")?,
                ConfirmationChild::Data(data) => {
                    set_once(&mut confirmation.data, data, SubjectConfirmationData::LOCAL_NAME)?;
                }
            }
        }
        confirmation.unknown = unknown;
        Ok(confirmation)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.set_attribute("Method", self.method.as_str());
        if let Some(name_id) = &self.name_id {
            name_id.append_to(&mut element);
        }
        if let Some(data) = &self.data {
            data.append_to(&mut element);
        }
        self.unknown.weave_into(&mut element);
        element
    }
}

enum SubjectChild {
    NameId(NameId),
    Confirmation(SubjectConfirmation),
}

static SUBJECT_CHILDREN: DispatchTable<SubjectChild> = DispatchTable {
    context: "Subject",
    namespace: SAML_NS,
    policy: ChildPolicy::Closed,
    entries: &[
        known_child!(NameId => SubjectChild::NameId),
        known_child!(SubjectConfirmation => SubjectChild::Confirmation),
    ],
};

/// The principal an assertion is about (`saml:Subject`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    name_id: Option<NameId>,
    confirmations: Vec<SubjectConfirmation>,
    unknown: UnknownChildren,
}

impl Subject {
    /// A subject identified by `name_id`.
    #[must_use]
    pub fn new(name_id: NameId) -> Self {
        Self {
            name_id: Some(name_id),
            confirmations: Vec::new(),
            unknown: UnknownChildren::default(),
        }
    }

    /// A subject known only through its confirmations.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `confirmations` is empty.
    pub fn confirmed_by(confirmations: Vec<SubjectConfirmation>) -> SamlResult<Self> {
        require_non_empty_list("SubjectConfirmation", &confirmations)?;
        Ok(Self {
            name_id: None,
            confirmations,
            unknown: UnknownChildren::default(),
        })
    }

    /// Adds a confirmation.
    #[must_use]
    pub fn with_confirmation(mut self, confirmation: SubjectConfirmation) -> Self {
        self.confirmations.push(confirmation);
        self
    }

    /// The subject identifier.
    #[must_use]
    pub const fn name_id(&self) -> Option<&NameId> {
        self.name_id.as_ref()
    }

    /// Confirmations in document order.
    #[must_use]
    pub fn confirmations(&self) -> &[SubjectConfirmation] {
        &self.confirmations
    }

    /// The first bearer confirmation.
    #[must_use]
    pub fn bearer_confirmation(&self) -> Option<&SubjectConfirmation> {
        self.confirmations.iter().find(|c| c.is_bearer())
    }
}

impl SamlElement for Subject {
    const NAMESPACE: &'static str = SAML_NS;
    const LOCAL_NAME: &'static str = "Subject";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let (resolved, unknown) = SUBJECT_CHILDREN.resolve_all(element.child_elements())?;
        let mut name_id = None;
        let mut confirmations = Vec::new();
        for child in resolved {
            match child {
                SubjectChild::NameId(value) => set_once(&mut name_id, value, "NameID")?,
                SubjectChild::Confirmation(confirmation) => confirmations.push(confirmation),
            }
        }

        let mut subject = match name_id {
            Some(name_id) => Self {
                name_id: Some(name_id),
                confirmations,
                unknown: UnknownChildren::default(),
            },
            None => Self::confirmed_by(confirmations)?,
        };
        subject.unknown = unknown;
        Ok(subject)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        if let Some(name_id) = &self.name_id {
            name_id.append_to(&mut element);
        }
        for confirmation in &self.confirmations {
            confirmation.append_to(&mut element);
        }
        self.unknown.weave_into(&mut element);
        element
    }
}

// ============================================================================
// Conditions
// ============================================================================

static AUDIENCE_CHILDREN: DispatchTable<Audience> = DispatchTable {
    context: "AudienceRestriction",
    namespace: SAML_NS,
    policy: ChildPolicy::Closed,
    entries: &[known_child!(Audience => |audience| audience)],
};

/// Limits an assertion to the listed audiences (`saml:AudienceRestriction`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudienceRestriction {
    audiences: Vec<Audience>,
    unknown: UnknownChildren,
}

impl AudienceRestriction {
    /// Creates the restriction.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `audiences` is empty.
    pub fn new(audiences: Vec<Audience>) -> SamlResult<Self> {
        require_non_empty_list(Audience::LOCAL_NAME, &audiences)?;
        Ok(Self {
            audiences,
            unknown: UnknownChildren::default(),
        })
    }

    /// The audiences.
    #[must_use]
    pub fn audiences(&self) -> &[Audience] {
        &self.audiences
    }

    /// Returns true if `audience` is listed.
    #[must_use]
    pub fn allows(&self, audience: &str) -> bool {
        self.audiences.iter().any(|a| a.value() == audience)
    }
}

impl SamlElement for AudienceRestriction {
    const NAMESPACE: &'static str = SAML_NS;
    const LOCAL_NAME: &'static str = "AudienceRestriction";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let (audiences, unknown) = AUDIENCE_CHILDREN.resolve_all(element.child_elements())?;
        let mut restriction = Self::new(audiences)?;
        restriction.unknown = unknown;
        Ok(restriction)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        for audience in &self.audiences {
            audience.append_to(&mut element);
        }
        self.unknown.weave_into(&mut element);
        element
    }
}

/// Forbids the relying party from caching the assertion (`saml:OneTimeUse`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneTimeUse;

impl SamlElement for OneTimeUse {
    const NAMESPACE: &'static str = SAML_NS;
    const LOCAL_NAME: &'static str = "OneTimeUse";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        Ok(Self)
    }

    fn to_xml(&self) -> XmlElement {
        new_element::<Self>()
    }
}

/// Limits how the assertion may be used to issue further assertions
/// (`saml:ProxyRestriction`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyRestriction {
    count: Option<Lexical<u32>>,
    audiences: Vec<Audience>,
    unknown: UnknownChildren,
}

impl ProxyRestriction {
    /// An unrestricted proxy restriction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of proxy hops.
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(Lexical::new(count));
        self
    }

    /// Adds an audience proxied assertions may target.
    #[must_use]
    pub fn with_audience(mut self, audience: Audience) -> Self {
        self.audiences.push(audience);
        self
    }

    /// The `Count` attribute.
    #[must_use]
    pub fn count(&self) -> Option<u32> {
        self.count.as_ref().map(Lexical::get)
    }

    /// The audiences.
    #[must_use]
    pub fn audiences(&self) -> &[Audience] {
        &self.audiences
    }
}

impl SamlElement for ProxyRestriction {
    const NAMESPACE: &'static str = SAML_NS;
    const LOCAL_NAME: &'static str = "ProxyRestriction";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let count = Lexical::optional(element, "Count")?;
        let (audiences, unknown) = AUDIENCE_CHILDREN.resolve_all(element.child_elements())?;
        Ok(Self {
            count,
            audiences,
            unknown,
        })
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.set_optional_attribute("Count", self.count.as_ref());
        for audience in &self.audiences {
            audience.append_to(&mut element);
        }
        self.unknown.weave_into(&mut element);
        element
    }
}

/// One child of `saml:Conditions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `saml:AudienceRestriction`.
    AudienceRestriction(AudienceRestriction),
    /// `saml:OneTimeUse`.
    OneTimeUse,
    /// `saml:ProxyRestriction`.
    ProxyRestriction(ProxyRestriction),
    /// An extension `saml:Condition` kept verbatim.
    Other(Chunk),
}

static CONDITIONS_CHILDREN: DispatchTable<Condition> = DispatchTable {
    context: "Conditions",
    namespace: SAML_NS,
    policy: ChildPolicy::Closed,
    entries: &[
        known_child!(AudienceRestriction => Condition::AudienceRestriction),
        known_child!(OneTimeUse => |_| Condition::OneTimeUse),
        known_child!(ProxyRestriction => Condition::ProxyRestriction),
        DispatchEntry {
            namespace: SAML_NS,
            local_name: "Condition",
            parse: |element| Ok(Condition::Other(Chunk::from_xml(element))),
        },
    ],
};

/// Validity window and usage restrictions of an assertion
/// (`saml:Conditions`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    window: ValidityWindow,
    conditions: Vec<Condition>,
    unknown: UnknownChildren,
}

impl Conditions {
    /// Conditions with no restrictions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Valid from now for `minutes`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] unless `minutes` is positive.
    pub fn with_validity(self, minutes: i64) -> SamlResult<Self> {
        let now = Utc::now();
        self.with_window(Some(now), Some(now + Duration::minutes(minutes)))
    }

    /// Sets `NotBefore` and `NotOnOrAfter`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if the window is empty.
    pub fn with_window(
        mut self,
        not_before: Option<DateTime<Utc>>,
        not_on_or_after: Option<DateTime<Utc>>,
    ) -> SamlResult<Self> {
        self.window = ValidityWindow::new(not_before, not_on_or_after)?;
        Ok(self)
    }

    /// Adds `audience` to the first audience restriction, creating one if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `audience` is not a URI.
    pub fn with_audience(mut self, audience: impl Into<String>) -> SamlResult<Self> {
        let audience = Audience::new(audience)?;
        let existing = self.conditions.iter_mut().find_map(|condition| match condition {
            Condition::AudienceRestriction(restriction) => Some(restriction),
            _ => None,
        });
        match existing {
            Some(restriction) => restriction.audiences.push(audience),
            None => self
                .conditions
                .push(Condition::AudienceRestriction(AudienceRestriction::new(vec![audience])?)),
        }
        Ok(self)
    }

    /// Adds an audience restriction.
    #[must_use]
    pub fn with_audience_restriction(mut self, restriction: AudienceRestriction) -> Self {
        self.conditions.push(Condition::AudienceRestriction(restriction));
        self
    }

    /// Marks the assertion for one-time use.
    #[must_use]
    pub fn one_time_use(mut self) -> Self {
        if !self.is_one_time_use() {
            self.conditions.push(Condition::OneTimeUse);
        }
        self
    }

    /// Sets the proxy restriction, replacing any existing one.
    #[must_use]
    pub fn with_proxy_restriction(mut self, restriction: ProxyRestriction) -> Self {
        self.conditions
            .retain(|condition| !matches!(condition, Condition::ProxyRestriction(_)));
        self.conditions.push(Condition::ProxyRestriction(restriction));
        self
    }

    /// Adds an extension condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Chunk) -> Self {
        self.conditions.push(Condition::Other(condition));
        self
    }

    /// `NotBefore`.
    #[must_use]
    pub fn not_before(&self) -> Option<&DateTime<Utc>> {
        self.window.not_before()
    }

    /// `NotOnOrAfter`.
    #[must_use]
    pub fn not_on_or_after(&self) -> Option<&DateTime<Utc>> {
        self.window.not_on_or_after()
    }

    /// Conditions in document order.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Audience restrictions in document order.
    pub fn audience_restrictions(&self) -> impl Iterator<Item = &AudienceRestriction> {
        self.conditions.iter().filter_map(|condition| match condition {
            Condition::AudienceRestriction(restriction) => Some(restriction),
            _ => None,
        })
    }

    /// Returns true if `OneTimeUse` is present.
    #[must_use]
    pub fn is_one_time_use(&self) -> bool {
        self.conditions.iter().any(|c| matches!(c, Condition::OneTimeUse))
    }

    /// The proxy restriction.
    #[must_use]
    pub fn proxy_restriction(&self) -> Option<&ProxyRestriction> {
        self.conditions.iter().find_map(|condition| match condition {
            Condition::ProxyRestriction(restriction) => Some(restriction),
            _ => None,
        })
    }

    /// Returns true if `now` falls inside the validity window.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.window.contains(now)
    }

    /// Returns true if every audience restriction lists `audience`.
    #[must_use]
    pub fn allows_audience(&self, audience: &str) -> bool {
        self.audience_restrictions().all(|restriction| restriction.allows(audience))
    }
}

impl SamlElement for Conditions {
    const NAMESPACE: &'static str = SAML_NS;
    const LOCAL_NAME: &'static str = "Conditions";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let mut conditions = Self {
            window: ValidityWindow::read(element)?,
            ..Self::new()
        };
        let (resolved, unknown) = CONDITIONS_CHILDREN.resolve_all(element.child_elements())?;

        let mut one_time_use = None;
        let mut proxy = None;
        for condition in &resolved {
            match condition {
                Condition::OneTimeUse => set_once(&mut one_time_use, (), OneTimeUse::LOCAL_NAME)?,
                Condition::ProxyRestriction(_) => set_once(&mut proxy, (), ProxyRestriction::LOCAL_NAME)?,
                Condition::AudienceRestriction(_) | Condition::Other(_) => {}
            }
        }
        conditions.conditions = resolved;
        conditions.unknown = unknown;
        Ok(conditions)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        self.window.write(&mut element);
        for condition in &self.conditions {
            match condition {
                Condition::AudienceRestriction(restriction) => {
                    restriction.append_to(&mut element);
                }
                Condition::OneTimeUse => {
                    OneTimeUse.append_to(&mut element);
                }
                Condition::ProxyRestriction(restriction) => {
                    restriction.append_to(&mut element);
                }
                Condition::Other(chunk) => {
                    chunk.append_to(&mut element);
                }
            }
        }
        self.unknown.weave_into(&mut element);
        element
    }
}

// ============================================================================
// Authentication statement
// ============================================================================

/// Where the subject authenticated from (`saml:SubjectLocality`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectLocality {
    address: Option<String>,
    dns_name: Option<String>,
}

impl SubjectLocality {
    /// Creates the locality.
    #[must_use]
    pub fn new(address: Option<String>, dns_name: Option<String>) -> Self {
        Self { address, dns_name }
    }

    /// The network address.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// The DNS name.
    #[must_use]
    pub fn dns_name(&self) -> Option<&str> {
        self.dns_name.as_deref()
    }
}

impl SamlElement for SubjectLocality {
    const NAMESPACE: &'static str = SAML_NS;
    const LOCAL_NAME: &'static str = "SubjectLocality";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        Ok(Self::new(
            element.attribute("Address").map(str::to_string),
            element.attribute("DNSName").map(str::to_string),
        ))
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.set_optional_attribute("Address", self.address.as_deref());
        element.set_optional_attribute("DNSName", self.dns_name.as_deref());
        element
    }
}

/// The declaration half of an authentication context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthnContextDeclaration {
    /// `saml:AuthnContextDeclRef`.
    Reference(AuthnContextDeclRef),
    /// `saml:AuthnContextDecl`, kept verbatim.
    Value(Chunk),
}

enum AuthnContextChild {
    ClassRef(AuthnContextClassRef),
    Declaration(AuthnContextDeclaration),
    Authority(AuthenticatingAuthority),
}

static AUTHN_CONTEXT_CHILDREN: DispatchTable<AuthnContextChild> = DispatchTable {
    context: "AuthnContext",
    namespace: SAML_NS,
    policy: ChildPolicy::Closed,
    entries: &[
        known_child!(AuthnContextClassRef => AuthnContextChild::ClassRef),
        known_child!(AuthnContextDeclRef => |reference| {
            AuthnContextChild::Declaration(AuthnContextDeclaration::Reference(reference))
        }),
        DispatchEntry {
            namespace: SAML_NS,
            local_name: "AuthnContextDecl",
            parse: |element| {
                Ok(AuthnContextChild::Declaration(AuthnContextDeclaration::Value(
                    Chunk::from_xml(element),
                )))
            },
        },
        known_child!(AuthenticatingAuthority => AuthnContextChild::Authority),
    ],
};

/// How the subject authenticated (`saml:AuthnContext`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthnContext {
    class_ref: Option<AuthnContextClassRef>,
    declaration: Option<AuthnContextDeclaration>,
    authorities: Vec<AuthenticatingAuthority>,
}

impl AuthnContext {
    /// A context naming a well-known class.
    #[must_use]
    pub fn class_ref(class: AuthnContextClass) -> Self {
        Self::with_class_ref(class.into())
    }

    /// A context naming any class.
    #[must_use]
    pub const fn with_class_ref(class_ref: AuthnContextClassRef) -> Self {
        Self {
            class_ref: Some(class_ref),
            declaration: None,
            authorities: Vec::new(),
        }
    }

    /// A context described only by a declaration.
    #[must_use]
    pub const fn with_declaration(declaration: AuthnContextDeclaration) -> Self {
        Self {
            class_ref: None,
            declaration: Some(declaration),
            authorities: Vec::new(),
        }
    }

    /// Adds a declaration to a class-based context.
    #[must_use]
    pub fn and_declaration(mut self, declaration: AuthnContextDeclaration) -> Self {
        self.declaration = Some(declaration);
        self
    }

    /// Adds an authenticating authority.
    #[must_use]
    pub fn with_authority(mut self, authority: AuthenticatingAuthority) -> Self {
        self.authorities.push(authority);
        self
    }

    /// The class reference.
    #[must_use]
    pub const fn class(&self) -> Option<&AuthnContextClassRef> {
        self.class_ref.as_ref()
    }

    /// The declaration.
    #[must_use]
    pub const fn declaration(&self) -> Option<&AuthnContextDeclaration> {
        self.declaration.as_ref()
    }

    /// Authenticating authorities.
    #[must_use]
    pub fn authorities(&self) -> &[AuthenticatingAuthority] {
        &self.authorities
    }
}

impl SamlElement for AuthnContext {
    const NAMESPACE: &'static str = SAML_NS;
    const LOCAL_NAME: &'static str = "AuthnContext";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let (resolved, _) = AUTHN_CONTEXT_CHILDREN.resolve_all(element.child_elements())?;
        let mut class_ref = None;
        let mut declaration = None;
        let mut authorities = Vec::new();
        for child in resolved {
            match child {
                AuthnContextChild::ClassRef(value) => {
                    set_once(&mut class_ref, value, AuthnContextClassRef::LOCAL_NAME)?;
                }
                AuthnContextChild::Declaration(value) => set_once(&mut declaration, value, "AuthnContextDecl")?,
                AuthnContextChild::Authority(authority) => authorities.push(authority),
            }
        }

        let mut context = match (class_ref, declaration) {
            (Some(class_ref), declaration) => Self {
                class_ref: Some(class_ref),
                declaration,
                authorities: Vec::new(),
            },
            (None, Some(declaration)) => Self::with_declaration(declaration),
            (None, None) => {
                return Err(SamlError::validation(
                    Self::LOCAL_NAME,
                    "requires a class reference or a declaration",
                ))
            }
        };
        context.authorities = authorities;
        Ok(context)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        if let Some(class_ref) = &self.class_ref {
            class_ref.append_to(&mut element);
        }
        match &self.declaration {
            Some(AuthnContextDeclaration::Reference(reference)) => {
                reference.append_to(&mut element);
            }
            Some(AuthnContextDeclaration::Value(chunk)) => {
                chunk.append_to(&mut element);
            }
            None => {}
        }
        for authority in &self.authorities {
            authority.append_to(&mut element);
        }
        element
    }
}

enum AuthnStatementChild {
    Locality(SubjectLocality),
    Context(AuthnContext),
}

static AUTHN_STATEMENT_CHILDREN: DispatchTable<AuthnStatementChild> = DispatchTable {
    context: "AuthnStatement",
    namespace: SAML_NS,
    policy: ChildPolicy::Closed,
    entries: &[
        known_child!(SubjectLocality => AuthnStatementChild::Locality),
        known_child!(AuthnContext => AuthnStatementChild::Context),
    ],
};

/// States that the subject authenticated (`saml:AuthnStatement`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthnStatement {
    authn_instant: Instant,
    session_index: Option<String>,
    session_not_on_or_after: Option<Instant>,
    subject_locality: Option<SubjectLocality>,
    authn_context: AuthnContext,
}

impl AuthnStatement {
    /// A statement for authentication with `class` that happened now, with a
    /// fresh session index.
    #[must_use]
    pub fn new(class: AuthnContextClass) -> Self {
        Self {
            authn_instant: Lexical::new(Utc::now()),
            session_index: Some(format!("_{}", uuid::Uuid::new_v4())),
            session_not_on_or_after: None,
            subject_locality: None,
            authn_context: AuthnContext::class_ref(class),
        }
    }

    /// A statement for an arbitrary context.
    #[must_use]
    pub const fn with_context(authn_instant: DateTime<Utc>, authn_context: AuthnContext) -> Self {
        Self {
            authn_instant: Lexical::new(authn_instant),
            session_index: None,
            session_not_on_or_after: None,
            subject_locality: None,
            authn_context,
        }
    }

    /// Sets `SessionIndex`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `index` is empty.
    pub fn with_session_index(mut self, index: impl Into<String>) -> SamlResult<Self> {
        let index = index.into();
        require_non_empty("SessionIndex", &index)?;
        self.session_index = Some(index);
        Ok(self)
    }

    /// Ends the session `minutes` after authentication.
    #[must_use]
    pub fn with_session_timeout(mut self, minutes: i64) -> Self {
        self.session_not_on_or_after = Some(Lexical::new(self.authn_instant.get() + Duration::minutes(minutes)));
        self
    }

    /// Sets the subject locality.
    #[must_use]
    pub fn with_locality(mut self, locality: SubjectLocality) -> Self {
        self.subject_locality = Some(locality);
        self
    }

    /// `AuthnInstant`.
    #[must_use]
    pub const fn authn_instant(&self) -> &DateTime<Utc> {
        self.authn_instant.value()
    }

    /// `SessionIndex`.
    #[must_use]
    pub fn session_index(&self) -> Option<&str> {
        self.session_index.as_deref()
    }

    /// `SessionNotOnOrAfter`.
    #[must_use]
    pub fn session_not_on_or_after(&self) -> Option<&DateTime<Utc>> {
        self.session_not_on_or_after.as_ref().map(Lexical::value)
    }

    /// The subject locality.
    #[must_use]
    pub const fn subject_locality(&self) -> Option<&SubjectLocality> {
        self.subject_locality.as_ref()
    }

    /// The authentication context.
    #[must_use]
    pub const fn authn_context(&self) -> &AuthnContext {
        &self.authn_context
    }
}

impl SamlElement for AuthnStatement {
    const NAMESPACE: &'static str = SAML_NS;
    const LOCAL_NAME: &'static str = "AuthnStatement";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let authn_instant: Instant = Lexical::required(element, "AuthnInstant")?;
        let children: Vec<&XmlElement> = element.child_elements().collect();
        require_child(children.iter().copied(), SAML_NS, AuthnContext::LOCAL_NAME)?;

        let (resolved, _) = AUTHN_STATEMENT_CHILDREN.resolve_all(children)?;
        let mut locality = None;
        let mut context = None;
        for child in resolved {
            match child {
                AuthnStatementChild::Locality(value) => set_once(&mut locality, value, SubjectLocality::LOCAL_NAME)?,
                AuthnStatementChild::Context(value) => set_once(&mut context, value, AuthnContext::LOCAL_NAME)?,
            }
        }
        let context = context.ok_or_else(|| SamlError::validation(AuthnContext::LOCAL_NAME, "is required"))?;

        let mut statement = Self::with_context(authn_instant.get(), context);
        statement.authn_instant = authn_instant;
        if let Some(index) = element.attribute("SessionIndex") {
            statement = statement.with_session_index(index)?;
        }
        statement.session_not_on_or_after = Lexical::optional(element, "SessionNotOnOrAfter")?;
        statement.subject_locality = locality;
        Ok(statement)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.set_attribute("AuthnInstant", self.authn_instant.to_string());
        element.set_optional_attribute("SessionIndex", self.session_index.as_deref());
        element.set_optional_attribute(
            "SessionNotOnOrAfter",
            self.session_not_on_or_after.as_ref(),
        );
        if let Some(locality) = &self.subject_locality {
            locality.append_to(&mut element);
        }
        self.authn_context.append_to(&mut element);
        element
    }
}

// ============================================================================
// Attribute statement
// ============================================================================

static ATTRIBUTE_STATEMENT_CHILDREN: DispatchTable<Attribute> = DispatchTable {
    context: "AttributeStatement",
    namespace: SAML_NS,
    policy: ChildPolicy::Closed,
    entries: &[known_child!(Attribute => |attribute| attribute)],
};

/// Attributes asserted about the subject (`saml:AttributeStatement`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeStatement {
    attributes: Vec<Attribute>,
    unknown: UnknownChildren,
}

impl AttributeStatement {
    /// Creates the statement.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `attributes` is empty.
    pub fn new(attributes: Vec<Attribute>) -> SamlResult<Self> {
        require_non_empty_list(Attribute::LOCAL_NAME, &attributes)?;
        Ok(Self {
            attributes,
            unknown: UnknownChildren::default(),
        })
    }

    /// Builds a statement of text-valued attributes from name/values pairs.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] for an empty name or an empty set.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, Vec<String>)>) -> SamlResult<Self> {
        let attributes = pairs
            .into_iter()
            .map(|(name, values)| Attribute::multi(name, values))
            .collect::<SamlResult<Vec<_>>>()?;
        Self::new(attributes)
    }

    /// The attributes.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Finds an attribute by `Name`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.name() == name)
    }
}

impl SamlElement for AttributeStatement {
    const NAMESPACE: &'static str = SAML_NS;
    const LOCAL_NAME: &'static str = "AttributeStatement";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let (attributes, unknown) = ATTRIBUTE_STATEMENT_CHILDREN.resolve_all(element.child_elements())?;
        let mut statement = Self::new(attributes)?;
        statement.unknown = unknown;
        Ok(statement)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        for attribute in &self.attributes {
            attribute.append_to(&mut element);
        }
        self.unknown.weave_into(&mut element);
        element
    }
}

// ============================================================================
// Assertion
// ============================================================================

/// A statement carried by an assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `saml:AuthnStatement`.
    Authn(AuthnStatement),
    /// `saml:AttributeStatement`.
    Attribute(AttributeStatement),
    /// `saml:AuthzDecisionStatement` or an extension `saml:Statement`, kept
    /// verbatim.
    Other(Chunk),
}

impl Statement {
    fn append_to(&self, element: &mut XmlElement) {
        match self {
            Self::Authn(statement) => {
                statement.append_to(element);
            }
            Self::Attribute(statement) => {
                statement.append_to(element);
            }
            Self::Other(chunk) => {
                chunk.append_to(element);
            }
        }
    }
}

enum AssertionChild {
    Issuer(Issuer),
    Subject(Subject),
    Conditions(Conditions),
    Advice(Chunk),
    Statement(Statement),
}

fn verbatim_statement(element: &XmlElement) -> SamlResult<AssertionChild> {
    Ok(AssertionChild::Statement(Statement::Other(Chunk::from_xml(element))))
}

static ASSERTION_CHILDREN: DispatchTable<AssertionChild> = DispatchTable {
    context: "Assertion",
    namespace: SAML_NS,
    policy: ChildPolicy::Closed,
    entries: &[
        known_child!(Issuer => AssertionChild::Issuer),
        known_child!(Subject => AssertionChild::Subject),
        known_child!(Conditions => AssertionChild::Conditions),
        DispatchEntry {
            namespace: SAML_NS,
            local_name: "Advice",
            parse: |element| Ok(AssertionChild::Advice(Chunk::from_xml(element))),
        },
        known_child!(AuthnStatement => |s| AssertionChild::Statement(Statement::Authn(s))),
        known_child!(AttributeStatement => |s| AssertionChild::Statement(Statement::Attribute(s))),
        DispatchEntry {
            namespace: SAML_NS,
            local_name: "AuthzDecisionStatement",
            parse: verbatim_statement,
        },
        DispatchEntry {
            namespace: SAML_NS,
            local_name: "Statement",
            parse: verbatim_statement,
        },
    ],
};

/// A SAML assertion (`saml:Assertion`).
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    version: String,
    id: String,
    issue_instant: Instant,
    issuer: Issuer,
    signature: SignatureSlot,
    subject: Option<Subject>,
    conditions: Option<Conditions>,
    advice: Option<Chunk>,
    statements: Vec<Statement>,
    unknown: UnknownChildren,
}

impl Assertion {
    /// Creates an assertion issued now by `issuer` with a fresh ID.
    #[must_use]
    pub fn new(issuer: Issuer) -> Self {
        Self {
            version: SAML_VERSION.to_string(),
            id: format!("_{}", uuid::Uuid::new_v4()),
            issue_instant: Lexical::new(Utc::now()),
            issuer,
            signature: SignatureSlot::unsigned(),
            subject: None,
            conditions: None,
            advice: None,
            statements: Vec::new(),
            unknown: UnknownChildren::default(),
        }
    }

    /// Replaces the generated ID.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `id` is empty.
    pub fn with_id(mut self, id: impl Into<String>) -> SamlResult<Self> {
        let id = id.into();
        require_non_empty("ID", &id)?;
        self.id = id;
        Ok(self)
    }

    /// Sets `IssueInstant`.
    #[must_use]
    pub fn with_issue_instant(mut self, instant: DateTime<Utc>) -> Self {
        self.issue_instant = Lexical::new(instant);
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Sets the conditions.
    #[must_use]
    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Sets the advice.
    #[must_use]
    pub fn with_advice(mut self, advice: Chunk) -> Self {
        self.advice = Some(advice);
        self
    }

    /// Adds a statement.
    #[must_use]
    pub fn with_statement(mut self, statement: Statement) -> Self {
        self.statements.push(statement);
        self
    }

    /// Adds an authentication statement.
    #[must_use]
    pub fn with_authn_statement(self, statement: AuthnStatement) -> Self {
        self.with_statement(Statement::Authn(statement))
    }

    /// Adds an attribute statement.
    #[must_use]
    pub fn with_attribute_statement(self, statement: AttributeStatement) -> Self {
        self.with_statement(Statement::Attribute(statement))
    }

    /// The `Version` attribute.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The `ID` attribute.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// `IssueInstant`.
    #[must_use]
    pub const fn issue_instant(&self) -> &DateTime<Utc> {
        self.issue_instant.value()
    }

    /// The issuer.
    #[must_use]
    pub const fn issuer(&self) -> &Issuer {
        &self.issuer
    }

    /// The subject.
    #[must_use]
    pub const fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    /// The conditions.
    #[must_use]
    pub const fn conditions(&self) -> Option<&Conditions> {
        self.conditions.as_ref()
    }

    /// The advice, kept verbatim.
    #[must_use]
    pub const fn advice(&self) -> Option<&Chunk> {
        self.advice.as_ref()
    }

    /// Statements in document order.
    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Authentication statements.
    pub fn authn_statements(&self) -> impl Iterator<Item = &AuthnStatement> {
        self.statements.iter().filter_map(|statement| match statement {
            Statement::Authn(statement) => Some(statement),
            _ => None,
        })
    }

    /// Attribute statements.
    pub fn attribute_statements(&self) -> impl Iterator<Item = &AttributeStatement> {
        self.statements.iter().filter_map(|statement| match statement {
            Statement::Attribute(statement) => Some(statement),
            _ => None,
        })
    }

    /// Every asserted attribute across attribute statements.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attribute_statements().flat_map(AttributeStatement::attributes)
    }

    /// Checks the version, the validity window at `now` and the audience
    /// restrictions against `audience`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] naming the first check that fails.
    pub fn validate(&self, audience: &str, now: DateTime<Utc>) -> SamlResult<()> {
        if self.version != SAML_VERSION {
            return Err(SamlError::validation(
                "Version",
                format!("unsupported version '{}'", self.version),
            ));
        }

        let Some(conditions) = &self.conditions else {
            return Ok(());
        };
        if let Some(not_before) = conditions.not_before() {
            if now < *not_before {
                return Err(SamlError::validation("NotBefore", "assertion is not yet valid"));
            }
        }
        if let Some(not_on_or_after) = conditions.not_on_or_after() {
            if now >= *not_on_or_after {
                return Err(SamlError::validation("NotOnOrAfter", "assertion has expired"));
            }
        }
        if !conditions.allows_audience(audience) {
            return Err(SamlError::validation(
                Audience::LOCAL_NAME,
                format!("'{audience}' is not an intended audience"),
            ));
        }
        Ok(())
    }
}

impl Signable for Assertion {
    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn signature_slot(&self) -> &SignatureSlot {
        &self.signature
    }

    fn signature_slot_mut(&mut self) -> &mut SignatureSlot {
        &mut self.signature
    }

    fn to_unsigned_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.set_attribute("Version", self.version.as_str());
        element.set_attribute("ID", self.id.as_str());
        element.set_attribute("IssueInstant", self.issue_instant.to_string());
        self.issuer.append_to(&mut element);
        if let Some(subject) = &self.subject {
            subject.append_to(&mut element);
        }
        if let Some(conditions) = &self.conditions {
            conditions.append_to(&mut element);
        }
        if let Some(advice) = &self.advice {
            advice.append_to(&mut element);
        }
        for statement in &self.statements {
            statement.append_to(&mut element);
        }
        self.unknown.weave_into(&mut element);
        element
    }
}

impl SamlElement for Assertion {
    const NAMESPACE: &'static str = SAML_NS;
    const LOCAL_NAME: &'static str = "Assertion";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let version = required_attribute(element, "Version")?;
        let id = required_attribute(element, "ID")?;
        let issue_instant: Instant = Lexical::required(element, "IssueInstant")?;

        let (signature, children) = extract_signature(element)?;
        if !children.first().map_or(false, |first| first.is(SAML_NS, Issuer::LOCAL_NAME)) {
            return Err(SamlError::validation(Issuer::LOCAL_NAME, "must be the first child"));
        }

        let (resolved, unknown) = ASSERTION_CHILDREN.resolve_all(children)?;
        let mut issuer = None;
        let mut subject = None;
        let mut conditions = None;
        let mut advice = None;
        let mut statements = Vec::new();
        for child in resolved {
            match child {
                AssertionChild::Issuer(value) => set_once(&mut issuer, value, Issuer::LOCAL_NAME)?,
                AssertionChild::Subject(value) => set_once(&mut subject, value, Subject::LOCAL_NAME)?,
                AssertionChild::Conditions(value) => set_once(&mut conditions, value, Conditions::LOCAL_NAME)?,
                AssertionChild::Advice(value) => set_once(&mut advice, value, "Advice")?,
                AssertionChild::Statement(statement) => statements.push(statement),
            }
        }
        let issuer = issuer.ok_or_else(|| SamlError::validation(Issuer::LOCAL_NAME, "is required"))?;

        let mut assertion = Self::new(issuer).with_id(id)?;
        assertion.issue_instant = issue_instant;
        require_non_empty("Version", version)?;
        assertion.version = version.to_string();
        assertion.signature = signature;
        assertion.subject = subject;
        assertion.conditions = conditions;
        assertion.advice = advice;
        assertion.statements = statements;
        assertion.unknown = unknown;
        Ok(assertion)
    }

    fn to_xml(&self) -> XmlElement {
        self.to_signed_xml()
    }
}
