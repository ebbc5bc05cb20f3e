//! `md:Organization` and `md:ContactPerson`.

use std::fmt;

use crate::dispatch::{known_child, ChildPolicy, DispatchTable, UnknownChildren};
use crate::element::{expect, new_element, SamlElement};
use crate::error::{SamlError, SamlResult};
use crate::types::MD_NS;
use crate::validation::{require_child, require_non_empty_list, required_attribute, set_once};
use crate::xml::XmlElement;

use super::{
    Company, EmailAddress, Extensions, ForeignAttributes, GivenName, OrganizationDisplayName,
    OrganizationName, OrganizationUrl, SurName, TelephoneNumber,
};

enum OrganizationChild {
    Extensions(Extensions),
    Name(OrganizationName),
    DisplayName(OrganizationDisplayName),
    Url(OrganizationUrl),
}

static ORGANIZATION_CHILDREN: DispatchTable<OrganizationChild> = DispatchTable {
    context: "Organization",
    namespace: MD_NS,
    policy: ChildPolicy::Closed,
    entries: &[
        known_child!(Extensions => OrganizationChild::Extensions),
        known_child!(OrganizationName => OrganizationChild::Name),
        known_child!(OrganizationDisplayName => OrganizationChild::DisplayName),
        known_child!(OrganizationUrl => OrganizationChild::Url),
    ],
};

/// The organization responsible for an entity or role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    extensions: Option<Extensions>,
    names: Vec<OrganizationName>,
    display_names: Vec<OrganizationDisplayName>,
    urls: Vec<OrganizationUrl>,
    attributes: ForeignAttributes,
    unknown: UnknownChildren,
}

impl Organization {
    /// Creates the element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if any of the three lists is empty.
    pub fn new(
        names: Vec<OrganizationName>,
        display_names: Vec<OrganizationDisplayName>,
        urls: Vec<OrganizationUrl>,
    ) -> SamlResult<Self> {
        require_non_empty_list("OrganizationName", &names)?;
        require_non_empty_list("OrganizationDisplayName", &display_names)?;
        require_non_empty_list("OrganizationURL", &urls)?;
        Ok(Self {
            extensions: None,
            names,
            display_names,
            urls,
            attributes: ForeignAttributes::new(),
            unknown: UnknownChildren::default(),
        })
    }

    /// Sets the extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Legal names, one per language.
    #[must_use]
    pub fn names(&self) -> &[OrganizationName] {
        &self.names
    }

    /// Display names, one per language.
    #[must_use]
    pub fn display_names(&self) -> &[OrganizationDisplayName] {
        &self.display_names
    }

    /// Web pages, one per language.
    #[must_use]
    pub fn urls(&self) -> &[OrganizationUrl] {
        &self.urls
    }

    /// The display name for `lang`, falling back to the first one.
    #[must_use]
    pub fn display_name(&self, lang: &str) -> &str {
        self.display_names
            .iter()
            .find(|name| name.lang() == lang)
            .or_else(|| self.display_names.first())
            .map_or("", |name| name.value())
    }

    /// Extensions.
    #[must_use]
    pub const fn extensions(&self) -> Option<&Extensions> {
        self.extensions.as_ref()
    }

    /// Extension attributes.
    #[must_use]
    pub const fn attributes(&self) -> &ForeignAttributes {
        &self.attributes
    }
}

impl SamlElement for Organization {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = "Organization";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        for required in ["OrganizationName", "OrganizationDisplayName", "OrganizationURL"] {
            require_child(element.child_elements(), MD_NS, required)?;
        }

        let (children, unknown) = ORGANIZATION_CHILDREN.resolve_all(element.child_elements())?;
        let mut extensions = None;
        let mut names = Vec::new();
        let mut display_names = Vec::new();
        let mut urls = Vec::new();
        for child in children {
            match child {
                OrganizationChild::Extensions(ext) => set_once(&mut extensions, ext, "Extensions")?,
                OrganizationChild::Name(name) => names.push(name),
                OrganizationChild::DisplayName(name) => display_names.push(name),
                OrganizationChild::Url(url) => urls.push(url),
            }
        }

        let mut organization = Self::new(names, display_names, urls)?;
        organization.extensions = extensions;
        organization.attributes = ForeignAttributes::read(element, MD_NS);
        organization.unknown = unknown;
        Ok(organization)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        self.attributes.write(&mut element);
        if let Some(extensions) = &self.extensions {
            extensions.append_to(&mut element);
        }
        for name in &self.names {
            name.append_to(&mut element);
        }
        for name in &self.display_names {
            name.append_to(&mut element);
        }
        for url in &self.urls {
            url.append_to(&mut element);
        }
        self.unknown.weave_into(&mut element);
        element
    }
}

/// The `contactType` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactType {
    /// Technical contact.
    Technical,
    /// User support.
    Support,
    /// Administrative contact.
    Administrative,
    /// Billing contact.
    Billing,
    /// Anything else.
    Other,
}

impl ContactType {
    /// Returns the attribute value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Support => "support",
            Self::Administrative => "administrative",
            Self::Billing => "billing",
            Self::Other => "other",
        }
    }

    /// Parses the attribute value.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] for values outside the enumeration.
    pub fn parse(value: &str) -> SamlResult<Self> {
        match value {
            "technical" => Ok(Self::Technical),
            "support" => Ok(Self::Support),
            "administrative" => Ok(Self::Administrative),
            "billing" => Ok(Self::Billing),
            "other" => Ok(Self::Other),
            other => Err(SamlError::validation(
                "contactType",
                format!("'{other}' is not a contact type"),
            )),
        }
    }
}

impl fmt::Display for ContactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum ContactChild {
    Extensions(Extensions),
    Company(Company),
    GivenName(GivenName),
    SurName(SurName),
    Email(EmailAddress),
    Telephone(TelephoneNumber),
}

static CONTACT_CHILDREN: DispatchTable<ContactChild> = DispatchTable {
    context: "ContactPerson",
    namespace: MD_NS,
    policy: ChildPolicy::Closed,
    entries: &[
        known_child!(Extensions => ContactChild::Extensions),
        known_child!(Company => ContactChild::Company),
        known_child!(GivenName => ContactChild::GivenName),
        known_child!(SurName => ContactChild::SurName),
        known_child!(EmailAddress => ContactChild::Email),
        known_child!(TelephoneNumber => ContactChild::Telephone),
    ],
};

/// A person to contact about an entity or role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactPerson {
    contact_type: ContactType,
    extensions: Option<Extensions>,
    company: Option<Company>,
    given_name: Option<GivenName>,
    sur_name: Option<SurName>,
    email_addresses: Vec<EmailAddress>,
    telephone_numbers: Vec<TelephoneNumber>,
    attributes: ForeignAttributes,
    unknown: UnknownChildren,
}

impl ContactPerson {
    /// Creates an empty contact of the given type.
    #[must_use]
    pub fn new(contact_type: ContactType) -> Self {
        Self {
            contact_type,
            extensions: None,
            company: None,
            given_name: None,
            sur_name: None,
            email_addresses: Vec::new(),
            telephone_numbers: Vec::new(),
            attributes: ForeignAttributes::new(),
            unknown: UnknownChildren::default(),
        }
    }

    /// Sets the extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Sets the company.
    #[must_use]
    pub fn with_company(mut self, company: Company) -> Self {
        self.company = Some(company);
        self
    }

    /// Sets the given name.
    #[must_use]
    pub fn with_given_name(mut self, given_name: GivenName) -> Self {
        self.given_name = Some(given_name);
        self
    }

    /// Sets the surname.
    #[must_use]
    pub fn with_sur_name(mut self, sur_name: SurName) -> Self {
        self.sur_name = Some(sur_name);
        self
    }

    /// Adds an email address.
    #[must_use]
    pub fn with_email_address(mut self, email: EmailAddress) -> Self {
        self.email_addresses.push(email);
        self
    }

    /// Adds a telephone number.
    #[must_use]
    pub fn with_telephone_number(mut self, number: TelephoneNumber) -> Self {
        self.telephone_numbers.push(number);
        self
    }

    /// The `contactType` attribute.
    #[must_use]
    pub const fn contact_type(&self) -> ContactType {
        self.contact_type
    }

    /// Extensions.
    #[must_use]
    pub const fn extensions(&self) -> Option<&Extensions> {
        self.extensions.as_ref()
    }

    /// Company.
    #[must_use]
    pub const fn company(&self) -> Option<&Company> {
        self.company.as_ref()
    }

    /// Given name.
    #[must_use]
    pub const fn given_name(&self) -> Option<&GivenName> {
        self.given_name.as_ref()
    }

    /// Surname.
    #[must_use]
    pub const fn sur_name(&self) -> Option<&SurName> {
        self.sur_name.as_ref()
    }

    /// Email addresses.
    #[must_use]
    pub fn email_addresses(&self) -> &[EmailAddress] {
        &self.email_addresses
    }

    /// Telephone numbers.
    #[must_use]
    pub fn telephone_numbers(&self) -> &[TelephoneNumber] {
        &self.telephone_numbers
    }

    /// Extension attributes.
    #[must_use]
    pub const fn attributes(&self) -> &ForeignAttributes {
        &self.attributes
    }
}

impl SamlElement for ContactPerson {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = "ContactPerson";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let mut contact = Self::new(ContactType::parse(required_attribute(element, "contactType")?)?);
        contact.attributes = ForeignAttributes::read(element, MD_NS);

        let (children, unknown) = CONTACT_CHILDREN.resolve_all(element.child_elements())?;
        for child in children {
            match child {
                ContactChild::Extensions(ext) => set_once(&mut contact.extensions, ext, "Extensions")?,
                ContactChild::Company(company) => set_once(&mut contact.company, company, "Company")?,
                ContactChild::GivenName(name) => set_once(&mut contact.given_name, name, "GivenName")?,
                ContactChild::SurName(name) => set_once(&mut contact.sur_name, name, "SurName")?,
                ContactChild::Email(email) => contact.email_addresses.push(email),
                ContactChild::Telephone(number) => contact.telephone_numbers.push(number),
            }
        }
        contact.unknown = unknown;
        Ok(contact)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.set_attribute("contactType", self.contact_type.as_str());
        self.attributes.write(&mut element);
        if let Some(extensions) = &self.extensions {
            extensions.append_to(&mut element);
        }
        if let Some(company) = &self.company {
            company.append_to(&mut element);
        }
        if let Some(name) = &self.given_name {
            name.append_to(&mut element);
        }
        if let Some(name) = &self.sur_name {
            name.append_to(&mut element);
        }
        for email in &self.email_addresses {
            email.append_to(&mut element);
        }
        for number in &self.telephone_numbers {
            number.append_to(&mut element);
        }
        self.unknown.weave_into(&mut element);
        element
    }
}
