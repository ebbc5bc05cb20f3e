//! `inspect`: summarize a document.

use chrono::Utc;
use samlmd::metadata::{
    Endpoint, EndpointKind, EntityDescriptor, IndexedEndpoint, MetadataDocument, RoleDescriptor,
    SsoDescriptorBase,
};
use samlmd::{Assertion, Signable};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::FileArgs;
use crate::config::OutputFormat;
use crate::document::Document;
use crate::output::{heading, info, output, output_single, warning};

/// One endpoint of one role.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct EndpointRow {
    /// Owning entity.
    #[tabled(rename = "Entity")]
    pub entity_id: String,
    /// Role element name.
    #[tabled(rename = "Role")]
    pub role: String,
    /// Endpoint element name.
    #[tabled(rename = "Service")]
    pub service: String,
    /// Binding URI.
    #[tabled(rename = "Binding")]
    pub binding: String,
    /// Location URI.
    #[tabled(rename = "Location")]
    pub location: String,
    /// Index of indexed endpoints.
    #[tabled(rename = "Index", display_with = "display_index")]
    pub index: Option<u16>,
}

fn display_index(index: &Option<u16>) -> String {
    index.map(|i| i.to_string()).unwrap_or_default()
}

/// Summary of one entity.
#[derive(Debug, Clone, Serialize)]
pub struct EntitySummary {
    /// `entityID`.
    pub entity_id: String,
    /// Role element names, or `AffiliationDescriptor`.
    pub roles: Vec<String>,
    /// Whether the entity carries its own signature.
    pub signed: bool,
    /// `validUntil`, if set.
    pub valid_until: Option<String>,
    /// Whether the entity or one of its roles has expired.
    pub expired: bool,
    /// Endpoints of every typed role.
    pub endpoints: Vec<EndpointRow>,
}

/// Summary of a metadata document.
#[derive(Debug, Clone, Serialize)]
pub struct MetadataReport {
    /// Root element name.
    pub root: String,
    /// Whether the root is signed.
    pub signed: bool,
    /// Entities, depth first.
    pub entities: Vec<EntitySummary>,
}

/// One asserted attribute.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct AttributeRow {
    /// `Name`.
    #[tabled(rename = "Name")]
    pub name: String,
    /// Text values joined by commas.
    #[tabled(rename = "Values")]
    pub values: String,
}

/// Summary of an assertion.
#[derive(Debug, Clone, Serialize)]
pub struct AssertionReport {
    /// `ID`.
    pub id: String,
    /// Issuer entity ID.
    pub issuer: String,
    /// Subject name identifier.
    pub subject: Option<String>,
    /// Whether the assertion is signed.
    pub signed: bool,
    /// `NotOnOrAfter` of the conditions.
    pub not_on_or_after: Option<String>,
    /// Audiences across all restrictions.
    pub audiences: Vec<String>,
    /// Asserted attributes.
    pub attributes: Vec<AttributeRow>,
}

/// Runs `inspect`.
pub fn run_inspect(args: FileArgs, format: OutputFormat) -> crate::CliResult<()> {
    match Document::load(&args.file)? {
        Document::Metadata(document) => {
            let root = match &document {
                MetadataDocument::Entity(_) => "EntityDescriptor",
                MetadataDocument::Entities(_) => "EntitiesDescriptor",
            };
            let report = MetadataReport {
                root: root.to_string(),
                signed: document.root().is_signed(),
                entities: document.entities().map(summarize_entity).collect(),
            };
            print_metadata(&report, format)
        }
        Document::Assertion(assertion) => {
            let report = summarize_assertion(&assertion);
            print_assertion(&report, format)
        }
    }
}

fn print_metadata(report: &MetadataReport, format: OutputFormat) -> crate::CliResult<()> {
    if format != OutputFormat::Table {
        return output_single(report, format);
    }

    info(&format!(
        "{} with {} entit{}{}",
        report.root,
        report.entities.len(),
        if report.entities.len() == 1 { "y" } else { "ies" },
        if report.signed { ", signed" } else { "" }
    ));
    for entity in &report.entities {
        println!();
        heading(&entity.entity_id);
        println!("roles: {}", entity.roles.join(", "));
        if let Some(valid_until) = &entity.valid_until {
            println!("valid until: {valid_until}");
        }
        if entity.expired {
            warning("metadata has expired");
        }
        output(&entity.endpoints, report, format, "No endpoints.")?;
    }
    Ok(())
}

fn print_assertion(report: &AssertionReport, format: OutputFormat) -> crate::CliResult<()> {
    if format != OutputFormat::Table {
        return output_single(report, format);
    }

    heading(&format!("Assertion {}", report.id));
    println!("issuer: {}", report.issuer);
    if let Some(subject) = &report.subject {
        println!("subject: {subject}");
    }
    if let Some(not_on_or_after) = &report.not_on_or_after {
        println!("not on or after: {not_on_or_after}");
    }
    if !report.audiences.is_empty() {
        println!("audiences: {}", report.audiences.join(", "));
    }
    println!("signed: {}", report.signed);
    output(&report.attributes, report, format, "No attributes.")
}

/// Builds the summary of one entity.
pub fn summarize_entity(entity: &EntityDescriptor) -> EntitySummary {
    let mut endpoints = Vec::new();
    let roles = match entity.affiliation() {
        Some(_) => vec!["AffiliationDescriptor".to_string()],
        None => entity.roles().iter().map(|role| role.local_name().to_string()).collect(),
    };
    for role in entity.roles() {
        let mut rows = EndpointRows {
            entity_id: entity.entity_id(),
            role: role.local_name(),
            rows: &mut endpoints,
        };
        rows.collect_role(role);
    }

    EntitySummary {
        entity_id: entity.entity_id().to_string(),
        roles,
        signed: entity.is_signed(),
        valid_until: entity.validity().valid_until().map(|t| t.to_rfc3339()),
        expired: entity.is_expired(Utc::now()),
        endpoints,
    }
}

/// Builds the summary of an assertion.
pub fn summarize_assertion(assertion: &Assertion) -> AssertionReport {
    let conditions = assertion.conditions();
    AssertionReport {
        id: assertion.id().to_string(),
        issuer: assertion.issuer().value().to_string(),
        subject: assertion
            .subject()
            .and_then(|subject| subject.name_id())
            .map(|name_id| name_id.value().to_string()),
        signed: assertion.is_signed(),
        not_on_or_after: conditions
            .and_then(|c| c.not_on_or_after())
            .map(|t| t.to_rfc3339()),
        audiences: conditions
            .into_iter()
            .flat_map(|c| c.audience_restrictions())
            .flat_map(|r| r.audiences())
            .map(|a| a.value().to_string())
            .collect(),
        attributes: assertion
            .attributes()
            .map(|attribute| AttributeRow {
                name: attribute.name().to_string(),
                values: attribute.text_values().collect::<Vec<_>>().join(", "),
            })
            .collect(),
    }
}

struct EndpointRows<'a> {
    entity_id: &'a str,
    role: &'a str,
    rows: &'a mut Vec<EndpointRow>,
}

impl EndpointRows<'_> {
    fn collect_role(&mut self, role: &RoleDescriptor) {
        match role {
            RoleDescriptor::IdpSso(idp) => {
                self.sso(idp.sso());
                self.plain(idp.single_sign_on_services());
                self.plain(idp.name_id_mapping_services());
                self.plain(idp.assertion_id_request_services());
            }
            RoleDescriptor::SpSso(sp) => {
                self.sso(sp.sso());
                self.indexed(sp.assertion_consumer_services());
            }
            RoleDescriptor::AttributeAuthority(authority) => {
                self.plain(authority.attribute_services());
                self.plain(authority.assertion_id_request_services());
            }
            RoleDescriptor::AuthnAuthority(authority) => {
                self.plain(authority.authn_query_services());
                self.plain(authority.assertion_id_request_services());
            }
            RoleDescriptor::Pdp(pdp) => {
                self.plain(pdp.authz_services());
                self.plain(pdp.assertion_id_request_services());
            }
            RoleDescriptor::Other(_) => {}
        }
    }

    fn sso(&mut self, sso: &SsoDescriptorBase) {
        self.indexed(sso.artifact_resolution_services());
        self.plain(sso.single_logout_services());
        self.plain(sso.manage_name_id_services());
    }

    fn plain<K: EndpointKind>(&mut self, endpoints: &[Endpoint<K>]) {
        for endpoint in endpoints {
            self.push::<K>(endpoint, None);
        }
    }

    fn indexed<K: EndpointKind>(&mut self, endpoints: &[IndexedEndpoint<K>]) {
        for endpoint in endpoints {
            self.push::<K>(endpoint.endpoint(), Some(endpoint.index()));
        }
    }

    fn push<K: EndpointKind>(&mut self, endpoint: &Endpoint<K>, index: Option<u16>) {
        self.rows.push(EndpointRow {
            entity_id: self.entity_id.to_string(),
            role: self.role.to_string(),
            service: K::LOCAL_NAME.to_string(),
            binding: endpoint.binding().to_string(),
            location: endpoint.location().to_string(),
            index,
        });
    }
}
