//! Namespaces and the URI vocabularies SAML documents draw on.

/// `urn:oasis:names:tc:SAML:2.0:assertion`
pub const SAML_NS: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

/// `urn:oasis:names:tc:SAML:2.0:metadata`
pub const MD_NS: &str = "urn:oasis:names:tc:SAML:2.0:metadata";

/// `urn:oasis:names:tc:SAML:2.0:protocol`
pub const SAMLP_NS: &str = "urn:oasis:names:tc:SAML:2.0:protocol";

/// XML-DSig namespace.
pub const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Exclusive canonicalization namespace, home of `InclusiveNamespaces`.
pub const EXC_C14N_NS: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// XML Encryption namespace.
pub const XMLENC_NS: &str = "http://www.w3.org/2001/04/xmlenc#";

/// Schema instance namespace, home of `xsi:type` and `xsi:nil`.
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Schema namespace, home of the `xs:string` family of types.
pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// The `xml:` namespace, bound implicitly in every document.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Value of `protocolSupportEnumeration` for SAML 2.0 roles.
pub const SAML20_PROTOCOL: &str = SAMLP_NS;

/// Prefix the writer uses when it has to declare `namespace` itself.
#[must_use]
pub fn preferred_prefix(namespace: &str) -> Option<&'static str> {
    let prefix = match namespace {
        MD_NS => "md",
        SAML_NS => "saml",
        SAMLP_NS => "samlp",
        XMLDSIG_NS => "ds",
        XMLENC_NS => "xenc",
        EXC_C14N_NS => "ec",
        XSI_NS => "xsi",
        XS_NS => "xs",
        XML_NS => "xml",
        _ => return None,
    };
    Some(prefix)
}

/// A closed set of well-known URIs, each mapped to one variant.
macro_rules! uri_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $uri:expr,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The URI this variant stands for.
            #[must_use]
            pub const fn uri(&self) -> &'static str {
                match self {
                    $(Self::$variant => $uri,)+
                }
            }

            /// The variant for `uri`, if it is one of the known values.
            #[must_use]
            pub fn from_uri(uri: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|variant| variant.uri() == uri)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.uri())
            }
        }
    };
}

pub(crate) use uri_enum;

uri_enum! {
    /// Protocol bindings an endpoint may declare.
    pub enum SamlBinding {
        /// HTTP POST.
        HttpPost = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST",
        /// HTTP Redirect.
        HttpRedirect = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
        /// HTTP Artifact.
        HttpArtifact = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Artifact",
        /// SOAP.
        Soap = "urn:oasis:names:tc:SAML:2.0:bindings:SOAP",
        /// Reverse SOAP (PAOS), used by ECP.
        Paos = "urn:oasis:names:tc:SAML:2.0:bindings:PAOS",
        /// URI binding for assertion requests.
        Uri = "urn:oasis:names:tc:SAML:2.0:bindings:URI",
    }
}

uri_enum! {
    /// Name identifier formats from SAML 1.1 and 2.0.
    #[derive(Default)]
    pub enum StandardNameIdFormat {
        /// No particular format.
        #[default]
        Unspecified = "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified",
        /// `emailAddress`.
        Email = "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress",
        /// X.509 subject distinguished name.
        X509SubjectName = "urn:oasis:names:tc:SAML:1.1:nameid-format:X509SubjectName",
        /// Domain-qualified Windows account name.
        WindowsDomainQualifiedName = "urn:oasis:names:tc:SAML:1.1:nameid-format:WindowsDomainQualifiedName",
        /// Kerberos principal.
        Kerberos = "urn:oasis:names:tc:SAML:2.0:nameid-format:kerberos",
        /// An entity ID, as used by `saml:Issuer`.
        Entity = "urn:oasis:names:tc:SAML:2.0:nameid-format:entity",
        /// Opaque identifier stable across sessions.
        Persistent = "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent",
        /// Opaque one-off identifier.
        Transient = "urn:oasis:names:tc:SAML:2.0:nameid-format:transient",
    }
}

uri_enum! {
    /// Authentication context classes from the SAML 2.0 context profile.
    #[derive(Default)]
    pub enum AuthnContextClass {
        /// No particular context.
        #[default]
        Unspecified = "urn:oasis:names:tc:SAML:2.0:ac:classes:unspecified",
        /// Password over an unprotected channel.
        Password = "urn:oasis:names:tc:SAML:2.0:ac:classes:Password",
        /// Password over TLS.
        PasswordProtectedTransport = "urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport",
        /// X.509 signature by the principal.
        X509 = "urn:oasis:names:tc:SAML:2.0:ac:classes:X509",
        /// TLS client certificate.
        TlsClient = "urn:oasis:names:tc:SAML:2.0:ac:classes:TLSClient",
        /// Kerberos ticket.
        Kerberos = "urn:oasis:names:tc:SAML:2.0:ac:classes:Kerberos",
        /// Reuse of an existing session.
        PreviousSession = "urn:oasis:names:tc:SAML:2.0:ac:classes:PreviousSession",
    }
}

/// `DigestMethod` URIs.
pub mod digest_algorithms {
    #![allow(missing_docs)]

    pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
    pub const SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";
    pub const SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";
    pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
}

/// `Transform` URIs.
pub mod transform_algorithms {
    #![allow(missing_docs)]

    pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
}

/// `NameFormat` URIs for attributes.
pub mod attribute_name_formats {
    #![allow(missing_docs)]

    pub const URI: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:uri";
    pub const BASIC: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:basic";
    pub const UNSPECIFIED: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:unspecified";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_uri_maps_back() {
        for binding in SamlBinding::ALL {
            assert_eq!(SamlBinding::from_uri(binding.uri()), Some(*binding));
        }
        for format in StandardNameIdFormat::ALL {
            assert_eq!(StandardNameIdFormat::from_uri(format.uri()), Some(*format));
        }
        for class in AuthnContextClass::ALL {
            assert_eq!(AuthnContextClass::from_uri(class.uri()), Some(*class));
        }
    }

    #[test]
    fn unknown_uris_are_not_guessed() {
        assert_eq!(SamlBinding::from_uri("urn:example:binding"), None);
        assert_eq!(
            StandardNameIdFormat::from_uri("urn:oasis:names:tc:SAML:2.0:nameid-format:EMAIL"),
            None
        );
        assert_eq!(StandardNameIdFormat::default(), StandardNameIdFormat::Unspecified);
    }

    #[test]
    fn display_is_the_uri() {
        assert_eq!(
            SamlBinding::HttpPost.to_string(),
            "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST"
        );
    }

    #[test]
    fn conventional_prefixes() {
        assert_eq!(preferred_prefix(MD_NS), Some("md"));
        assert_eq!(preferred_prefix(XMLDSIG_NS), Some("ds"));
        assert_eq!(preferred_prefix("urn:example:ext"), None);
    }
}
