//! Namespace-qualified names and the ODF namespace table.

use crate::{DomError, DomResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod ns {
    pub const OFFICE: &str = "urn:oasis:names:tc:opendocument:xmlns:office:1.0";
    pub const TEXT: &str = "urn:oasis:names:tc:opendocument:xmlns:text:1.0";
    pub const STYLE: &str = "urn:oasis:names:tc:opendocument:xmlns:style:1.0";
    pub const DRAW: &str = "urn:oasis:names:tc:opendocument:xmlns:drawing:1.0";
    pub const SVG: &str = "urn:oasis:names:tc:opendocument:xmlns:svg-compatible:1.0";
    pub const FO: &str = "urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0";
    pub const TABLE: &str = "urn:oasis:names:tc:opendocument:xmlns:table:1.0";
    pub const META: &str = "urn:oasis:names:tc:opendocument:xmlns:meta:1.0";
    pub const XLINK: &str = "http://www.w3.org/1999/xlink";
    pub const DC: &str = "http://purl.org/dc/elements/1.1/";
    pub const EDITINFO: &str = "urn:webodf:names:editinfo";
    pub const CURSOR: &str = "urn:webodf:names:cursor";

    const PREFIXES: &[(&str, &str)] = &[
        ("office", OFFICE),
        ("text", TEXT),
        ("style", STYLE),
        ("draw", DRAW),
        ("svg", SVG),
        ("fo", FO),
        ("table", TABLE),
        ("meta", META),
        ("xlink", XLINK),
        ("dc", DC),
        ("editinfo", EDITINFO),
        ("cursor", CURSOR),
    ];

    /// Looks up the namespace URI bound to a well-known prefix.
    pub fn namespace_uri(prefix: &str) -> Option<&'static str> {
        PREFIXES
            .iter()
            .find(|(p, _)| *p == prefix)
            .map(|(_, uri)| *uri)
    }

    /// Looks up the conventional prefix of a well-known namespace URI.
    pub fn prefix_for(uri: &str) -> Option<&'static str> {
        PREFIXES
            .iter()
            .find(|(_, u)| *u == uri)
            .map(|(prefix, _)| *prefix)
    }
}

/// Element or attribute name: namespace URI plus local name.
///
/// An empty namespace means "no namespace".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    pub ns: String,
    pub local: String,
}

impl QName {
    pub fn new(ns: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            ns: ns.into(),
            local: local.into(),
        }
    }

    /// Parses a `prefix:local` name using the well-known prefix table.
    pub fn parse_prefixed(name: &str) -> DomResult<Self> {
        match name.split_once(':') {
            Some((prefix, local)) => {
                let uri = ns::namespace_uri(prefix)
                    .ok_or_else(|| DomError::UnknownPrefix(name.to_string()))?;
                Ok(Self::new(uri, local))
            }
            None => Ok(Self::new("", name)),
        }
    }

    pub fn is(&self, ns: &str, local: &str) -> bool {
        self.ns == ns && self.local == local
    }

    /// Renders the name with its conventional prefix, falling back to the
    /// bare local name for unknown namespaces.
    pub fn prefixed(&self) -> String {
        match ns::prefix_for(&self.ns) {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefixed())
    }
}
