//! Annotation grammar tables
//!
//! Every annotation kind is described by static data only: its start marker,
//! the order in which positional values bind to attributes, and the set of
//! attribute names it accepts. The parser never hard-codes a kind; adding a
//! kind or attribute means editing the tables below.
//!
//! # Annotation Syntax
//!
//! ```text
//! # wps.in: id = size, type = integer, title = "Sample size, rows",
//! #   minOccurs = 0, maxOccurs = 1;
//! ```
//!
//! | Token | Meaning |
//! |-------|---------|
//! | `#`   | comment marker, `##` disables the line |
//! | `:`   | separates the start marker from the body |
//! | `,`   | separates attributes |
//! | `=`   | separates an attribute name from its value |
//! | `;`   | terminates the annotation |

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::error::{AnnotationError, Result};

/// Marker opening an annotation line
pub const COMMENT_MARKER: &str = "#";
/// Marker of a disabled annotation line
pub const DISABLED_MARKER: &str = "##";
/// Separates the start marker from the annotation body
pub const STARTKEY_SEPARATOR: char = ':';
/// Separates attributes inside a body
pub const ATTRIBUTE_SEPARATOR: char = ',';
/// Separates an attribute name from its value
pub const ATTRIBUTE_VALUE_SEPARATOR: char = '=';
/// Terminates an annotation, possibly several lines after its start
pub const ANNOTATION_END: char = ';';
/// Quote protecting separators inside a value
pub const QUOTE: char = '"';

/// Category of an annotation, each with its own attribute grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumIter, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    #[strum(serialize = "wps.des")]
    Description,
    #[strum(serialize = "wps.in")]
    Input,
    #[strum(serialize = "wps.out")]
    Output,
    #[strum(serialize = "wps.resource")]
    Resource,
    #[strum(serialize = "wps.import")]
    Import,
    #[strum(serialize = "wps.metadata")]
    Metadata,
}

/// Attribute names accepted inside annotation bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumIter, IntoStaticStr)]
#[serde(rename_all = "camelCase")]
pub enum AttributeKey {
    /// Placeholder for slot 0 of every sequence, never bound to a value
    #[strum(serialize = "start")]
    Start,
    #[strum(serialize = "id")]
    #[serde(rename = "id")]
    Identifier,
    #[strum(serialize = "title")]
    Title,
    #[strum(serialize = "abstract")]
    Abstract,
    #[strum(serialize = "version")]
    Version,
    #[strum(serialize = "author")]
    Author,
    #[strum(serialize = "type")]
    Type,
    #[strum(serialize = "minOccurs")]
    MinOccurs,
    #[strum(serialize = "maxOccurs")]
    MaxOccurs,
    #[strum(serialize = "value")]
    #[serde(rename = "value")]
    DefaultValue,
    #[strum(serialize = "encoding")]
    Encoding,
    #[strum(serialize = "schema")]
    Schema,
    #[strum(serialize = "href")]
    Href,
    #[strum(serialize = "resources")]
    #[serde(rename = "resources")]
    ResourceList,
}

/// Fallback used when an attribute has no explicit value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeDefault {
    /// Fixed text
    Literal(&'static str),
    /// Value of another attribute of the same annotation
    Key(AttributeKey),
}

impl AttributeKey {
    /// Textual name as written in scripts
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Default applied when the attribute is not set
    pub fn default_value(self) -> Option<AttributeDefault> {
        match self {
            Self::Title => Some(AttributeDefault::Key(Self::Identifier)),
            Self::MinOccurs | Self::MaxOccurs => Some(AttributeDefault::Literal("1")),
            _ => None,
        }
    }

    /// Whether a lookup must produce a value
    pub fn is_mandatory(self) -> bool {
        matches!(
            self,
            Self::Identifier
                | Self::Type
                | Self::MinOccurs
                | Self::MaxOccurs
                | Self::ResourceList
        )
    }
}

use AttributeKey as K;

const DESCRIPTION_SEQUENCE: &[AttributeKey] =
    &[K::Start, K::Identifier, K::Title, K::Abstract, K::Version, K::Author];

const INPUT_SEQUENCE: &[AttributeKey] = &[
    K::Start,
    K::Identifier,
    K::Title,
    K::MinOccurs,
    K::MaxOccurs,
    K::Type,
    K::Abstract,
    K::DefaultValue,
    K::Encoding,
    K::Schema,
];

const OUTPUT_SEQUENCE: &[AttributeKey] = &[
    K::Start,
    K::Identifier,
    K::Title,
    K::Type,
    K::Abstract,
    K::Encoding,
    K::Schema,
];

const RESOURCE_SEQUENCE: &[AttributeKey] = &[K::Start, K::ResourceList];

const METADATA_SEQUENCE: &[AttributeKey] = &[K::Start, K::Title, K::Href];

impl AnnotationKind {
    /// Marker that opens an annotation of this kind
    pub fn start_marker(self) -> &'static str {
        self.into()
    }

    /// Positional binding order; slot 0 is the start key placeholder
    pub fn attribute_sequence(self) -> &'static [AttributeKey] {
        match self {
            Self::Description => DESCRIPTION_SEQUENCE,
            Self::Input => INPUT_SEQUENCE,
            Self::Output => OUTPUT_SEQUENCE,
            Self::Resource | Self::Import => RESOURCE_SEQUENCE,
            Self::Metadata => METADATA_SEQUENCE,
        }
    }

    /// Attributes legal for this kind, without the start placeholder
    pub fn legal_attributes(self) -> &'static [AttributeKey] {
        &self.attribute_sequence()[1..]
    }

    /// Whether the body is a resource list instead of an attribute map
    pub fn holds_resources(self) -> bool {
        matches!(self, Self::Resource | Self::Import)
    }

    /// Check whether `key` may appear in annotations of this kind
    pub fn accepts(self, key: AttributeKey) -> bool {
        self.legal_attributes().contains(&key)
    }

    /// All kinds in declaration order, which is also start-marker match order
    pub fn all() -> impl Iterator<Item = AnnotationKind> {
        Self::iter()
    }
}

/// Resolve a textual attribute name for a kind
///
/// Names are compared ASCII case-insensitively. Fails with
/// [`AnnotationError::UnknownAttribute`] when the kind does not accept it.
pub fn attribute_for(kind: AnnotationKind, name: &str) -> Result<AttributeKey> {
    let name = name.trim();
    kind.legal_attributes()
        .iter()
        .copied()
        .find(|key| key.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| AnnotationError::UnknownAttribute {
            kind,
            name: name.to_string(),
        })
}
