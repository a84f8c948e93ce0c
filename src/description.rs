//! Typed process description
//!
//! Output of the synthesizer. Serializes to JSON for the service layer; the
//! service protocol document itself is produced elsewhere.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::datatype::{Binding, LiteralKind};
use crate::formats::Format;

/// Version used when the description annotation declares none
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Identity and data descriptors of one process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDescription {
    pub id: String,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub version: String,
    pub inputs: Vec<InputDescription>,
    pub outputs: Vec<OutputDescription>,
}

impl ProcessDescription {
    /// Input with the given identifier
    pub fn input(&self, id: &str) -> Option<&InputDescription> {
        self.inputs.iter().find(|input| input.id == id)
    }

    /// Output with the given identifier
    pub fn output(&self, id: &str) -> Option<&OutputDescription> {
        self.outputs.iter().find(|output| output.id == id)
    }
}

/// Declared repetition bounds of an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub min: u64,
    pub max: u64,
}

/// Scalar value description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteralData {
    /// Schema literal type name, e.g. `xs:integer`
    pub data_type: String,
    pub kind: LiteralKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// Format-governed value description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexData {
    pub default_format: Format,
    pub supported_formats: BTreeSet<Format>,
    pub binding: Binding,
}

/// Data part of an input or output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "lowercase")]
pub enum DataDescription {
    Literal(LiteralData),
    Complex(ComplexData),
}

impl DataDescription {
    /// Literal part, if this is a literal
    pub fn as_literal(&self) -> Option<&LiteralData> {
        match self {
            Self::Literal(literal) => Some(literal),
            Self::Complex(_) => None,
        }
    }

    /// Complex part, if this is complex
    pub fn as_complex(&self) -> Option<&ComplexData> {
        match self {
            Self::Complex(complex) => Some(complex),
            Self::Literal(_) => None,
        }
    }
}

/// Description of one process input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDescription {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    pub occurrence: Occurrence,
    pub data: DataDescription,
}

/// Description of one process output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDescription {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    pub data: DataDescription,
}
