//! Annotation value model
//!
//! An annotation is either a generic attribute map or, for resource and
//! import annotations, an ordered list of resource references. Accessors
//! check the variant and fail with [`AnnotationError::WrongVariant`] instead
//! of silently returning nothing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{AnnotationError, Result};
use crate::grammar::{AnnotationKind, AttributeDefault, AttributeKey};

/// Attribute values of a generic annotation
pub type AttributeMap = BTreeMap<AttributeKey, String>;

/// A file referenced by a resource or import annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Public id of the process owning the resource, if known when parsed
    pub owning_process_id: Option<String>,

    /// Path of the resource as written in the script
    pub resource_path: String,

    /// Whether the resource may be offered for download
    pub is_public: bool,
}

impl ResourceRef {
    /// Create a new resource reference
    pub fn new(
        owning_process_id: Option<String>,
        resource_path: impl Into<String>,
        is_public: bool,
    ) -> Self {
        Self {
            owning_process_id,
            resource_path: resource_path.into(),
            is_public,
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}{}",
            self.owning_process_id.as_deref().unwrap_or("<unknown>"),
            self.resource_path,
            if self.is_public { "" } else { " (private)" }
        )
    }
}

/// One parsed annotation
///
/// Deserialization goes through [`Annotation::generic`] and
/// [`Annotation::resource_list`], so stored annotations obey the grammar too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case", try_from = "RawAnnotation")]
pub enum Annotation {
    /// Attribute map of a description, input, output or metadata annotation
    Generic {
        kind: AnnotationKind,
        attributes: AttributeMap,
    },
    /// Reference list of a resource or import annotation
    ResourceList {
        kind: AnnotationKind,
        refs: Vec<ResourceRef>,
    },
}

/// Unchecked wire form of [`Annotation`]
#[derive(Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
enum RawAnnotation {
    Generic {
        kind: AnnotationKind,
        #[serde(default)]
        attributes: AttributeMap,
    },
    ResourceList {
        kind: AnnotationKind,
        #[serde(default)]
        refs: Vec<ResourceRef>,
    },
}

impl TryFrom<RawAnnotation> for Annotation {
    type Error = AnnotationError;

    fn try_from(raw: RawAnnotation) -> Result<Self> {
        match raw {
            RawAnnotation::Generic { kind, attributes } => Self::generic(kind, attributes),
            RawAnnotation::ResourceList { kind, refs } => Self::resource_list(kind, refs),
        }
    }
}

impl Annotation {
    /// Build a generic annotation, checking every key against the kind
    pub fn generic(kind: AnnotationKind, attributes: AttributeMap) -> Result<Self> {
        if kind.holds_resources() {
            return Err(AnnotationError::WrongVariant {
                kind,
                expected: "an attribute map",
            });
        }
        if let Some(key) = attributes.keys().find(|key| !kind.accepts(**key)) {
            return Err(AnnotationError::UnknownAttribute {
                kind,
                name: key.name().to_string(),
            });
        }
        Ok(Self::Generic { kind, attributes })
    }

    /// Build a resource list annotation
    pub fn resource_list(kind: AnnotationKind, refs: Vec<ResourceRef>) -> Result<Self> {
        if !kind.holds_resources() {
            return Err(AnnotationError::WrongVariant {
                kind,
                expected: "a resource list",
            });
        }
        Ok(Self::ResourceList { kind, refs })
    }

    /// Kind of this annotation
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Self::Generic { kind, .. } | Self::ResourceList { kind, .. } => *kind,
        }
    }

    /// Explicitly set attributes
    pub fn attributes(&self) -> Result<&AttributeMap> {
        match self {
            Self::Generic { attributes, .. } => Ok(attributes),
            Self::ResourceList { kind, .. } => Err(AnnotationError::WrongVariant {
                kind: *kind,
                expected: "an attribute map",
            }),
        }
    }

    /// Referenced resources
    pub fn resources(&self) -> Result<&[ResourceRef]> {
        match self {
            Self::ResourceList { refs, .. } => Ok(refs),
            Self::Generic { kind, .. } => Err(AnnotationError::WrongVariant {
                kind: *kind,
                expected: "a resource list",
            }),
        }
    }

    /// Explicit value of an attribute, without defaults
    pub fn raw_value(&self, key: AttributeKey) -> Result<Option<&str>> {
        Ok(self.attributes()?.get(&key).map(String::as_str))
    }

    /// Value of an attribute with defaults applied
    ///
    /// Returns `Ok(None)` for unset optional attributes. A mandatory
    /// attribute without value or default is
    /// [`AnnotationError::MissingRequiredAttribute`].
    pub fn string_value(&self, key: AttributeKey) -> Result<Option<String>> {
        let kind = self.kind();
        if !kind.accepts(key) {
            return Err(AnnotationError::UnknownAttribute {
                kind,
                name: key.name().to_string(),
            });
        }

        let value = self.resolve(key)?;
        if value.is_none() && key.is_mandatory() {
            return Err(AnnotationError::MissingRequiredAttribute { kind, key });
        }
        Ok(value)
    }

    fn resolve(&self, key: AttributeKey) -> Result<Option<String>> {
        Ok(match self.raw_value(key)? {
            Some(value) => Some(value.to_string()),
            None => match key.default_value() {
                Some(AttributeDefault::Literal(text)) => Some(text.to_string()),
                Some(AttributeDefault::Key(other)) => self.resolve(other)?,
                None => None,
            },
        })
    }

    /// Value of an attribute that has to be present
    pub fn required_value(&self, key: AttributeKey) -> Result<String> {
        self.string_value(key)?
            .ok_or(AnnotationError::MissingRequiredAttribute {
                kind: self.kind(),
                key,
            })
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic { kind, attributes } => {
                let body: Vec<String> = attributes
                    .iter()
                    .map(|(key, value)| format!("{} = {}", key, value))
                    .collect();
                write!(f, "{}: {}", kind, body.join(", "))
            }
            Self::ResourceList { kind, refs } => {
                let body: Vec<&str> = refs.iter().map(|r| r.resource_path.as_str()).collect();
                write!(f, "{}: {}", kind, body.join(", "))
            }
        }
    }
}

/// Annotations of one kind, in encounter order
pub fn filter_annotations(
    annotations: &[Annotation],
    kind: AnnotationKind,
) -> impl Iterator<Item = &Annotation> {
    annotations.iter().filter(move |a| a.kind() == kind)
}
