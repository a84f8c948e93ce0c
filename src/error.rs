//! Error handling module for procdesc
//!
//! Provides the error types shared by the parser, validator and synthesizer.
//! The parser fails fast with [`AnnotationError::ScriptAnnotation`], the
//! synthesizer wraps everything in [`AnnotationError::Synthesis`] and the
//! validator collects plain variants into a list.

use thiserror::Error;

use crate::grammar::{AnnotationKind, AttributeKey};

/// Main error type for annotation parsing and description synthesis
#[derive(Error, Debug)]
pub enum AnnotationError {
    /// Attribute name is not legal for the annotation kind
    #[error("Attribute '{name}' is not defined for annotations of type '{kind}'")]
    UnknownAttribute { kind: AnnotationKind, name: String },

    /// Grammar violation inside an annotation body
    #[error("Malformed annotation: {reason}")]
    MalformedAnnotation { reason: String },

    /// Wrong number of annotations of one kind
    #[error("Exactly {expected} '{kind}' annotation required, but found {found}")]
    InvalidAnnotationCount {
        kind: AnnotationKind,
        expected: usize,
        found: usize,
    },

    /// A mandatory attribute has neither a value nor a default
    #[error("Mandatory attribute '{key}' not found in '{kind}' annotation")]
    MissingRequiredAttribute { kind: AnnotationKind, key: AttributeKey },

    /// The type tag of an input or output is not registered
    #[error("Unsupported data type '{type_tag}'")]
    UnknownDataType { type_tag: String },

    /// Accessor used on the wrong annotation variant
    #[error("Annotation of type '{kind}' does not hold {expected}")]
    WrongVariant {
        kind: AnnotationKind,
        expected: &'static str,
    },

    /// A URL attribute does not parse
    #[error("'{value}' is not a well-formed URL: {reason}")]
    InvalidUrl { value: String, reason: String },

    /// Script contains no annotations at all
    #[error("No annotations found")]
    NoAnnotations,

    /// Parse failure with the script line where it happened
    #[error("Invalid script annotation in line {line}: {cause}")]
    ScriptAnnotation {
        line: usize,
        #[source]
        cause: Box<AnnotationError>,
    },

    /// Process description could not be created
    #[error("Could not create process description for '{process}': {cause}")]
    Synthesis {
        process: String,
        #[source]
        cause: Box<AnnotationError>,
    },

    /// IO errors while reading the script stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for annotation operations
pub type Result<T> = std::result::Result<T, AnnotationError>;

// Convenient error constructors
impl AnnotationError {
    /// Create a malformed annotation error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedAnnotation {
            reason: reason.into(),
        }
    }

    /// Attach a script line to an error
    pub fn at_line(self, line: usize) -> Self {
        Self::ScriptAnnotation {
            line,
            cause: Box::new(self),
        }
    }

    /// Wrap an error raised while synthesizing a process description
    pub fn synthesis(process: impl Into<String>, cause: AnnotationError) -> Self {
        Self::Synthesis {
            process: process.into(),
            cause: Box::new(cause),
        }
    }

    /// The innermost error, looking through line and synthesis wrappers
    pub fn root_cause(&self) -> &AnnotationError {
        match self {
            Self::ScriptAnnotation { cause, .. } | Self::Synthesis { cause, .. } => {
                cause.root_cause()
            }
            other => other,
        }
    }

    /// Script line the error was raised at, if known
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::ScriptAnnotation { line, .. } => Some(*line),
            Self::Synthesis { cause, .. } => cause.line(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnnotationError::malformed("positional value after keyword");
        assert_eq!(
            err.to_string(),
            "Malformed annotation: positional value after keyword"
        );

        let err = AnnotationError::UnknownAttribute {
            kind: AnnotationKind::Input,
            name: "colour".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Attribute 'colour' is not defined for annotations of type 'wps.in'"
        );
    }

    #[test]
    fn test_line_wrapping() {
        let err = AnnotationError::malformed("unterminated quote").at_line(7);
        assert_eq!(err.line(), Some(7));
        assert!(matches!(
            err.root_cause(),
            AnnotationError::MalformedAnnotation { .. }
        ));
        assert!(err.to_string().starts_with("Invalid script annotation in line 7"));
    }

    #[test]
    fn test_synthesis_wrapping_keeps_root_cause() {
        let inner = AnnotationError::UnknownDataType {
            type_tag: "matrix".to_string(),
        };
        let err = AnnotationError::synthesis("process.demo", inner);
        assert!(matches!(
            err.root_cause(),
            AnnotationError::UnknownDataType { .. }
        ));
        assert_eq!(err.line(), None);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad utf-8");
        let err: AnnotationError = io_err.into();
        assert!(matches!(err, AnnotationError::Io(_)));
    }
}
