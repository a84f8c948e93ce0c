//! Structural script validation
//!
//! Unlike the parser, the validator never stops at the first problem: every
//! violation is collected so a script author gets the complete list at once.
//! An empty list means the script is valid.

use std::io::BufRead;
use tracing::{error, trace, warn};
use url::Url;

use crate::annotation::{filter_annotations, Annotation};
use crate::error::AnnotationError;
use crate::grammar::{AnnotationKind, AttributeKey};
use crate::parser::AnnotationParser;
use crate::synthesizer::DescriptionSynthesizer;

/// Batch validator for annotated scripts
#[derive(Clone, Copy)]
pub struct ScriptValidator<'a> {
    parser: &'a AnnotationParser,
    synthesizer: DescriptionSynthesizer<'a>,
}

impl<'a> ScriptValidator<'a> {
    /// Create a validator using the given parser and synthesizer
    pub fn new(parser: &'a AnnotationParser, synthesizer: DescriptionSynthesizer<'a>) -> Self {
        Self {
            parser,
            synthesizer,
        }
    }

    /// Whether the script passes every check
    pub fn is_valid<R: BufRead>(&self, script: R, identifier: &str) -> bool {
        self.validate_script(script, identifier).is_empty()
    }

    /// Parse a script and validate its annotations
    ///
    /// A parse failure is reported as the only error since no annotations
    /// are available to check.
    pub fn validate_script<R: BufRead>(&self, script: R, identifier: &str) -> Vec<AnnotationError> {
        match self.parser.parse(script) {
            Ok(parsed) => self.validate(&parsed.annotations, identifier),
            Err(err) => {
                error!(script = identifier, "error parsing annotations during validation: {}", err);
                vec![err]
            }
        }
    }

    /// Validate an already parsed annotation list
    pub fn validate(&self, annotations: &[Annotation], identifier: &str) -> Vec<AnnotationError> {
        let mut errors = Vec::new();

        if annotations.is_empty() {
            errors.push(AnnotationError::NoAnnotations);
            return errors;
        }

        let descriptions = filter_annotations(annotations, AnnotationKind::Description).count();
        if descriptions != 1 {
            errors.push(AnnotationError::InvalidAnnotationCount {
                kind: AnnotationKind::Description,
                expected: 1,
                found: descriptions,
            });
        }

        // the synthesizer is the oracle for everything the grammar cannot express
        if let Err(err) = self.synthesizer.synthesize(annotations, identifier) {
            errors.push(err);
        }

        for annotation in filter_annotations(annotations, AnnotationKind::Metadata) {
            trace!(%annotation, "validating metadata annotation");
            validate_metadata(annotation, &mut errors);
        }

        if !errors.is_empty() {
            warn!(
                script = identifier,
                count = errors.len(),
                "script annotations are not valid"
            );
        }
        errors
    }
}

fn validate_metadata(annotation: &Annotation, errors: &mut Vec<AnnotationError>) {
    let missing = |key| AnnotationError::MissingRequiredAttribute {
        kind: AnnotationKind::Metadata,
        key,
    };

    match annotation.raw_value(AttributeKey::Title) {
        Ok(Some(title)) if !title.is_empty() => {}
        Ok(_) => errors.push(missing(AttributeKey::Title)),
        Err(err) => errors.push(err),
    }

    match annotation.raw_value(AttributeKey::Href) {
        Ok(Some(href)) if !href.is_empty() => {
            if let Err(err) = Url::parse(href) {
                errors.push(AnnotationError::InvalidUrl {
                    value: href.to_string(),
                    reason: err.to_string(),
                });
            }
        }
        Ok(_) => errors.push(missing(AttributeKey::Href)),
        Err(err) => errors.push(err),
    }
}
