//! Process description synthesizer
//!
//! Pure translation of a parsed annotation list into a [`ProcessDescription`].
//! Type tags are resolved through the [`DataTypeRegistry`]; complex data
//! collects its supported formats from the format registries of the matching
//! direction.
//!
//! # Supported Formats
//!
//! | Binding        | Supported formats |
//! |----------------|-------------------|
//! | generic file   | the default format, plus an unencoded copy when the encoding is `base64` |
//! | anything else  | union of the formats of all handlers declaring the binding |

use std::collections::BTreeSet;
use tracing::{debug, error, trace};

use crate::annotation::Annotation;
use crate::datatype::{Binding, DataTypeRegistry};
use crate::description::{
    ComplexData, DataDescription, InputDescription, LiteralData, Occurrence, OutputDescription,
    ProcessDescription, DEFAULT_VERSION,
};
use crate::error::{AnnotationError, Result};
use crate::formats::{Format, FormatRegistry};
use crate::grammar::{AnnotationKind, AttributeKey};

const BASE64_ENCODING: &str = "base64";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Input,
    Output,
}

/// Builds process descriptions from annotations
#[derive(Clone, Copy)]
pub struct DescriptionSynthesizer<'a> {
    data_types: &'a DataTypeRegistry,
    input_formats: &'a dyn FormatRegistry,
    output_formats: &'a dyn FormatRegistry,
}

impl<'a> DescriptionSynthesizer<'a> {
    /// Create a synthesizer over the given registries
    pub fn new(
        data_types: &'a DataTypeRegistry,
        input_formats: &'a dyn FormatRegistry,
        output_formats: &'a dyn FormatRegistry,
    ) -> Self {
        Self {
            data_types,
            input_formats,
            output_formats,
        }
    }

    /// Create the process description for `identifier`
    ///
    /// Every failure is returned as [`AnnotationError::Synthesis`]; a partial
    /// description is never produced.
    pub fn synthesize(
        &self,
        annotations: &[Annotation],
        identifier: &str,
    ) -> Result<ProcessDescription> {
        debug!(process = identifier, "creating process description");
        self.build(annotations, identifier).map_err(|err| {
            error!(process = identifier, "error creating process description: {}", err);
            AnnotationError::synthesis(identifier, err)
        })
    }

    fn build(&self, annotations: &[Annotation], identifier: &str) -> Result<ProcessDescription> {
        let description = annotations
            .iter()
            .find(|a| a.kind() == AnnotationKind::Description)
            .ok_or(AnnotationError::InvalidAnnotationCount {
                kind: AnnotationKind::Description,
                expected: 1,
                found: 0,
            })?;

        let title = description.string_value(AttributeKey::Title)?;
        let abstract_text = non_empty(description.string_value(AttributeKey::Abstract)?);
        let version = non_empty(description.string_value(AttributeKey::Version)?)
            .unwrap_or_else(|| DEFAULT_VERSION.to_string());

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();

        for annotation in annotations {
            match annotation.kind() {
                AnnotationKind::Input => inputs.push(self.input(annotation)?),
                AnnotationKind::Output => outputs.push(self.output(annotation)?),
                _ => trace!(%annotation, "annotation not part of the process description"),
            }
        }

        Ok(ProcessDescription {
            id: identifier.to_string(),
            title,
            abstract_text,
            version,
            inputs,
            outputs,
        })
    }

    fn input(&self, annotation: &Annotation) -> Result<InputDescription> {
        let id = annotation.required_value(AttributeKey::Identifier)?;
        // title is optional in scripts but required in descriptions
        let title = annotation
            .string_value(AttributeKey::Title)?
            .unwrap_or_else(|| id.clone());
        let abstract_text = non_empty(annotation.string_value(AttributeKey::Abstract)?);
        let occurrence = Occurrence {
            min: occurs(annotation, &id, AttributeKey::MinOccurs)?,
            max: occurs(annotation, &id, AttributeKey::MaxOccurs)?,
        };
        let data = self.data(annotation, Direction::Input)?;

        trace!(input = %id, "added input");
        Ok(InputDescription {
            id,
            title,
            abstract_text,
            occurrence,
            data,
        })
    }

    fn output(&self, annotation: &Annotation) -> Result<OutputDescription> {
        let id = annotation.required_value(AttributeKey::Identifier)?;
        let title = annotation
            .string_value(AttributeKey::Title)?
            .unwrap_or_else(|| id.clone());
        let abstract_text = non_empty(annotation.string_value(AttributeKey::Abstract)?);
        let data = self.data(annotation, Direction::Output)?;

        trace!(output = %id, "added output");
        Ok(OutputDescription {
            id,
            title,
            abstract_text,
            data,
        })
    }

    fn data(&self, annotation: &Annotation, direction: Direction) -> Result<DataDescription> {
        let type_tag = annotation.required_value(AttributeKey::Type)?;
        let data_type =
            self.data_types
                .get(&type_tag)
                .ok_or_else(|| AnnotationError::UnknownDataType {
                    type_tag: type_tag.clone(),
                })?;

        if !data_type.is_complex() {
            let kind = self
                .data_types
                .literal_kind_for(&type_tag)
                .ok_or_else(|| AnnotationError::UnknownDataType {
                    type_tag: type_tag.clone(),
                })?;
            let default_value = match direction {
                Direction::Input => annotation.string_value(AttributeKey::DefaultValue)?,
                Direction::Output => None,
            };
            return Ok(DataDescription::Literal(LiteralData {
                data_type: data_type.process_description_type.clone(),
                kind,
                default_value,
            }));
        }

        let default_format = Format {
            mime_type: data_type.process_description_type.clone(),
            encoding: non_empty(annotation.string_value(AttributeKey::Encoding)?)
                .or_else(|| data_type.encoding.clone()),
            schema: non_empty(annotation.string_value(AttributeKey::Schema)?)
                .or_else(|| data_type.schema.clone()),
        };

        let supported_formats = if data_type.binding == Binding::GenericFile {
            let mut formats = BTreeSet::from([default_format.clone()]);
            if default_format.encoding.as_deref() == Some(BASE64_ENCODING) {
                formats.insert(default_format.unencoded());
            }
            formats
        } else {
            let registry = match direction {
                Direction::Input => self.input_formats,
                Direction::Output => self.output_formats,
            };
            registry.formats_for(data_type.binding)
        };

        Ok(DataDescription::Complex(ComplexData {
            default_format,
            supported_formats,
            binding: data_type.binding,
        }))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn occurs(annotation: &Annotation, id: &str, key: AttributeKey) -> Result<u64> {
    let value = annotation.required_value(key)?;
    value.trim().parse::<u64>().map_err(|_| {
        AnnotationError::malformed(format!(
            "'{}' of input '{}' must be a non-negative integer, found '{}'",
            key, id, value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::LiteralKind;
    use crate::formats::HandlerRegistry;
    use crate::parser::AnnotationParser;

    fn synthesize(script: &str) -> Result<ProcessDescription> {
        let data_types = DataTypeRegistry::with_builtin_types();
        let inputs = HandlerRegistry::builtin_input_handlers();
        let outputs = HandlerRegistry::builtin_output_handlers();
        let parsed = AnnotationParser::new().parse_str(script).unwrap();
        DescriptionSynthesizer::new(&data_types, &inputs, &outputs)
            .synthesize(&parsed.annotations, "process.test")
    }

    #[test]
    fn test_description_fields() {
        let description = synthesize(
            "# wps.des: id = test, title = Test, abstract = A test process, version = 2.1;\n",
        )
        .unwrap();
        assert_eq!(description.id, "process.test");
        assert_eq!(description.title.as_deref(), Some("Test"));
        assert_eq!(description.abstract_text.as_deref(), Some("A test process"));
        assert_eq!(description.version, "2.1");
    }

    #[test]
    fn test_version_defaults() {
        let description = synthesize("# wps.des: id = test, version = ;\n").unwrap();
        assert_eq!(description.version, DEFAULT_VERSION);
        // without title the description falls back to the identifier
        assert_eq!(description.title.as_deref(), Some("test"));
    }

    #[test]
    fn test_literal_input_with_default_value() {
        let description = synthesize(
            "# wps.des: id = test;\n# wps.in: id = n, type = integer, value = 10;\n",
        )
        .unwrap();
        let input = description.input("n").unwrap();
        let literal = input.data.as_literal().unwrap();
        assert_eq!(literal.kind, LiteralKind::Integer);
        assert_eq!(literal.data_type, "xs:integer");
        assert_eq!(literal.default_value.as_deref(), Some("10"));
        assert_eq!(input.title, "n");
        assert_eq!(input.occurrence, Occurrence { min: 1, max: 1 });
    }

    #[test]
    fn test_generic_file_base64_adds_unencoded_variant() {
        let description = synthesize(
            "# wps.des: id = test;\n# wps.out: id = plot, type = png;\n",
        )
        .unwrap();
        let complex = description.output("plot").unwrap().data.as_complex().unwrap();
        assert_eq!(complex.default_format.encoding.as_deref(), Some("base64"));
        assert_eq!(complex.supported_formats.len(), 2);
        assert!(complex
            .supported_formats
            .contains(&Format::new("image/png")));
    }

    #[test]
    fn test_non_generic_binding_uses_handlers_of_direction() {
        let description = synthesize(
            "# wps.des: id = test;\n# wps.in: id = raster, type = geotiff;\n# wps.out: id = out, type = geotiff;\n",
        )
        .unwrap();
        let input = description.input("raster").unwrap().data.as_complex().unwrap();
        assert_eq!(input.supported_formats.len(), 3);
        let output = description.output("out").unwrap().data.as_complex().unwrap();
        assert_eq!(output.supported_formats.len(), 2);
    }

    #[test]
    fn test_bad_occurrence_is_fatal() {
        let err = synthesize(
            "# wps.des: id = test;\n# wps.in: id = n, type = integer, minOccurs = -1;\n",
        )
        .unwrap_err();
        assert!(matches!(err, AnnotationError::Synthesis { .. }));
        assert!(matches!(
            err.root_cause(),
            AnnotationError::MalformedAnnotation { .. }
        ));
    }

    #[test]
    fn test_unknown_type_is_fatal() {
        let err = synthesize("# wps.des: id = test;\n# wps.in: id = m, type = matrix;\n")
            .unwrap_err();
        assert!(matches!(
            err.root_cause(),
            AnnotationError::UnknownDataType { .. }
        ));
    }

    #[test]
    fn test_missing_description() {
        let err = synthesize("# wps.in: id = n, type = integer;\n").unwrap_err();
        assert!(matches!(
            err.root_cause(),
            AnnotationError::InvalidAnnotationCount { found: 0, .. }
        ));
    }

    fn assert_send_sync<T: Send + Sync>(_: &T) {}

    #[test]
    fn test_shareable_across_threads() {
        let data_types = DataTypeRegistry::with_builtin_types();
        let inputs = HandlerRegistry::builtin_input_handlers();
        let outputs = HandlerRegistry::builtin_output_handlers();
        let parser = AnnotationParser::new();
        let synthesizer = DescriptionSynthesizer::new(&data_types, &inputs, &outputs);
        let validator = crate::validator::ScriptValidator::new(&parser, synthesizer);

        assert_send_sync(&parser);
        assert_send_sync(&synthesizer);
        assert_send_sync(&validator);

        let parsed = parser
            .parse_str("# wps.des: id = t;\n# wps.in: id = img, type = png;\n")
            .unwrap();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| synthesizer.synthesize(&parsed.annotations, "process.t")))
                .collect();
            for handle in handles {
                assert!(handle.join().unwrap().is_ok());
            }
        });
    }
}
