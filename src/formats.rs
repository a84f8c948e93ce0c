//! Format capability registries
//!
//! A handler reads (input side) or writes (output side) data of one or more
//! bindings in a set of formats. The synthesizer asks a registry for every
//! format advertised by handlers supporting a binding.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::datatype::Binding;

/// One concrete data representation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Format {
    pub mime_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl Format {
    /// Create a format without encoding or schema
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            encoding: None,
            schema: None,
        }
    }

    /// Set the encoding
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Set the schema
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Same format without encoding
    pub fn unencoded(&self) -> Self {
        Self {
            encoding: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mime_type)?;
        if let Some(ref encoding) = self.encoding {
            write!(f, "; encoding={}", encoding)?;
        }
        if let Some(ref schema) = self.schema {
            write!(f, "; schema={}", schema)?;
        }
        Ok(())
    }
}

/// Lookup of formats available for a binding
///
/// Registries are shared by synthesizers running on several threads.
pub trait FormatRegistry: Send + Sync {
    /// Union of the formats of every handler supporting `binding`
    fn formats_for(&self, binding: Binding) -> BTreeSet<Format>;
}

/// A parser or generator with its declared capabilities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatHandler {
    pub name: String,
    pub bindings: BTreeSet<Binding>,
    pub formats: BTreeSet<Format>,
}

impl FormatHandler {
    /// Create a handler
    pub fn new(
        name: impl Into<String>,
        bindings: impl IntoIterator<Item = Binding>,
        formats: impl IntoIterator<Item = Format>,
    ) -> Self {
        Self {
            name: name.into(),
            bindings: bindings.into_iter().collect(),
            formats: formats.into_iter().collect(),
        }
    }

    /// Whether the handler supports a binding
    pub fn supports(&self, binding: Binding) -> bool {
        self.bindings.contains(&binding)
    }
}

/// Handlers of one direction
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: Vec<FormatHandler>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler
    pub fn register(&mut self, handler: FormatHandler) {
        self.handlers.push(handler);
    }

    /// Built-in parsers for process inputs
    pub fn builtin_input_handlers() -> Self {
        let mut registry = Self::new();
        registry.register(FormatHandler::new(
            "geotiff-parser",
            [Binding::Raster],
            [
                Format::new("image/geotiff"),
                Format::new("image/geotiff").with_encoding("base64"),
                Format::new("image/tiff"),
            ],
        ));
        registry.register(FormatHandler::new(
            "shapefile-parser",
            [Binding::Vector],
            [
                Format::new("application/x-zipped-shp"),
                Format::new("application/x-zipped-shp").with_encoding("base64"),
            ],
        ));
        registry.register(FormatHandler::new("gml-parser", [Binding::Vector], gml_formats()));
        registry.register(FormatHandler::new(
            "kml-parser",
            [Binding::Vector],
            [Format::new("application/vnd.google-earth.kml+xml")],
        ));
        registry
    }

    /// Built-in generators for process outputs
    pub fn builtin_output_handlers() -> Self {
        let mut registry = Self::new();
        registry.register(FormatHandler::new(
            "geotiff-generator",
            [Binding::Raster],
            [
                Format::new("image/geotiff"),
                Format::new("image/geotiff").with_encoding("base64"),
            ],
        ));
        registry.register(FormatHandler::new(
            "shapefile-generator",
            [Binding::Vector],
            [Format::new("application/x-zipped-shp")],
        ));
        registry.register(FormatHandler::new(
            "gml-generator",
            [Binding::Vector],
            gml_formats(),
        ));
        registry
    }
}

fn gml_formats() -> Vec<Format> {
    vec![
        Format::new("text/xml")
            .with_schema("http://schemas.opengis.net/gml/3.1.1/base/feature.xsd"),
        Format::new("application/gml+xml")
            .with_schema("http://schemas.opengis.net/gml/3.2.1/base/feature.xsd"),
    ]
}

impl FromIterator<FormatHandler> for HandlerRegistry {
    fn from_iter<I: IntoIterator<Item = FormatHandler>>(iter: I) -> Self {
        Self {
            handlers: iter.into_iter().collect(),
        }
    }
}

impl FormatRegistry for HandlerRegistry {
    fn formats_for(&self, binding: Binding) -> BTreeSet<Format> {
        self.handlers
            .iter()
            .filter(|handler| handler.supports(binding))
            .flat_map(|handler| handler.formats.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formats_are_unioned_across_handlers() {
        let registry = HandlerRegistry::builtin_input_handlers();
        let formats = registry.formats_for(Binding::Vector);
        // shapefile (2) + gml (2) + kml (1)
        assert_eq!(formats.len(), 5);
        assert!(formats.contains(&Format::new("application/vnd.google-earth.kml+xml")));
    }

    #[test]
    fn test_unsupported_binding_has_no_formats() {
        let registry = HandlerRegistry::builtin_output_handlers();
        assert!(registry.formats_for(Binding::GenericFile).is_empty());
    }

    #[test]
    fn test_duplicate_formats_collapse() {
        let registry: HandlerRegistry = vec![
            FormatHandler::new("a", [Binding::Raster], [Format::new("image/tiff")]),
            FormatHandler::new("b", [Binding::Raster], [Format::new("image/tiff")]),
        ]
        .into_iter()
        .collect();
        assert_eq!(registry.formats_for(Binding::Raster).len(), 1);
    }

    #[test]
    fn test_unencoded_variant() {
        let format = Format::new("image/png")
            .with_encoding("base64")
            .with_schema("s");
        let plain = format.unencoded();
        assert_eq!(plain.mime_type, "image/png");
        assert_eq!(plain.encoding, None);
        assert_eq!(plain.schema.as_deref(), Some("s"));
    }

    #[test]
    fn test_format_display() {
        let format = Format::new("image/png").with_encoding("base64");
        assert_eq!(format.to_string(), "image/png; encoding=base64");
    }
}
