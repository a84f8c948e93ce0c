//! Data type registry
//!
//! Maps the `type` tag written in input and output annotations to the data
//! representation used in process descriptions. Literal tags resolve to an
//! XML schema literal type, complex tags to a mime type plus the binding that
//! decides which format handlers apply.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString};

/// Literal classification of scalar values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum LiteralKind {
    #[strum(serialize = "xs:double")]
    Double,
    #[strum(serialize = "xs:float")]
    Float,
    #[strum(serialize = "xs:integer")]
    Integer,
    #[strum(serialize = "xs:long")]
    Long,
    #[strum(serialize = "xs:string")]
    String,
    #[strum(serialize = "xs:boolean")]
    Boolean,
}

/// Data representation class a format handler reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    /// Opaque file content passed through unchanged
    GenericFile,
    /// Georeferenced raster data
    Raster,
    /// Vector feature collections
    Vector,
    /// Scalar value
    Literal(LiteralKind),
}

impl Binding {
    /// Whether values of this binding are described by formats
    pub fn is_complex(self) -> bool {
        !matches!(self, Self::Literal(_))
    }
}

/// Registered description of one type tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataType {
    /// Tag as written in scripts, e.g. `integer` or `geotiff`
    pub key: String,

    /// Mime type for complex data, schema literal type for literals
    pub process_description_type: String,

    /// Encoding used when the annotation does not name one
    #[serde(default)]
    pub encoding: Option<String>,

    /// Schema used when the annotation does not name one
    #[serde(default)]
    pub schema: Option<String>,

    pub binding: Binding,
}

impl DataType {
    /// Create a literal data type
    pub fn literal(key: impl Into<String>, kind: LiteralKind) -> Self {
        Self {
            key: key.into(),
            process_description_type: kind.to_string(),
            encoding: None,
            schema: None,
            binding: Binding::Literal(kind),
        }
    }

    /// Create a complex data type
    pub fn complex(key: impl Into<String>, mime_type: impl Into<String>, binding: Binding) -> Self {
        Self {
            key: key.into(),
            process_description_type: mime_type.into(),
            encoding: None,
            schema: None,
            binding,
        }
    }

    /// Set the default encoding
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Set the default schema
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Whether the type is described by formats
    pub fn is_complex(&self) -> bool {
        self.binding.is_complex()
    }

    /// Literal classification, `None` for complex types
    pub fn literal_kind(&self) -> Option<LiteralKind> {
        match self.binding {
            Binding::Literal(kind) => Some(kind),
            _ => None,
        }
    }
}

/// Registry of known type tags
#[derive(Debug, Clone, Default)]
pub struct DataTypeRegistry {
    types: BTreeMap<String, DataType>,
}

impl DataTypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type, replacing an earlier one with the same tag
    pub fn register(&mut self, data_type: DataType) {
        self.types.insert(data_type.key.to_ascii_lowercase(), data_type);
    }

    /// Look up a type tag, ignoring ASCII case
    pub fn get(&self, type_tag: &str) -> Option<&DataType> {
        self.types.get(&type_tag.trim().to_ascii_lowercase())
    }

    /// Literal classification of a type tag
    pub fn literal_kind_for(&self, type_tag: &str) -> Option<LiteralKind> {
        self.get(type_tag).and_then(DataType::literal_kind)
    }

    /// Registry with the built-in type tags
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();

        for (key, kind) in [
            ("integer", LiteralKind::Integer),
            ("double", LiteralKind::Double),
            ("numeric", LiteralKind::Double),
            ("string", LiteralKind::String),
            ("character", LiteralKind::String),
            ("boolean", LiteralKind::Boolean),
            ("logical", LiteralKind::Boolean),
        ] {
            registry.register(DataType::literal(key, kind));
        }

        registry.register(DataType::complex("text", "text/plain", Binding::GenericFile));
        registry.register(DataType::complex("csv", "text/csv", Binding::GenericFile));
        registry.register(DataType::complex("rdata", "application/rData", Binding::GenericFile));
        registry.register(DataType::complex("netcdf", "application/netcdf", Binding::GenericFile));
        registry.register(
            DataType::complex("png", "image/png", Binding::GenericFile).with_encoding("base64"),
        );
        registry.register(
            DataType::complex("jpeg", "image/jpeg", Binding::GenericFile).with_encoding("base64"),
        );
        registry.register(
            DataType::complex("gif", "image/gif", Binding::GenericFile).with_encoding("base64"),
        );
        registry.register(DataType::complex("geotiff", "image/geotiff", Binding::Raster));
        registry.register(DataType::complex(
            "shp",
            "application/x-zipped-shp",
            Binding::Vector,
        ));
        registry.register(DataType::complex(
            "kml",
            "application/vnd.google-earth.kml+xml",
            Binding::Vector,
        ));
        registry.register(
            DataType::complex("gml", "text/xml", Binding::Vector)
                .with_schema("http://schemas.opengis.net/gml/3.1.1/base/feature.xsd"),
        );

        registry
    }

    /// Built-in types overlaid with custom definitions
    pub fn with_custom_types(custom: impl IntoIterator<Item = DataType>) -> Self {
        let mut registry = Self::with_builtin_types();
        for data_type in custom {
            registry.register(data_type);
        }
        registry
    }
}
