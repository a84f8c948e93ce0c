//! Configuration file handling
//!
//! Every field has a default, so an empty JSON object is a complete
//! configuration. Registries are built from the configuration once and then
//! borrowed by the synthesizer and validator.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use url::Url;

use crate::datatype::{DataType, DataTypeRegistry};
use crate::formats::{FormatHandler, HandlerRegistry};
use crate::links::ResourceUrlGenerator;
use crate::parser::{AnnotationParser, MarkerMatching, ParseMode};
use crate::synthesizer::DescriptionSynthesizer;
use crate::validator::ScriptValidator;

/// Prefix turning a script id into a public process id
pub const DEFAULT_PUBLIC_ID_PREFIX: &str = "process.";

/// Base URL for generated links
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/wps/";

/// Processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub public_id_prefix: String,
    pub parse_mode: ParseMode,
    pub marker_matching: MarkerMatching,
    pub base_url: String,

    // Link exposure
    pub resource_download_enabled: bool,
    pub import_download_enabled: bool,
    pub script_download_enabled: bool,
    pub session_info_link_enabled: bool,

    /// Custom types, overriding built-in tags of the same name
    pub data_types: Vec<DataType>,

    /// Replaces the built-in input handlers when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_handlers: Option<Vec<FormatHandler>>,

    /// Replaces the built-in output handlers when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_handlers: Option<Vec<FormatHandler>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            public_id_prefix: DEFAULT_PUBLIC_ID_PREFIX.to_string(),
            parse_mode: ParseMode::default(),
            marker_matching: MarkerMatching::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            resource_download_enabled: true,
            import_download_enabled: true,
            script_download_enabled: true,
            session_info_link_enabled: true,
            data_types: Vec::new(),
            input_handlers: None,
            output_handlers: None,
        }
    }
}

impl Config {
    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.public_id_prefix.chars().any(char::is_whitespace) {
            anyhow::bail!("Public id prefix cannot contain whitespace");
        }

        let base = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base URL '{}'", self.base_url))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Base URL '{}' cannot be used as a base", self.base_url);
        }

        let mut seen = BTreeSet::new();
        for data_type in &self.data_types {
            if data_type.key.trim().is_empty() {
                anyhow::bail!("Custom data type with empty key");
            }
            if data_type.process_description_type.trim().is_empty() {
                anyhow::bail!(
                    "Custom data type '{}' has no process description type",
                    data_type.key
                );
            }
            if !seen.insert(data_type.key.to_ascii_lowercase()) {
                anyhow::bail!("Custom data type '{}' is defined twice", data_type.key);
            }
        }

        for handler in self
            .input_handlers
            .iter()
            .chain(self.output_handlers.iter())
            .flatten()
        {
            if handler.formats.is_empty() {
                anyhow::bail!("Format handler '{}' declares no formats", handler.name);
            }
        }

        Ok(())
    }

    /// Parser honouring the configured mode, matching and prefix
    pub fn parser(&self) -> AnnotationParser {
        AnnotationParser::new()
            .with_mode(self.parse_mode)
            .with_marker_matching(self.marker_matching)
            .with_public_id_prefix(self.public_id_prefix.clone())
    }

    /// Public process id of a script
    pub fn public_script_id(&self, script_id: &str) -> String {
        format!("{}{}", self.public_id_prefix, script_id)
    }

    /// Built-in types merged with the configured ones
    pub fn data_types(&self) -> DataTypeRegistry {
        DataTypeRegistry::with_custom_types(self.data_types.iter().cloned())
    }

    /// Input handlers, built-in unless configured
    pub fn input_handlers(&self) -> HandlerRegistry {
        match self.input_handlers {
            Some(ref handlers) => handlers.iter().cloned().collect(),
            None => HandlerRegistry::builtin_input_handlers(),
        }
    }

    /// Output handlers, built-in unless configured
    pub fn output_handlers(&self) -> HandlerRegistry {
        match self.output_handlers {
            Some(ref handlers) => handlers.iter().cloned().collect(),
            None => HandlerRegistry::builtin_output_handlers(),
        }
    }

    /// URL generator for the configured base URL
    pub fn url_generator(&self) -> Result<ResourceUrlGenerator> {
        let base = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base URL '{}'", self.base_url))?;
        Ok(ResourceUrlGenerator::new(base)?)
    }

    /// Build every registry the configuration describes
    pub fn registries(&self) -> Registries {
        Registries {
            parser: self.parser(),
            data_types: self.data_types(),
            input_handlers: self.input_handlers(),
            output_handlers: self.output_handlers(),
        }
    }
}

/// Owned parser and registries derived from a [`Config`]
#[derive(Debug, Clone)]
pub struct Registries {
    pub parser: AnnotationParser,
    pub data_types: DataTypeRegistry,
    pub input_handlers: HandlerRegistry,
    pub output_handlers: HandlerRegistry,
}

impl Registries {
    /// Synthesizer borrowing these registries
    pub fn synthesizer(&self) -> DescriptionSynthesizer<'_> {
        DescriptionSynthesizer::new(&self.data_types, &self.input_handlers, &self.output_handlers)
    }

    /// Validator borrowing these registries
    pub fn validator(&self) -> ScriptValidator<'_> {
        ScriptValidator::new(&self.parser, self.synthesizer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::{Binding, LiteralKind};
    use crate::formats::{Format, FormatRegistry};
    use tempfile::TempDir;

    #[test]
    fn test_empty_object_is_default() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.public_id_prefix, "process.");
        assert_eq!(config.parse_mode, ParseMode::Lenient);
        assert_eq!(config.marker_matching, MarkerMatching::Anchored);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("procdesc.json");

        let config = Config {
            public_id_prefix: "org.example.".to_string(),
            parse_mode: ParseMode::Strict,
            script_download_enabled: false,
            data_types: vec![DataType::literal("count", LiteralKind::Long)],
            ..Config::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json");
        let err = Config::load_from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("missing.json"));
    }

    #[test]
    fn test_partial_json() {
        let config: Config =
            serde_json::from_str(r#"{ "parse_mode": "strict", "marker_matching": "substring" }"#)
                .unwrap();
        assert_eq!(config.parse_mode, ParseMode::Strict);
        assert_eq!(config.marker_matching, MarkerMatching::Substring);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let config = Config {
            base_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            base_url: "mailto:someone@example.org".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_types() {
        let config = Config {
            data_types: vec![
                DataType::literal("count", LiteralKind::Long),
                DataType::literal("COUNT", LiteralKind::Integer),
            ],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_type_overrides_builtin() {
        let config = Config {
            data_types: vec![DataType::literal("integer", LiteralKind::Long)],
            ..Config::default()
        };
        let registry = config.data_types();
        assert_eq!(registry.literal_kind_for("integer"), Some(LiteralKind::Long));
        assert_eq!(registry.literal_kind_for("double"), Some(LiteralKind::Double));
    }

    #[test]
    fn test_configured_handlers_replace_builtin() {
        let config = Config {
            output_handlers: Some(vec![FormatHandler::new(
                "tiff-only",
                [Binding::Raster],
                [Format::new("image/tiff")],
            )]),
            ..Config::default()
        };
        let formats = config.output_handlers().formats_for(Binding::Raster);
        assert_eq!(formats, BTreeSet::from([Format::new("image/tiff")]));
        assert_eq!(config.input_handlers().formats_for(Binding::Raster).len(), 3);
    }

    #[test]
    fn test_parser_uses_prefix() {
        let config = Config {
            public_id_prefix: "org.example.".to_string(),
            ..Config::default()
        };
        assert_eq!(config.parser().public_script_id("demo"), "org.example.demo");
        assert_eq!(config.public_script_id("demo"), "org.example.demo");
    }
}
