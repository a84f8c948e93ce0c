//! procdesc library
//!
//! Parses annotations embedded as structured comments in script files and
//! turns them into typed process descriptions.
//!
//! ```text
//! script text -> parser -> annotations -> validator / synthesizer -> ProcessDescription
//! ```

pub mod annotation;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod datatype;
pub mod description;
pub mod error;
pub mod formats;
pub mod grammar;
pub mod links;
pub mod parser;
pub mod synthesizer;
pub mod validator;

// Re-export main types for convenience
pub use annotation::{filter_annotations, Annotation, AttributeMap, ResourceRef};
pub use catalog::{describe_all, Catalog, ScriptSource};
pub use config::{Config, Registries};
pub use datatype::{Binding, DataType, DataTypeRegistry, LiteralKind};
pub use description::{
    ComplexData, DataDescription, InputDescription, LiteralData, Occurrence, OutputDescription,
    ProcessDescription,
};
pub use error::{AnnotationError, Result};
pub use formats::{Format, FormatHandler, FormatRegistry, HandlerRegistry};
pub use grammar::{AnnotationKind, AttributeKey};
pub use links::{collect_links, MetadataLink, ResourceUrlGenerator};
pub use parser::{AnnotationParser, MarkerMatching, ParseMode, ParsedScript};
pub use synthesizer::DescriptionSynthesizer;
pub use validator::ScriptValidator;
