//! Batch description of externally supplied scripts
//!
//! One failing script never affects the others: each is parsed and
//! synthesized on its own and either ends up described or rejected.

use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::{Config, Registries};
use crate::description::ProcessDescription;
use crate::error::AnnotationError;

/// Script text together with its identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    pub id: String,
    pub text: String,
}

impl ScriptSource {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A script that could not be described
#[derive(Debug)]
pub struct Rejection {
    pub script_id: String,
    pub error: AnnotationError,
}

/// Outcome of describing a batch of scripts
#[derive(Debug, Default)]
pub struct Catalog {
    pub described: Vec<ProcessDescription>,
    pub rejected: Vec<Rejection>,
}

impl Catalog {
    /// Description with the given public id
    pub fn get(&self, process_id: &str) -> Option<&ProcessDescription> {
        self.described.iter().find(|d| d.id == process_id)
    }

    /// Serializable summary, errors rendered as text
    pub fn report(&self) -> CatalogReport<'_> {
        CatalogReport {
            described: &self.described,
            rejected: self
                .rejected
                .iter()
                .map(|r| RejectionReport {
                    script_id: &r.script_id,
                    error: r.error.to_string(),
                    line: r.error.line(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CatalogReport<'a> {
    pub described: &'a [ProcessDescription],
    pub rejected: Vec<RejectionReport<'a>>,
}

#[derive(Debug, Serialize)]
pub struct RejectionReport<'a> {
    pub script_id: &'a str,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// Describe every script, in input order
///
/// The process id of each description is the configured public id of the
/// script's own identifier.
pub fn describe_all<'s>(
    scripts: impl IntoIterator<Item = &'s ScriptSource>,
    config: &Config,
    registries: &Registries,
) -> Catalog {
    let synthesizer = registries.synthesizer();
    let mut catalog = Catalog::default();

    for script in scripts {
        let process_id = config.public_script_id(&script.id);
        let result = registries
            .parser
            .parse_str(&script.text)
            .and_then(|parsed| synthesizer.synthesize(&parsed.annotations, &process_id));

        match result {
            Ok(description) => {
                debug!(process = %process_id, "described script");
                catalog.described.push(description);
            }
            Err(err) => {
                error!(script = %script.id, "could not describe script: {}", err);
                catalog.rejected.push(Rejection {
                    script_id: script.id.clone(),
                    error: err,
                });
            }
        }
    }

    info!(
        described = catalog.described.len(),
        rejected = catalog.rejected.len(),
        "catalog complete"
    );
    catalog
}
