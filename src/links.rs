//! Download links for scripts and their resources
//!
//! URLs follow the layout `<base>/r/<area>/<process id>/<resource>`. Path
//! separators inside a resource name are replaced by [`SLASH_REPLACEMENT`] so
//! every resource occupies exactly one path segment.

use serde::{Deserialize, Serialize};
use tracing::{error, trace, warn};
use url::Url;

use crate::annotation::{filter_annotations, Annotation};
use crate::config::Config;
use crate::error::{AnnotationError, Result};
use crate::grammar::{AnnotationKind, AttributeKey};
use crate::parser::ParsedScript;

/// Stand-in for `/` inside a resource name
pub const SLASH_REPLACEMENT: &str = "$subdir$";

const ENDPOINT: &str = "r";
const RESOURCE_PATH: &str = "resource";
const IMPORT_PATH: &str = "import";
const SCRIPT_PATH: &str = "script";
const SESSION_INFO_PATH: &str = "sessionInfo";

pub const RESOURCE_TITLE_PREFIX: &str = "Resource: ";
pub const IMPORT_TITLE_PREFIX: &str = "Import: ";
pub const SCRIPT_LINK_TITLE: &str = "Script";
pub const SESSION_INFO_TITLE: &str = "Session info";

/// Builds public URLs below a base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUrlGenerator {
    base: Url,
}

impl ResourceUrlGenerator {
    /// Create a generator, rejecting URLs that cannot hold a path
    pub fn new(base: Url) -> Result<Self> {
        if base.cannot_be_a_base() {
            return Err(AnnotationError::InvalidUrl {
                value: base.to_string(),
                reason: "URL cannot be a base".to_string(),
            });
        }
        Ok(Self { base })
    }

    /// Parse the base URL and create a generator
    pub fn parse(base: &str) -> Result<Self> {
        let url = Url::parse(base).map_err(|e| AnnotationError::InvalidUrl {
            value: base.to_string(),
            reason: e.to_string(),
        })?;
        Self::new(url)
    }

    /// Base all URLs are built on
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// URL of a resource file owned by a process
    pub fn resource_url(&self, process_id: &str, resource_path: &str) -> Result<Url> {
        let url = self.build(&[
            RESOURCE_PATH,
            process_id,
            &internal_encode(resource_path),
        ])?;
        trace!(%url, resource = resource_path, "created resource url");
        Ok(url)
    }

    /// URL of an imported script owned by a process
    pub fn import_url(&self, process_id: &str, resource_path: &str) -> Result<Url> {
        self.build(&[IMPORT_PATH, process_id, &internal_encode(resource_path)])
    }

    /// URL of the process script itself
    pub fn script_url(&self, process_id: &str) -> Result<Url> {
        self.build(&[SCRIPT_PATH, process_id])
    }

    /// URL of the execution environment's session information
    pub fn session_info_url(&self) -> Result<Url> {
        self.build(&[SESSION_INFO_PATH])
    }

    fn build(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| AnnotationError::InvalidUrl {
                value: self.base.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .push(ENDPOINT)
            .extend(segments);
        Ok(url)
    }
}

/// Replace path separators so a resource name fits one URL segment
pub fn internal_encode(resource_path: &str) -> String {
    resource_path.replace('/', SLASH_REPLACEMENT)
}

/// Undo [`internal_encode`]
pub fn internal_decode(segment: &str) -> String {
    segment.replace(SLASH_REPLACEMENT, "/")
}

/// Named list expression mapping each resource name to its URL
///
/// Produces `list("name" = "url", ...)` for use inside the executed script.
/// Resources without an owning process fall back to `process_id`; a
/// resource whose URL cannot be built is left out.
pub fn named_list_expression(
    annotation: &Annotation,
    process_id: &str,
    generator: &ResourceUrlGenerator,
) -> Result<String> {
    let entries: Vec<String> = annotation
        .resources()?
        .iter()
        .filter_map(|resource| {
            let owner = resource.owning_process_id.as_deref().unwrap_or(process_id);
            match generator.resource_url(owner, &resource.resource_path) {
                Ok(url) => Some(format!("\"{}\" = \"{}\"", resource.resource_path, url)),
                Err(err) => {
                    error!(%resource, "could not create resource url: {}", err);
                    None
                }
            }
        })
        .collect();

    let list = format!("list({})", entries.join(", "));
    trace!(list = %list, "created resource list");
    Ok(list)
}

/// A titled link advertised with a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataLink {
    pub title: String,
    pub href: String,
}

impl MetadataLink {
    fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
        }
    }
}

/// Every link a parsed script advertises
///
/// Metadata annotations come first, followed by public resources, public
/// imports, the script and the session information. The last four groups
/// are each governed by their download flag in `config`.
pub fn collect_links(
    parsed: &ParsedScript,
    script_id: &str,
    generator: &ResourceUrlGenerator,
    config: &Config,
) -> Result<Vec<MetadataLink>> {
    let process_id = config.public_script_id(script_id);
    let mut links = Vec::new();

    for annotation in filter_annotations(&parsed.annotations, AnnotationKind::Metadata) {
        let title = annotation.raw_value(AttributeKey::Title)?.unwrap_or_default();
        let href = annotation.raw_value(AttributeKey::Href)?.unwrap_or_default();
        if title.is_empty() || href.is_empty() {
            warn!(%annotation, "cannot add metadata link without title and href");
            continue;
        }
        links.push(MetadataLink::new(title, href));
    }

    if config.resource_download_enabled {
        collect_resources(parsed, AnnotationKind::Resource, &process_id, &mut links, |owner, path| {
            generator.resource_url(owner, path)
        })?;
    }

    if config.import_download_enabled {
        collect_resources(parsed, AnnotationKind::Import, &process_id, &mut links, |owner, path| {
            generator.import_url(owner, path)
        })?;
    }

    if config.script_download_enabled {
        let url = generator.script_url(&process_id)?;
        links.push(MetadataLink::new(SCRIPT_LINK_TITLE, url));
    } else {
        trace!("script download link disabled");
    }

    if config.session_info_link_enabled {
        let url = generator.session_info_url()?;
        links.push(MetadataLink::new(SESSION_INFO_TITLE, url));
    } else {
        trace!("session info link disabled");
    }

    Ok(links)
}

fn collect_resources<F>(
    parsed: &ParsedScript,
    kind: AnnotationKind,
    process_id: &str,
    links: &mut Vec<MetadataLink>,
    url_for: F,
) -> Result<()>
where
    F: Fn(&str, &str) -> Result<Url>,
{
    let prefix = match kind {
        AnnotationKind::Import => IMPORT_TITLE_PREFIX,
        _ => RESOURCE_TITLE_PREFIX,
    };

    for annotation in filter_annotations(&parsed.annotations, kind) {
        for resource in annotation.resources()? {
            if !resource.is_public {
                trace!(%resource, "not adding link to private resource");
                continue;
            }
            let owner = resource.owning_process_id.as_deref().unwrap_or(process_id);
            let url = url_for(owner, &resource.resource_path)?;
            links.push(MetadataLink::new(
                format!("{}{}", prefix, resource.resource_path),
                url,
            ));
        }
    }
    Ok(())
}
