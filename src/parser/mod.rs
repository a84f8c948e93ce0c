//! Annotation scanner and parser
//!
//! Reads a script line by line and turns its comment-embedded annotations
//! into an ordered [`Annotation`] list.
//!
//! # Line Handling
//!
//! - Only lines whose trimmed text starts with `#` (but not `##`) are looked at
//! - An annotation starts on a line carrying a start marker and may span
//!   several comment lines; fragments are concatenated without separator
//! - The annotation ends at the first `;`, anything after it is ignored
//! - Lines are decoded lossily, so stray non-UTF-8 bytes in code lines do
//!   not abort the scan
//!
//! Parsing fails fast: the first broken annotation aborts the whole script
//! with [`AnnotationError::ScriptAnnotation`] and no partial list is returned.

pub mod tokenizer;

use serde::{Deserialize, Serialize};
use std::io::BufRead;
use tracing::{debug, error, trace, warn};

use crate::annotation::Annotation;
use crate::error::{AnnotationError, Result};
use crate::grammar::{
    AnnotationKind, AttributeKey, ANNOTATION_END, COMMENT_MARKER, DISABLED_MARKER,
    STARTKEY_SEPARATOR,
};

pub use tokenizer::{tokenize_attributes, tokenize_resources};

const DEFAULT_RESOURCE_VISIBILITY: bool = true;
const DEFAULT_IMPORT_VISIBILITY: bool = true;

/// Handling of an annotation still open when the script ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Drop the open annotation and log a warning
    #[default]
    Lenient,
    /// Fail with the line where the open annotation started
    Strict,
}

/// How start markers are recognized on a comment line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerMatching {
    /// Marker must open the line, followed by optional whitespace and `:`
    #[default]
    Anchored,
    /// Marker may appear anywhere in the line (legacy scripts)
    Substring,
}

/// Result of parsing one script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedScript {
    /// Annotations in source order
    pub annotations: Vec<Annotation>,

    /// Identifier of the first description annotation that declares one
    pub script_id: Option<String>,
}

impl ParsedScript {
    /// Whether no annotation was found
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

/// Annotation currently being accumulated
#[derive(Debug)]
struct OpenAnnotation {
    kind: AnnotationKind,
    start_line: usize,
    body: String,
}

/// Line-oriented annotation parser
#[derive(Debug, Clone, Default)]
pub struct AnnotationParser {
    mode: ParseMode,
    matching: MarkerMatching,
    public_id_prefix: String,
}

impl AnnotationParser {
    /// Create a parser with lenient mode, anchored markers and no id prefix
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unterminated-annotation handling
    pub fn with_mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the start-marker matching strategy
    pub fn with_marker_matching(mut self, matching: MarkerMatching) -> Self {
        self.matching = matching;
        self
    }

    /// Set the prefix turning script ids into public process ids
    pub fn with_public_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.public_id_prefix = prefix.into();
        self
    }

    /// Public process id of a script id
    pub fn public_script_id(&self, script_id: &str) -> String {
        format!("{}{}", self.public_id_prefix, script_id)
    }

    /// Parse annotations from script text
    pub fn parse_str(&self, script: &str) -> Result<ParsedScript> {
        self.parse(script.as_bytes())
    }

    /// Parse annotations from a script stream
    pub fn parse<R: BufRead>(&self, mut reader: R) -> Result<ParsedScript> {
        let mut annotations = Vec::new();
        let mut script_id: Option<String> = None;
        let mut open: Option<OpenAnnotation> = None;
        let mut buf = Vec::new();
        let mut line_number = 0;

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| AnnotationError::from(e).at_line(line_number + 1))?;
            if read == 0 {
                break;
            }
            line_number += 1;
            let line = String::from_utf8_lossy(&buf);

            let Some(mut text) = annotation_text(&line) else {
                continue;
            };
            trace!(line = line_number, text, "parsing annotation line");

            let mut current = match open.take() {
                Some(current) => current,
                None => {
                    let Some(kind) = self.match_start(text) else {
                        continue;
                    };
                    trace!(line = line_number, %kind, "annotation start");
                    text = match text.split_once(STARTKEY_SEPARATOR) {
                        Some((_, rest)) => rest,
                        None => {
                            let err = AnnotationError::malformed(format!(
                                "'{}' is not followed by '{}'",
                                kind, STARTKEY_SEPARATOR
                            ));
                            error!(line = line_number, "invalid script annotation: {}", err);
                            return Err(err.at_line(line_number));
                        }
                    };
                    OpenAnnotation {
                        kind,
                        start_line: line_number,
                        body: String::new(),
                    }
                }
            };

            let (fragment, complete) = match text.find(ANNOTATION_END) {
                Some(end) => (&text[..end], true),
                None => (text, false),
            };
            current.body.push_str(fragment);

            if !complete {
                open = Some(current);
                continue;
            }

            let annotation = self
                .materialize(current.kind, &current.body, script_id.as_deref())
                .map_err(|err| {
                    error!(line = line_number, "invalid script annotation: {}", err);
                    err.at_line(line_number)
                })?;

            if script_id.is_none() && annotation.kind() == AnnotationKind::Description {
                script_id = annotation
                    .raw_value(AttributeKey::Identifier)
                    .map_err(|err| err.at_line(line_number))?
                    .map(str::to_string);
            }

            trace!(%annotation, script_id = ?script_id, "done parsing annotation");
            annotations.push(annotation);
        }

        if let Some(unterminated) = open {
            match self.mode {
                ParseMode::Lenient => warn!(
                    line = unterminated.start_line,
                    kind = %unterminated.kind,
                    "dropping annotation without '{}'",
                    ANNOTATION_END
                ),
                ParseMode::Strict => {
                    let err = AnnotationError::malformed(format!(
                        "'{}' annotation is not terminated with '{}'",
                        unterminated.kind, ANNOTATION_END
                    ));
                    error!(line = unterminated.start_line, "invalid script annotation: {}", err);
                    return Err(err.at_line(unterminated.start_line));
                }
            }
        }

        debug!(
            count = annotations.len(),
            script_id = ?script_id,
            "finished parsing annotations"
        );
        Ok(ParsedScript {
            annotations,
            script_id,
        })
    }

    fn match_start(&self, text: &str) -> Option<AnnotationKind> {
        AnnotationKind::all().find(|kind| {
            let marker = kind.start_marker();
            match self.matching {
                MarkerMatching::Substring => text.contains(marker),
                MarkerMatching::Anchored => text
                    .strip_prefix(marker)
                    .is_some_and(|rest| rest.trim_start().starts_with(STARTKEY_SEPARATOR)),
            }
        })
    }

    /// Turn an accumulated body into an annotation
    ///
    /// `script_id` is the identifier derived so far; resource and import
    /// references are owned by its public id.
    pub fn materialize(
        &self,
        kind: AnnotationKind,
        body: &str,
        script_id: Option<&str>,
    ) -> Result<Annotation> {
        match kind {
            AnnotationKind::Resource | AnnotationKind::Import => {
                let visibility = if kind == AnnotationKind::Resource {
                    DEFAULT_RESOURCE_VISIBILITY
                } else {
                    DEFAULT_IMPORT_VISIBILITY
                };
                let owner = script_id.map(|id| self.public_script_id(id));
                let refs = tokenize_resources(body, owner.as_deref(), visibility)?;
                Annotation::resource_list(kind, refs)
            }
            _ => Annotation::generic(kind, tokenize_attributes(kind, body)?),
        }
    }
}

/// Annotation text of a line without its comment marker, if it is a candidate
fn annotation_text(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if !trimmed.starts_with(COMMENT_MARKER) || trimmed.starts_with(DISABLED_MARKER) {
        return None;
    }
    let text = trimmed[COMMENT_MARKER.len()..].trim();
    (!text.is_empty()).then_some(text)
}
