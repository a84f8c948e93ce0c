//! Body tokenizers
//!
//! Annotation bodies are split on `,`. A value opened by `"` keeps absorbing
//! the following tokens (with the separator put back) until the quote is
//! closed, so separators inside quotes never split a value. Zero-length
//! tokens are skipped, which makes `a,,b` equivalent to `a,b`.

use crate::annotation::{AttributeMap, ResourceRef};
use crate::error::{AnnotationError, Result};
use crate::grammar::{attribute_for, AnnotationKind, ATTRIBUTE_SEPARATOR, ATTRIBUTE_VALUE_SEPARATOR, QUOTE};

fn tokens(body: &str) -> impl Iterator<Item = &str> {
    body.split(ATTRIBUTE_SEPARATOR).filter(|token| !token.is_empty())
}

fn is_closed(value: &str) -> bool {
    let value = value.trim();
    value.len() > 1 && value.ends_with(QUOTE)
}

/// Strip the quotes of a value starting with `"`, re-joining tokens until the
/// closing quote shows up
fn unquote<'a>(first: &str, rest: &mut impl Iterator<Item = &'a str>) -> Result<String> {
    let mut value = first.to_string();
    while !is_closed(&value) {
        match rest.next() {
            Some(next) => {
                value.push(ATTRIBUTE_SEPARATOR);
                value.push_str(next);
            }
            None => break,
        }
    }

    match (value.find(QUOTE), value.rfind(QUOTE)) {
        (Some(open), Some(close)) if close > open => Ok(value[open + 1..close].to_string()),
        _ => Err(AnnotationError::malformed(format!(
            "unterminated quote in '{}'",
            value.trim()
        ))),
    }
}

/// Tokenize a resource or import body into references
///
/// Every token becomes one reference, in order, duplicates included.
pub fn tokenize_resources(
    body: &str,
    owning_process_id: Option<&str>,
    default_visibility: bool,
) -> Result<Vec<ResourceRef>> {
    let mut refs = Vec::new();
    let mut tokens = tokens(body);

    while let Some(token) = tokens.next() {
        let trimmed = token.trim();
        let path = if trimmed.starts_with(QUOTE) {
            unquote(trimmed, &mut tokens)?
        } else {
            trimmed.to_string()
        };

        refs.push(ResourceRef::new(
            owning_process_id.map(str::to_string),
            path,
            default_visibility,
        ));
    }

    Ok(refs)
}

/// Tokenize an attribute body into a key/value map
///
/// Valid bodies:
/// 1. fully positional: `wps.in: name, description, 0, 1;`
/// 2. positional then keyword: `wps.in: name, description, maxOccurs = 1;`
/// 3. fully keyword: `wps.des: abstract = example process, title = Example1;`
///
/// A positional value after the first keyword value cannot be bound and is
/// rejected.
pub fn tokenize_attributes(kind: AnnotationKind, body: &str) -> Result<AttributeMap> {
    let mut attributes = AttributeMap::new();
    let mut sequential = true;
    // slot 0 is the start key placeholder
    let mut sequence = kind.attribute_sequence().iter().skip(1);
    let mut tokens = tokens(body);

    while let Some(token) = tokens.next() {
        let trimmed = token.trim();

        let positional = if trimmed.starts_with(QUOTE) {
            unquote(trimmed, &mut tokens)?
        } else if let Some((name, value)) = trimmed.split_once(ATTRIBUTE_VALUE_SEPARATOR) {
            sequential = false;
            let key = attribute_for(kind, name)?;
            let value = value.trim();
            let value = if value.starts_with(QUOTE) {
                unquote(value, &mut tokens)?
            } else {
                value.to_string()
            };
            attributes.insert(key, value);
            continue;
        } else {
            trimmed.to_string()
        };

        if !sequential {
            return Err(AnnotationError::malformed(format!(
                "Annotation contains no valid order: \"{} {}\"",
                kind, body
            )));
        }

        let key = sequence.next().ok_or_else(|| {
            AnnotationError::malformed(format!(
                "too many positional values for '{}': \"{}\"",
                kind, body
            ))
        })?;
        attributes.insert(*key, positional);
    }

    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::AttributeKey;

    #[test]
    fn test_positional_binding_follows_sequence() {
        let map = tokenize_attributes(AnnotationKind::Input, "id, desc, 0, 1").unwrap();
        assert_eq!(map[&AttributeKey::Identifier], "id");
        assert_eq!(map[&AttributeKey::Title], "desc");
        assert_eq!(map[&AttributeKey::MinOccurs], "0");
        assert_eq!(map[&AttributeKey::MaxOccurs], "1");
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_positional_then_keyword() {
        let map =
            tokenize_attributes(AnnotationKind::Input, "name, description, maxOccurs = 3").unwrap();
        assert_eq!(map[&AttributeKey::Identifier], "name");
        assert_eq!(map[&AttributeKey::Title], "description");
        assert_eq!(map[&AttributeKey::MaxOccurs], "3");
    }

    #[test]
    fn test_positional_after_keyword_is_malformed() {
        let err =
            tokenize_attributes(AnnotationKind::Input, "id, title, maxOccurs = 1, 2").unwrap_err();
        assert!(matches!(err, AnnotationError::MalformedAnnotation { .. }));
    }

    #[test]
    fn test_quoted_value_keeps_separator() {
        let map =
            tokenize_attributes(AnnotationKind::Metadata, "title = \"A, B\", href = \"http://x\"")
                .unwrap();
        assert_eq!(map[&AttributeKey::Title], "A, B");
        assert_eq!(map[&AttributeKey::Href], "http://x");
    }

    #[test]
    fn test_value_split_on_first_separator_only() {
        let map = tokenize_attributes(
            AnnotationKind::Metadata,
            "title = query, href = http://x.org/q?a=b",
        )
        .unwrap();
        assert_eq!(map[&AttributeKey::Href], "http://x.org/q?a=b");
    }

    #[test]
    fn test_quoted_positional_is_never_a_key() {
        let map = tokenize_attributes(AnnotationKind::Description, "\"a = b\", Title").unwrap();
        assert_eq!(map[&AttributeKey::Identifier], "a = b");
        assert_eq!(map[&AttributeKey::Title], "Title");
    }

    #[test]
    fn test_unknown_keyword() {
        let err = tokenize_attributes(AnnotationKind::Output, "id = x, minOccurs = 0").unwrap_err();
        assert!(matches!(err, AnnotationError::UnknownAttribute { .. }));
    }

    #[test]
    fn test_unterminated_quote() {
        let err = tokenize_attributes(AnnotationKind::Description, "title = \"never closed, x")
            .unwrap_err();
        assert!(matches!(err, AnnotationError::MalformedAnnotation { .. }));

        let err = tokenize_attributes(AnnotationKind::Description, "\"").unwrap_err();
        assert!(matches!(err, AnnotationError::MalformedAnnotation { .. }));
    }

    #[test]
    fn test_too_many_positional_values() {
        let err = tokenize_attributes(AnnotationKind::Metadata, "a, http://x, extra").unwrap_err();
        assert!(matches!(err, AnnotationError::MalformedAnnotation { .. }));
    }

    #[test]
    fn test_empty_tokens_are_skipped() {
        let map = tokenize_attributes(AnnotationKind::Description, "a,,b,").unwrap();
        assert_eq!(map[&AttributeKey::Identifier], "a");
        assert_eq!(map[&AttributeKey::Title], "b");
    }

    #[test]
    fn test_resources_in_order_with_duplicates() {
        let refs = tokenize_resources(
            "data.csv, lib/helpers.R, \"odd, name.txt\", data.csv",
            Some("process.demo"),
            true,
        )
        .unwrap();
        let paths: Vec<&str> = refs.iter().map(|r| r.resource_path.as_str()).collect();
        assert_eq!(paths, vec!["data.csv", "lib/helpers.R", "odd, name.txt", "data.csv"]);
        assert!(refs.iter().all(|r| r.is_public));
        assert!(refs
            .iter()
            .all(|r| r.owning_process_id.as_deref() == Some("process.demo")));
    }

    #[test]
    fn test_resources_without_owner() {
        let refs = tokenize_resources("a.txt", None, false).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].owning_process_id, None);
        assert!(!refs[0].is_public);
    }
}
