//! Property-Based Tests for procdesc
//!
//! These tests verify:
//! - Parsing is a pure function of the script text
//! - Disabled annotation lines are never parsed
//! - Multi-line annotations concatenate their fragments
//! - Quoted values survive separators
//! - Grammar names round-trip through the attribute lookup

use proptest::prelude::*;

use procdesc::grammar::attribute_for;
use procdesc::{AnnotationKind, AnnotationParser, AttributeKey};

// =============================================================================
// Strategies
// =============================================================================

/// Plain attribute value without any grammar characters
fn plain_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.]{1,12}"
}

/// Value that may contain separators but no quotes or end markers
fn quotable_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,=:._-]{1,24}"
}

fn kind_strategy() -> impl Strategy<Value = AnnotationKind> {
    prop_oneof![
        Just(AnnotationKind::Description),
        Just(AnnotationKind::Input),
        Just(AnnotationKind::Output),
        Just(AnnotationKind::Resource),
        Just(AnnotationKind::Import),
        Just(AnnotationKind::Metadata),
    ]
}

/// Arbitrary script lines: code, comments, and annotation-looking text
fn script_line() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,8} <- [0-9]{1,4}",
        "# [a-zA-Z ]{0,20}",
        plain_value().prop_map(|id| format!("# wps.des: id = {};", id)),
        (plain_value(), plain_value())
            .prop_map(|(id, t)| format!("# wps.in: id = {}, type = {};", id, t)),
        plain_value().prop_map(|p| format!("# wps.resource: {};", p)),
        plain_value().prop_map(|p| format!("## wps.in: {};", p)),
    ]
}

// =============================================================================
// Parser Property Tests
// =============================================================================

proptest! {
    /// Parsing the same text twice yields equal results
    #[test]
    fn parse_is_deterministic(lines in prop::collection::vec(script_line(), 0..20)) {
        let script = lines.join("\n");
        let parser = AnnotationParser::new().with_public_id_prefix("process.");
        let first = parser.parse_str(&script);
        let second = parser.parse_str(&script);
        prop_assert_eq!(first.is_ok(), second.is_ok());
        if let (Ok(first), Ok(second)) = (first, second) {
            prop_assert_eq!(first, second);
        }
    }

    /// Lines starting with the disabled marker never produce annotations
    #[test]
    fn disabled_lines_are_ignored(
        kind in kind_strategy(),
        body in plain_value(),
        count in 1usize..5,
    ) {
        let line = format!("## {}: {};", kind, body);
        let script = vec![line; count].join("\n");
        let parsed = AnnotationParser::new().parse_str(&script).unwrap();
        prop_assert!(parsed.is_empty());
    }

    /// A value split across comment lines is the concatenation of the fragments
    #[test]
    fn fragments_concatenate(parts in prop::collection::vec(plain_value(), 1..4)) {
        let mut script = format!("# wps.des: id = demo, title = {}", parts[0]);
        for part in &parts[1..] {
            script.push_str(&format!("\n#   {}", part));
        }
        script.push_str(";\n");

        let parsed = AnnotationParser::new().parse_str(&script).unwrap();
        prop_assert_eq!(parsed.annotations.len(), 1);
        let title = parsed.annotations[0].raw_value(AttributeKey::Title).unwrap();
        let expected = parts.concat();
        prop_assert_eq!(title, Some(expected.as_str()));
    }

    /// Quoted metadata titles keep separators verbatim
    #[test]
    fn quoted_values_keep_separators(title in quotable_value()) {
        prop_assume!(!title.starts_with(' ') && !title.ends_with(' '));
        // empty tokens are dropped, so doubled separators collapse
        prop_assume!(!title.contains(",,"));
        let script = format!("# wps.metadata: title = \"{}\", href = http://example.org;\n", title);
        let parsed = AnnotationParser::new().parse_str(&script).unwrap();
        let value = parsed.annotations[0].raw_value(AttributeKey::Title).unwrap();
        prop_assert_eq!(value, Some(title.as_str()));
    }

    /// Every legal attribute name resolves to itself, whatever its case
    #[test]
    fn attribute_names_resolve(kind in kind_strategy(), upper in any::<bool>()) {
        for key in kind.legal_attributes() {
            let name = if upper { key.name().to_uppercase() } else { key.name().to_string() };
            prop_assert_eq!(attribute_for(kind, &name).unwrap(), *key);
        }
    }
}
