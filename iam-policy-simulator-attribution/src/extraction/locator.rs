//! Locating a parsed statement inside the text it was parsed from.
//!
//! The default [`BraceCountingLocator`] is a text heuristic, not a JSON
//! tokenizer. It expects conventionally pretty-printed policies where every
//! statement's opening `{` sits on a line of its own. Policies that put a
//! whole statement on one line defeat the backward brace search and come back
//! as [`LineRange::UNKNOWN`]. Callers depend only on [`StatementLocator`], so a
//! position-aware JSON parser can replace the heuristic later.

use log::{debug, trace};
use serde_json::Value;

use crate::types::{LineRange, Statement};

/// Finds the 1-based line range of a statement within its source text
pub trait StatementLocator {
    /// Returns [`LineRange::UNKNOWN`] when the statement cannot be found.
    fn locate(&self, source: &str, statement: &Statement, index: usize) -> LineRange;
}

/// Marker search followed by brace counting
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceCountingLocator;

impl StatementLocator for BraceCountingLocator {
    fn locate(&self, source: &str, statement: &Statement, index: usize) -> LineRange {
        let Some(marker) = SearchMarker::for_statement(statement) else {
            debug!("Statement {index} has neither Sid nor Effect to search for");
            return LineRange::UNKNOWN;
        };

        let lines: Vec<&str> = source.lines().collect();
        let Some(hit) = lines.iter().position(|line| marker.matches(line)) else {
            debug!(
                "No line matches {}: \"{}\" for statement {index}",
                marker.field, marker.value
            );
            return LineRange::UNKNOWN;
        };

        let Some(start) = (0..=hit).rev().find(|&i| lines[i].trim() == "{") else {
            debug!("No opening brace line above line {} for statement {index}", hit + 1);
            return LineRange::UNKNOWN;
        };

        match closing_line(&lines, start) {
            Some(end) => {
                trace!("Statement {index} spans lines {}-{}", start + 1, end + 1);
                LineRange::new(start + 1, end + 1)
            }
            None => {
                debug!(
                    "Braces never balance after line {} for statement {index}",
                    start + 1
                );
                LineRange::UNKNOWN
            }
        }
    }
}

/// The field/value pair searched for: the original `Sid`, else the `Effect`.
struct SearchMarker<'a> {
    field: &'static str,
    value: &'a str,
}

impl<'a> SearchMarker<'a> {
    fn for_statement(statement: &'a Statement) -> Option<Self> {
        let non_empty = |key: &str| match statement.get(key) {
            Some(Value::String(value)) if !value.is_empty() => Some(value.as_str()),
            _ => None,
        };

        non_empty("Sid")
            .map(|value| Self {
                field: "\"Sid\"",
                value,
            })
            .or_else(|| {
                non_empty("Effect").map(|value| Self {
                    field: "\"Effect\"",
                    value,
                })
            })
    }

    /// `"Field"`, optional whitespace, `:`, optional whitespace, then the quoted value
    fn matches(&self, line: &str) -> bool {
        let Some(at) = line.find(self.field) else {
            return false;
        };
        let rest = line[at + self.field.len()..].trim_start();
        let Some(rest) = rest.strip_prefix(':') else {
            return false;
        };
        rest.trim_start()
            .strip_prefix('"')
            .and_then(|quoted| quoted.strip_prefix(self.value))
            .is_some_and(|tail| tail.starts_with('"'))
    }
}

/// Index of the line on which the braces opened at `start` balance again.
/// String contents are not skipped.
fn closing_line(lines: &[&str], start: usize) -> Option<usize> {
    let mut depth: usize = 0;
    for (offset, line) in lines[start..].iter().enumerate() {
        for c in line.chars() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(start + offset);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const POLICY: &str = r#"{
  "Version": "2012-10-17",
  "Statement": [
    {
      "Sid": "AllowRead",
      "Effect": "Allow",
      "Action": "s3:GetObject",
      "Resource": "*"
    },
    {
      "Sid": "DenyS3",
      "Effect": "Deny",
      "Action": "s3:*",
      "Resource": "*",
      "Condition": {
        "Bool": { "aws:SecureTransport": "false" }
      }
    },
    {
      "Effect": "Deny",
      "Action": "iam:*",
      "Resource": "*"
    }
  ]
}"#;

    fn statement(value: serde_json::Value) -> Statement {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_locates_statement_by_sid() {
        let stmt = statement(json!({"Sid": "AllowRead", "Effect": "Allow"}));
        assert_eq!(
            BraceCountingLocator.locate(POLICY, &stmt, 0),
            LineRange::new(4, 9)
        );
    }

    #[test]
    fn test_nested_braces_extend_range() {
        let stmt = statement(json!({"Sid": "DenyS3", "Effect": "Deny"}));
        assert_eq!(
            BraceCountingLocator.locate(POLICY, &stmt, 1),
            LineRange::new(10, 18)
        );
    }

    #[test]
    fn test_sid_is_matched_exactly_not_as_prefix() {
        let stmt = statement(json!({"Sid": "Deny", "Effect": "Deny"}));
        assert_eq!(
            BraceCountingLocator.locate(POLICY, &stmt, 1),
            LineRange::UNKNOWN
        );
    }

    #[test]
    fn test_falls_back_to_first_effect_match() {
        let stmt = statement(json!({"Effect": "Deny", "Action": "iam:*"}));
        // First Deny in the file is the DenyS3 statement
        assert_eq!(
            BraceCountingLocator.locate(POLICY, &stmt, 2),
            LineRange::new(10, 18)
        );
    }

    #[test]
    fn test_empty_sid_falls_back_to_effect() {
        let stmt = statement(json!({"Sid": "", "Effect": "Allow"}));
        assert_eq!(
            BraceCountingLocator.locate(POLICY, &stmt, 0),
            LineRange::new(4, 9)
        );
    }

    #[test]
    fn test_no_marker_returns_unknown() {
        let stmt = statement(json!({"Action": "s3:*"}));
        assert_eq!(
            BraceCountingLocator.locate(POLICY, &stmt, 0),
            LineRange::UNKNOWN
        );
    }

    #[test]
    fn test_single_line_statement_is_known_limitation() {
        let source = r#"{"Statement": [{"Sid": "Inline", "Effect": "Allow"}]}"#;
        let stmt = statement(json!({"Sid": "Inline", "Effect": "Allow"}));
        assert_eq!(
            BraceCountingLocator.locate(source, &stmt, 0),
            LineRange::UNKNOWN
        );
    }

    #[test]
    fn test_truncated_file_returns_unknown() {
        let source = "{\n  \"Statement\": [\n    {\n      \"Sid\": \"Cut\",\n";
        let stmt = statement(json!({"Sid": "Cut"}));
        assert_eq!(
            BraceCountingLocator.locate(source, &stmt, 0),
            LineRange::UNKNOWN
        );
    }

    #[test]
    fn test_hand_written_spacing_is_accepted() {
        let source = "[\n  {\n    \"Sid\" :   \"Spaced\",\n    \"Effect\":\"Allow\"\n  }\n]\n";
        let stmt = statement(json!({"Sid": "Spaced", "Effect": "Allow"}));
        assert_eq!(
            BraceCountingLocator.locate(source, &stmt, 0),
            LineRange::new(2, 5)
        );
    }

    proptest! {
        #[test]
        fn absent_markers_never_panic_and_stay_unknown(
            source in ".{0,400}",
            sid in "[A-Za-z0-9]{1,12}",
        ) {
            let marker = format!("ZZ{sid}ZZ");
            prop_assume!(!source.contains(&marker));
            let stmt = statement(json!({"Sid": marker}));
            prop_assert_eq!(
                BraceCountingLocator.locate(&source, &stmt, 0),
                LineRange::UNKNOWN
            );
        }

        #[test]
        fn absent_effect_without_sid_stays_unknown(
            source in "(?s).{0,400}",
            effect in "[A-Za-z]{1,12}",
        ) {
            let marker = format!("ZZ{effect}ZZ");
            prop_assume!(!source.contains(&marker));
            let stmt = statement(json!({"Effect": marker, "Action": "s3:*"}));
            prop_assert_eq!(
                BraceCountingLocator.locate(&source, &stmt, 0),
                LineRange::UNKNOWN
            );
        }
    }

    #[test]
    fn test_effect_value_missing_from_text_returns_unknown() {
        let stmt = statement(json!({"Effect": "Audit", "Action": "s3:*"}));
        assert_eq!(
            BraceCountingLocator.locate(POLICY, &stmt, 2),
            LineRange::UNKNOWN
        );
    }
}
