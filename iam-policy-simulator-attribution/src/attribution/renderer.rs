//! Human-readable rendering of attributions

use log::warn;
use std::io::{self, Write};

use super::Attribution;
use crate::types::PolicyKind;

/// Writes the console block for one attribution:
///
/// ```text
///     • PermissionsBoundaryPolicyInputList.1 (Sid: PreventDataLoss)
///       Source: scp/06-deny-s3-delete.json:4-10
///       4:     {
///       5:       "Sid": "PreventDataLoss",
/// ```
///
/// The excerpt is read from disk at render time so it shows the file as it is now.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributionRenderer;

/// Indent of the bullet line; details sit two columns further in
const INDENT: usize = 4;

impl AttributionRenderer {
    /// Render `attribution` to `out`
    ///
    /// # Errors
    ///
    /// Returns any error from writing to `out`.
    pub fn render<W: Write>(&self, attribution: &Attribution, out: &mut W) -> io::Result<()> {
        let pad = " ".repeat(INDENT);
        let detail_pad = " ".repeat(INDENT + 2);

        if attribution.kind == PolicyKind::Unknown {
            return writeln!(out, "{pad}• {} (unknown source)", attribution.source_policy_id);
        }

        match (&attribution.original_sid, &attribution.tracking_id) {
            (Some(sid), _) => writeln!(out, "{pad}• {} (Sid: {sid})", attribution.source_policy_id)?,
            (None, Some(tracking_id)) => writeln!(
                out,
                "{pad}• {} (tracking id: {tracking_id})",
                attribution.source_policy_id
            )?,
            (None, None) => writeln!(out, "{pad}• {}", attribution.source_policy_id)?,
        }

        let Some(source) = &attribution.source else {
            return Ok(());
        };
        let lines = source.lines();
        if !lines.is_known() {
            return writeln!(out, "{detail_pad}Source: {}", source.file_path.display());
        }
        writeln!(
            out,
            "{detail_pad}Source: {}:{}-{}",
            source.file_path.display(),
            lines.start,
            lines.end
        )?;

        match std::fs::read_to_string(&source.file_path) {
            Ok(contents) => {
                for (number, line) in contents
                    .lines()
                    .enumerate()
                    .map(|(i, line)| (i + 1, line))
                    .skip(lines.start - 1)
                    .take(lines.end - lines.start + 1)
                {
                    writeln!(out, "{detail_pad}{number}: {line}")?;
                }
            }
            Err(e) => warn!(
                "Could not re-read '{}' for the excerpt: {e}",
                source.file_path.display()
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PolicySource, TrackingId};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn render(attribution: &Attribution) -> String {
        let mut out = Vec::new();
        AttributionRenderer::default()
            .render(attribution, &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    fn attribution(source: Option<PolicySource>, sid: Option<&str>) -> Attribution {
        Attribution {
            source_policy_id: "PermissionsBoundaryPolicyInputList.1".to_string(),
            kind: PolicyKind::PermissionsBoundary,
            tracking_id: Some(TrackingId::from("scp:deny.json#stmt:0")),
            original_sid: sid.map(str::to_string),
            source,
        }
    }

    #[test]
    fn test_renders_header_source_and_excerpt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deny.json");
        std::fs::write(
            &path,
            "{\n  \"Statement\": [\n    {\n      \"Sid\": \"PreventDataLoss\",\n      \"Effect\": \"Deny\"\n    }\n  ]\n}\n",
        )
        .unwrap();
        let source = PolicySource {
            file_path: path.clone(),
            original_sid: "PreventDataLoss".to_string(),
            index: 0,
            start_line: 3,
            end_line: 6,
        };

        let rendered = render(&attribution(Some(source), Some("PreventDataLoss")));

        let expected = format!(
            "    • PermissionsBoundaryPolicyInputList.1 (Sid: PreventDataLoss)\n      Source: {}:3-6\n      3:     {{\n      4:       \"Sid\": \"PreventDataLoss\",\n      5:       \"Effect\": \"Deny\"\n      6:     }}\n",
            path.display()
        );
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_excerpt_reflects_current_file_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deny.json");
        std::fs::write(&path, "{\n  \"Sid\": \"Before\"\n}\n").unwrap();
        let source = PolicySource {
            file_path: path.clone(),
            original_sid: "Before".to_string(),
            index: 0,
            start_line: 1,
            end_line: 3,
        };
        std::fs::write(&path, "{\n  \"Sid\": \"After\"\n}\n").unwrap();

        let rendered = render(&attribution(Some(source), Some("Before")));

        assert!(rendered.contains("\"Sid\": \"After\""), "rendered: {rendered}");
    }

    #[test]
    fn test_unknown_line_range_omits_numbers_and_excerpt() {
        let source = PolicySource {
            file_path: PathBuf::from("scp/inline.json"),
            original_sid: String::new(),
            index: 2,
            start_line: 0,
            end_line: 0,
        };

        let rendered = render(&attribution(Some(source), None));

        assert_eq!(
            rendered,
            "    • PermissionsBoundaryPolicyInputList.1 (tracking id: scp:deny.json#stmt:0)\n      Source: scp/inline.json\n"
        );
    }

    #[test]
    fn test_missing_file_skips_excerpt() {
        let source = PolicySource {
            file_path: PathBuf::from("/nonexistent/deny.json"),
            original_sid: "Gone".to_string(),
            index: 0,
            start_line: 1,
            end_line: 4,
        };

        let rendered = render(&attribution(Some(source), Some("Gone")));

        assert_eq!(rendered.lines().count(), 2);
    }

    #[test]
    fn test_unknown_source_line() {
        let unknown = Attribution {
            source_policy_id: "SomeFutureListType.1".to_string(),
            kind: PolicyKind::Unknown,
            tracking_id: None,
            original_sid: None,
            source: None,
        };
        assert_eq!(render(&unknown), "    • SomeFutureListType.1 (unknown source)\n");
    }

    #[test]
    fn test_unresolved_statement_prints_raw_id_only() {
        let mut unresolved = attribution(None, None);
        unresolved.tracking_id = None;
        assert_eq!(render(&unresolved), "    • PermissionsBoundaryPolicyInputList.1\n");
    }
}
