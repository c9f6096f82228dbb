//! Resource policy processing: tracked as a whole file

use log::debug;
use serde_json::Value;
use std::path::Path;

use super::LoadedPolicy;
use crate::error::AttributionResult;
use crate::types::PolicySource;

/// A resource policy ready for transmission
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedResourcePolicy {
    /// The file text, sent unchanged. Simulator positions are therefore file positions.
    pub document: String,
    /// Provenance covering the whole file
    pub source: PolicySource,
}

/// Validate a resource policy file and record its provenance.
///
/// The original Sid is filled in only when the file holds exactly one
/// statement; otherwise it is resolved per match from the reported position.
///
/// # Errors
///
/// Returns an author error naming the file if it cannot be read, is not valid
/// JSON, or is not policy-shaped.
pub fn process_resource_policy(path: impl AsRef<Path>) -> AttributionResult<ProcessedResourcePolicy> {
    let policy = LoadedPolicy::read(path.as_ref())?;
    let statements = policy.statements()?;

    let original_sid = match statements.as_slice() {
        [(_, only)] => only
            .get("Sid")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    };
    let line_count = policy.raw.lines().count();
    debug!(
        "Resource policy '{}' has {} statement(s) over {line_count} line(s)",
        policy.path.display(),
        statements.len()
    );

    let source = PolicySource {
        file_path: policy.path.clone(),
        original_sid,
        index: 0,
        start_line: usize::from(line_count > 0),
        end_line: line_count,
    };
    Ok(ProcessedResourcePolicy {
        document: policy.raw,
        source,
    })
}
