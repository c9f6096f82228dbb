//! Policy merging with statement provenance.
//!
//! Every statement sent to the simulator gets its `Sid` replaced with a
//! [`TrackingId`]. The simulator echoes that `Sid` back inside the reported
//! statement text, and the [`TrackingMap`] built here turns it back into the
//! original file, Sid and line range.

use log::warn;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{AttributionError, AttributionResult};
use crate::extraction::StatementLocator;
use crate::types::{PolicySource, Statement, TrackingId};

mod identity;
mod merger;
mod resource;
mod source_map;

pub use identity::{process_identity_policy, process_identity_policy_with, ProcessedIdentityPolicy};
pub use merger::{merge_policy_files, MergedPolicy, PolicyMerger, SCP_NAMESPACE};
pub use resource::{process_resource_policy, ProcessedResourcePolicy};
pub use source_map::{PolicyInputs, SourceMap};

/// Policy language version used when no input declares one
pub const DEFAULT_POLICY_VERSION: &str = "2012-10-17";

/// A policy document assembled from several files
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    /// Serialize exactly as it will be transmitted
    ///
    /// # Errors
    ///
    /// Returns [`AttributionError::Serialization`] if the document cannot be serialized.
    pub fn to_transmitted_json(&self) -> AttributionResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AttributionError::serialization("merged policy document", e))
    }
}

/// A policy file read from disk: the raw text, kept for line lookups, and its parsed form
#[derive(Debug, Clone)]
pub(crate) struct LoadedPolicy {
    pub(crate) path: PathBuf,
    pub(crate) raw: String,
    pub(crate) document: Value,
}

impl LoadedPolicy {
    pub(crate) fn read(path: &Path) -> AttributionResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AttributionError::file_system("read", path, e))?;
        let document =
            serde_json::from_str(&raw).map_err(|e| AttributionError::json_parsing(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            raw,
            document,
        })
    }

    /// `Version` declared at the top level, if any
    pub(crate) fn version(&self) -> Option<&str> {
        self.document.get("Version").and_then(Value::as_str)
    }

    /// The document's statements paired with their ordinal index.
    ///
    /// Accepts `{"Statement": [...]}`, `{"Statement": {...}}` and a bare array.
    /// Non-object array entries are skipped but keep their index, so the
    /// indices of the remaining statements match their position in the file.
    pub(crate) fn statements(&self) -> AttributionResult<Vec<(usize, &Statement)>> {
        let entries: Vec<&Value> = match &self.document {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => match map.get("Statement") {
                Some(Value::Array(items)) => items.iter().collect(),
                Some(single @ Value::Object(_)) => vec![single],
                Some(other) => {
                    return Err(AttributionError::invalid_document(
                        &self.path,
                        format!("\"Statement\" must be an object or an array, found {}", kind_of(other)),
                    ))
                }
                None => {
                    warn!(
                        "Policy file '{}' has no \"Statement\" field; treating it as empty",
                        self.path.display()
                    );
                    Vec::new()
                }
            },
            other => {
                return Err(AttributionError::invalid_document(
                    &self.path,
                    format!("expected a policy object or statement array, found {}", kind_of(other)),
                ))
            }
        };

        Ok(entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match entry {
                Value::Object(statement) => Some((index, statement)),
                other => {
                    warn!(
                        "Skipping statement {index} in '{}': expected an object, found {}",
                        self.path.display(),
                        kind_of(other)
                    );
                    None
                }
            })
            .collect())
    }
}

/// Build the transmitted copy of `statement` and its provenance record.
///
/// The copy carries `tracking_id` as its first key, `Sid`; every other field
/// keeps its original order. The input statement is left untouched.
pub(crate) fn track_statement<L: StatementLocator + ?Sized>(
    locator: &L,
    policy: &LoadedPolicy,
    index: usize,
    statement: &Statement,
    tracking_id: &TrackingId,
) -> (Statement, PolicySource) {
    let original_sid = statement
        .get("Sid")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let lines = locator.locate(&policy.raw, statement, index);
    if !lines.is_known() {
        warn!(
            "Could not find lines of statement {index} in '{}'; attribution will omit them",
            policy.path.display()
        );
    }

    let mut tagged = Statement::with_capacity(statement.len() + 1);
    tagged.insert(
        "Sid".to_string(),
        Value::String(tracking_id.as_str().to_string()),
    );
    tagged.extend(
        statement
            .iter()
            .filter(|(key, _)| key.as_str() != "Sid")
            .map(|(key, value)| (key.clone(), value.clone())),
    );

    let source = PolicySource {
        file_path: policy.path.clone(),
        original_sid,
        index,
        start_line: lines.start,
        end_line: lines.end,
    };
    (tagged, source)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
