//! Identity policy processing: one document, tracked per statement

use log::debug;
use serde_json::Value;
use std::path::Path;

use super::{track_statement, LoadedPolicy, DEFAULT_POLICY_VERSION};
use crate::error::{AttributionError, AttributionResult};
use crate::extraction::{BraceCountingLocator, StatementLocator};
use crate::types::{Statement, TrackingId, TrackingMap};

/// An identity policy ready for transmission
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedIdentityPolicy {
    /// The exact text to send as the identity policy. Positions reported by the
    /// simulator index into this string, so it must not be re-serialized.
    pub document: String,
    pub sources: TrackingMap,
}

/// Process an identity policy file with the default locator
///
/// # Errors
///
/// Returns an author error naming the file if it cannot be read, is not valid
/// JSON, or is not policy-shaped.
pub fn process_identity_policy(path: impl AsRef<Path>) -> AttributionResult<ProcessedIdentityPolicy> {
    process_identity_policy_with(path, &BraceCountingLocator)
}

/// Process an identity policy file, locating statements with `locator`
///
/// Top-level fields other than `Statement` keep their values and order. A bare
/// statement array is wrapped in a document with the default `Version`.
///
/// # Errors
///
/// See [`process_identity_policy`].
pub fn process_identity_policy_with<L: StatementLocator + ?Sized>(
    path: impl AsRef<Path>,
    locator: &L,
) -> AttributionResult<ProcessedIdentityPolicy> {
    let policy = LoadedPolicy::read(path.as_ref())?;

    let mut sources = TrackingMap::new();
    let mut tagged_statements = Vec::new();
    for (index, statement) in policy.statements()? {
        let tracking_id = TrackingId::identity(index);
        let (tagged, source) = track_statement(locator, &policy, index, statement, &tracking_id);
        tagged_statements.push(Value::Object(tagged));
        sources.insert(tracking_id, source);
    }
    debug!(
        "Tracked {} identity statement(s) from '{}'",
        sources.len(),
        policy.path.display()
    );

    let tagged_statements = Value::Array(tagged_statements);
    let document = match &policy.document {
        Value::Object(fields) => {
            let mut rebuilt = Statement::with_capacity(fields.len() + 1);
            for (key, value) in fields {
                if key == "Statement" {
                    rebuilt.insert(key.clone(), tagged_statements.clone());
                } else {
                    rebuilt.insert(key.clone(), value.clone());
                }
            }
            rebuilt
                .entry("Statement")
                .or_insert_with(|| tagged_statements.clone());
            Value::Object(rebuilt)
        }
        _ => {
            let mut wrapped = Statement::new();
            wrapped.insert(
                "Version".to_string(),
                Value::String(DEFAULT_POLICY_VERSION.to_string()),
            );
            wrapped.insert("Statement".to_string(), tagged_statements);
            Value::Object(wrapped)
        }
    };

    let document = serde_json::to_string_pretty(&document).map_err(|e| {
        AttributionError::serialization(format!("identity policy '{}'", policy.path.display()), e)
    })?;

    Ok(ProcessedIdentityPolicy { document, sources })
}
