//! Merging several SCP/RCP files into one permissions boundary document

use log::{debug, info, trace};
use std::collections::HashSet;
use std::path::Path;

use super::{track_statement, LoadedPolicy, PolicyDocument, DEFAULT_POLICY_VERSION};
use crate::error::AttributionResult;
use crate::extraction::{BraceCountingLocator, StatementLocator};
use crate::types::{TrackingId, TrackingMap};

/// Tracking-id namespace for merged control policies
pub const SCP_NAMESPACE: &str = "scp";

/// Result of merging policy files
#[derive(Debug, Clone, PartialEq)]
pub struct MergedPolicy {
    /// All statements, in file order then in-file order, with tracking Sids
    pub document: PolicyDocument,
    /// Reverse index from tracking id to origin
    pub sources: TrackingMap,
}

/// Merges policy files into one document, tagging every statement with a tracking id
#[derive(Debug, Clone)]
pub struct PolicyMerger<L = BraceCountingLocator> {
    namespace: String,
    locator: L,
}

impl PolicyMerger {
    /// Create a merger using the default brace-counting locator
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self::with_locator(namespace, BraceCountingLocator)
    }
}

impl<L: StatementLocator> PolicyMerger<L> {
    /// Create a merger with a custom statement locator
    pub fn with_locator(namespace: impl Into<String>, locator: L) -> Self {
        Self {
            namespace: namespace.into(),
            locator,
        }
    }

    /// Merge `paths` in order.
    ///
    /// The merged `Version` is `2012-10-17` if any input declares it, otherwise
    /// the first declared version, else the default.
    ///
    /// # Errors
    ///
    /// Returns an author error naming the file if any input cannot be read,
    /// is not valid JSON, or is not policy-shaped.
    pub fn merge<P: AsRef<Path>>(&self, paths: &[P]) -> AttributionResult<MergedPolicy> {
        let mut statements = Vec::new();
        let mut sources = TrackingMap::new();
        let mut version: Option<String> = None;
        let mut used_labels = HashSet::new();

        for (ordinal, path) in paths.iter().enumerate() {
            let policy = LoadedPolicy::read(path.as_ref())?;
            if let Some(declared) = policy.version() {
                if version.is_none() || declared == DEFAULT_POLICY_VERSION {
                    version = Some(declared.to_string());
                }
            }

            let label = file_label(policy.path.as_path(), ordinal, &mut used_labels);
            let file_statements = policy.statements()?;
            debug!(
                "Merging {} statement(s) from '{}' as '{label}'",
                file_statements.len(),
                policy.path.display()
            );

            for (index, statement) in file_statements {
                let tracking_id = TrackingId::for_file(&self.namespace, &label, index);
                let (tagged, source) =
                    track_statement(&self.locator, &policy, index, statement, &tracking_id);
                trace!(
                    "{tracking_id} <- '{}' lines {}-{}",
                    source.original_sid,
                    source.start_line,
                    source.end_line
                );
                statements.push(tagged);
                sources.insert(tracking_id, source);
            }
        }

        info!(
            "Merged {} statement(s) from {} policy file(s)",
            statements.len(),
            paths.len()
        );

        Ok(MergedPolicy {
            document: PolicyDocument {
                version: version.unwrap_or_else(|| DEFAULT_POLICY_VERSION.to_string()),
                statement: statements,
            },
            sources,
        })
    }
}

/// Merge SCP/RCP files under the `scp` namespace
///
/// # Errors
///
/// See [`PolicyMerger::merge`].
pub fn merge_policy_files<P: AsRef<Path>>(paths: &[P]) -> AttributionResult<MergedPolicy> {
    PolicyMerger::new(SCP_NAMESPACE).merge(paths)
}

/// The file's basename, suffixed with `~<ordinal>` (1-based) when an earlier
/// file already used the same basename.
fn file_label(path: &Path, ordinal: usize, used: &mut HashSet<String>) -> String {
    let basename = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
    if used.insert(basename.clone()) {
        return basename;
    }
    let label = format!("{basename}~{}", ordinal + 1);
    used.insert(label.clone());
    label
}
