//! The per-run source map: transmitted documents plus their reverse indices

use log::info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{process_identity_policy_with, process_resource_policy, PolicyMerger, SCP_NAMESPACE};
use crate::error::AttributionResult;
use crate::extraction::{BraceCountingLocator, StatementLocator};
use crate::types::{PolicyKind, PolicySource, TrackingMap};

/// Policy files making up one simulation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyInputs {
    pub identity_policy: Option<PathBuf>,
    /// SCP/RCP files, merged in this order
    pub permissions_boundaries: Vec<PathBuf>,
    pub resource_policy: Option<PathBuf>,
}

/// Everything needed to attribute a matched statement.
///
/// Built once before any simulation runs and read-only afterwards, so it can
/// be shared between test cases without locking.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceMap {
    pub identity: Option<TrackingMap>,
    pub permissions_boundary: Option<TrackingMap>,
    pub resource_policy: Option<PolicySource>,
    pub identity_policy_raw: Option<String>,
    pub permissions_boundary_raw: Option<String>,
    pub resource_policy_raw: Option<String>,
}

impl SourceMap {
    /// Build the source map with the default brace-counting locator
    ///
    /// # Errors
    ///
    /// Returns the first author error encountered in any input file.
    pub fn build(inputs: &PolicyInputs) -> AttributionResult<Self> {
        Self::build_with_locator(inputs, BraceCountingLocator)
    }

    /// Build the source map, locating statements with `locator`
    ///
    /// # Errors
    ///
    /// See [`SourceMap::build`].
    pub fn build_with_locator<L: StatementLocator>(
        inputs: &PolicyInputs,
        locator: L,
    ) -> AttributionResult<Self> {
        let mut map = Self::default();

        if let Some(path) = &inputs.identity_policy {
            let processed = process_identity_policy_with(path, &locator)?;
            map.identity = Some(processed.sources);
            map.identity_policy_raw = Some(processed.document);
        }

        if !inputs.permissions_boundaries.is_empty() {
            let merged = PolicyMerger::with_locator(SCP_NAMESPACE, locator)
                .merge(&inputs.permissions_boundaries)?;
            map.permissions_boundary_raw = Some(merged.document.to_transmitted_json()?);
            map.permissions_boundary = Some(merged.sources);
        }

        if let Some(path) = &inputs.resource_policy {
            let processed = process_resource_policy(path)?;
            map.resource_policy = Some(processed.source);
            map.resource_policy_raw = Some(processed.document);
        }

        info!(
            "Source map ready: {} identity, {} boundary statement(s), resource policy: {}",
            map.identity.as_ref().map_or(0, TrackingMap::len),
            map.permissions_boundary.as_ref().map_or(0, TrackingMap::len),
            if map.resource_policy.is_some() { "yes" } else { "no" }
        );
        Ok(map)
    }

    /// The exact document text transmitted for `kind`
    #[must_use]
    pub fn raw_document(&self, kind: PolicyKind) -> Option<&str> {
        match kind {
            PolicyKind::Identity => self.identity_policy_raw.as_deref(),
            PolicyKind::PermissionsBoundary => self.permissions_boundary_raw.as_deref(),
            PolicyKind::ResourcePolicy => self.resource_policy_raw.as_deref(),
            PolicyKind::Unknown => None,
        }
    }

    /// Per-statement reverse index for `kind`, if it is tracked per statement
    #[must_use]
    pub const fn tracked_sources(&self, kind: PolicyKind) -> Option<&TrackingMap> {
        match kind {
            PolicyKind::Identity => self.identity.as_ref(),
            PolicyKind::PermissionsBoundary => self.permissions_boundary.as_ref(),
            PolicyKind::ResourcePolicy | PolicyKind::Unknown => None,
        }
    }
}
