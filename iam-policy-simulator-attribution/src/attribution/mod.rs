//! Attributing matched statements to the policy files they came from.
//!
//! Attribution is best effort. A missing position, an unparsable fragment or
//! an unknown tracking id each drop detail from the result and log a warning;
//! none of them is an error.

use log::warn;
use serde::Serialize;
use std::io::{self, Write};

use crate::merging::SourceMap;
use crate::resolution::{extract_sid, extract_statement_text};
use crate::types::{MatchedStatement, PolicyKind, PolicySource, TrackingId};

mod renderer;

pub use renderer::AttributionRenderer;

/// Provenance resolved for one matched statement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attribution {
    /// Synthetic id reported by the simulator, e.g. `PolicyInputList.1`
    pub source_policy_id: String,
    pub kind: PolicyKind,
    /// Tracking id read back from the statement text
    pub tracking_id: Option<TrackingId>,
    /// The statement's `Sid` as written in its source file
    pub original_sid: Option<String>,
    pub source: Option<PolicySource>,
}

impl Attribution {
    fn unresolved(matched: &MatchedStatement, kind: PolicyKind) -> Self {
        Self {
            source_policy_id: matched.source_policy_id.clone(),
            kind,
            tracking_id: None,
            original_sid: None,
            source: None,
        }
    }
}

/// Resolve where a matched statement came from
#[must_use]
pub fn attribute_statement(matched: &MatchedStatement, source_map: &SourceMap) -> Attribution {
    let kind = PolicyKind::classify(&matched.source_policy_id);
    match kind {
        PolicyKind::Identity | PolicyKind::PermissionsBoundary => {
            attribute_tracked(matched, kind, source_map)
        }
        PolicyKind::ResourcePolicy => attribute_resource_policy(matched, source_map),
        PolicyKind::Unknown => {
            warn!(
                "Unrecognized source policy id '{}'; reporting it without provenance",
                matched.source_policy_id
            );
            Attribution::unresolved(matched, kind)
        }
    }
}

/// Attribute `matched` and render it to `out`
///
/// # Errors
///
/// Returns any error from writing to `out`.
pub fn display_statement<W: Write>(
    matched: &MatchedStatement,
    source_map: &SourceMap,
    out: &mut W,
) -> io::Result<()> {
    AttributionRenderer::default().render(&attribute_statement(matched, source_map), out)
}

fn attribute_tracked(
    matched: &MatchedStatement,
    kind: PolicyKind,
    source_map: &SourceMap,
) -> Attribution {
    let mut attribution = Attribution::unresolved(matched, kind);
    let (Some(document), Some(sources)) =
        (source_map.raw_document(kind), source_map.tracked_sources(kind))
    else {
        warn!(
            "No transmitted document recorded for '{}'",
            matched.source_policy_id
        );
        return attribution;
    };
    if matched.start_position.is_none() || matched.end_position.is_none() {
        warn!(
            "Simulator returned no position for '{}'; cannot identify the statement",
            matched.source_policy_id
        );
        return attribution;
    }

    let fragment =
        extract_statement_text(document, matched.start_position, matched.end_position);
    let sid = extract_sid(&fragment);
    if sid.is_empty() {
        warn!(
            "Could not read a Sid from the statement text reported for '{}'",
            matched.source_policy_id
        );
        return attribution;
    }

    let tracking_id = TrackingId::from(sid);
    match sources.get(&tracking_id) {
        Some(source) => {
            attribution.original_sid =
                Some(source.original_sid.clone()).filter(|sid| !sid.is_empty());
            attribution.source = Some(source.clone());
        }
        None => warn!(
            "Tracking id '{tracking_id}' reported for '{}' is not in the source map",
            matched.source_policy_id
        ),
    }
    attribution.tracking_id = Some(tracking_id);
    attribution
}

/// The resource policy is sent verbatim, so a reported position is already a
/// file position and narrows the whole-file range to the matched statement.
fn attribute_resource_policy(matched: &MatchedStatement, source_map: &SourceMap) -> Attribution {
    let mut attribution = Attribution::unresolved(matched, PolicyKind::ResourcePolicy);
    let Some(mut source) = source_map.resource_policy.clone() else {
        warn!(
            "No resource policy recorded for '{}'",
            matched.source_policy_id
        );
        return attribution;
    };

    if let (Some(document), Some(start), Some(end)) = (
        source_map.resource_policy_raw.as_deref(),
        matched.start_position,
        matched.end_position,
    ) {
        let fragment = extract_statement_text(document, Some(start), Some(end));
        if fragment.is_empty() {
            warn!(
                "Position reported for '{}' is outside the resource policy",
                matched.source_policy_id
            );
        } else {
            let sid = extract_sid(&fragment);
            if !sid.is_empty() {
                source.original_sid = sid;
            }
            source.start_line = usize::try_from(start.line).unwrap_or(source.start_line);
            source.end_line = usize::try_from(end.line).unwrap_or(source.end_line);
        }
    }

    attribution.original_sid = Some(source.original_sid.clone()).filter(|sid| !sid.is_empty());
    attribution.source = Some(source);
    attribution
}
