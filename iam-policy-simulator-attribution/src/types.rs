//! Core data types shared by merging, resolution and attribution

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A single IAM policy statement.
///
/// Statements are passed through untouched apart from their `Sid`, so they are
/// kept as an insertion-ordered JSON object rather than a typed struct. Unknown
/// fields survive the round trip.
pub type Statement = serde_json::Map<String, serde_json::Value>;

/// Reverse index from tracking id to the statement's origin
pub type TrackingMap = BTreeMap<TrackingId, PolicySource>;

/// A 1-based, inclusive line range. `0..0` means the range is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub const UNKNOWN: Self = Self { start: 0, end: 0 };

    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.start > 0 && self.end >= self.start
    }
}

/// Where a transmitted statement came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicySource {
    /// Policy file the statement was read from
    pub file_path: PathBuf,
    /// The statement's `Sid` before the tracking id replaced it, or empty
    pub original_sid: String,
    /// Ordinal position of the statement within its file
    pub index: usize,
    /// First line of the statement in the file, 0 if not found
    pub start_line: usize,
    /// Last line of the statement in the file, 0 if not found
    pub end_line: usize,
}

impl PolicySource {
    #[must_use]
    pub const fn lines(&self) -> LineRange {
        LineRange::new(self.start_line, self.end_line)
    }
}

/// Synthetic `Sid` injected into every transmitted statement.
///
/// Identity statements use `identity#stmt:<index>`; statements merged from
/// several files use `<namespace>:<file label>#stmt:<index>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingId(String);

impl TrackingId {
    pub const IDENTITY_NAMESPACE: &'static str = "identity";

    #[must_use]
    pub fn identity(index: usize) -> Self {
        Self(format!("{}#stmt:{index}", Self::IDENTITY_NAMESPACE))
    }

    #[must_use]
    pub fn for_file(namespace: &str, file_label: &str, index: usize) -> Self {
        Self(format!("{namespace}:{file_label}#stmt:{index}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TrackingId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TrackingId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for TrackingId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A 1-based line/column coordinate reported by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// One statement the simulator reported as matching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MatchedStatement {
    /// Synthetic per-request id such as `PolicyInputList.1`
    pub source_policy_id: String,
    pub start_position: Option<Position>,
    pub end_position: Option<Position>,
}

impl MatchedStatement {
    #[must_use]
    pub fn new(source_policy_id: impl Into<String>) -> Self {
        Self {
            source_policy_id: source_policy_id.into(),
            start_position: None,
            end_position: None,
        }
    }

    #[must_use]
    pub const fn with_positions(mut self, start: Position, end: Position) -> Self {
        self.start_position = Some(start);
        self.end_position = Some(end);
        self
    }
}

/// Which transmitted document a matched statement belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyKind {
    Identity,
    PermissionsBoundary,
    ResourcePolicy,
    Unknown,
}

impl PolicyKind {
    /// Classify a `SourcePolicyId` of the form `<ListName>.<index>`.
    #[must_use]
    pub fn classify(source_policy_id: &str) -> Self {
        let list_name = source_policy_id
            .split_once('.')
            .map_or(source_policy_id, |(name, _)| name);
        match list_name {
            "PolicyInputList" => Self::Identity,
            "PermissionsBoundaryPolicyInputList" => Self::PermissionsBoundary,
            "ResourcePolicy" => Self::ResourcePolicy,
            _ => Self::Unknown,
        }
    }
}
