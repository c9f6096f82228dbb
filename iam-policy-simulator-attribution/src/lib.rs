//! This crate provides the core logic of the IAM policy simulator:
//! - Merging identity and SCP/RCP policy files with injected tracking Sids
//! - Locating statements in their source files by line range
//! - Resolving simulator positions back to statement text
//! - Attributing matched statements to the file, Sid and lines they came from
//!

pub mod attribution;
pub mod aws;
pub mod commands;
mod error;
pub mod extraction;
pub mod merging;
pub mod resolution;
mod types;

// Re-exports for a small, focused public API
pub use attribution::{attribute_statement, display_statement, Attribution, AttributionRenderer};
pub use aws::{
    AwsError, AwsIamSimulator, Decision, EvaluationOutcome, SimulationRequest, Simulator,
};
pub use commands::{Expectation, OutcomeReport, SimulationService, TestCase, TestReport};
pub use error::{AttributionError, AttributionResult};
pub use extraction::{BraceCountingLocator, StatementLocator};
pub use merging::{
    merge_policy_files, process_identity_policy, process_resource_policy, MergedPolicy,
    PolicyDocument, PolicyInputs, PolicyMerger, ProcessedIdentityPolicy, ProcessedResourcePolicy,
    SourceMap,
};
pub use resolution::{extract_sid, extract_statement_text};
pub use types::{
    LineRange, MatchedStatement, PolicyKind, PolicySource, Position, Statement, TrackingId,
    TrackingMap,
};
