//! AWS SDK integration: the simulation boundary and its IAM implementation.

pub(crate) mod simulator;
pub mod sts;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::types::MatchedStatement;

pub use simulator::AwsIamSimulator;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("AWS configuration error: {0}")]
    ConfigError(String),
    #[error("Policy simulation error: {0}")]
    SimulationError(String),
    #[error("AWS SDK error: {0}")]
    SdkError(String),
}

pub type AwsResult<T> = Result<T, AwsError>;

/// Load AWS configuration using the standard credential provider chain.
///
/// `region` overrides the region from the environment and profile.
pub async fn load_config(region: Option<String>) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(aws_config::Region::new(region));
    }
    loader.load().await
}

/// One simulation call. Policy documents are borrowed from the source map so
/// they are transmitted byte for byte as recorded.
#[derive(Debug, Clone, Default)]
pub struct SimulationRequest<'a> {
    pub identity_policy: Option<&'a str>,
    pub permissions_boundary: Option<&'a str>,
    pub resource_policy: Option<&'a str>,
    pub actions: &'a [String],
    pub resources: &'a [String],
    pub caller_arn: Option<&'a str>,
}

/// Evaluation decision for one action/resource pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Decision {
    Allowed,
    ExplicitDeny,
    ImplicitDeny,
    Other(String),
}

impl Decision {
    /// Parse the simulator's decision string
    #[must_use]
    pub fn from_api(value: &str) -> Self {
        match value {
            "allowed" => Self::Allowed,
            "explicitDeny" => Self::ExplicitDeny,
            "implicitDeny" => Self::ImplicitDeny,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub const fn is_denied(&self) -> bool {
        matches!(self, Self::ExplicitDeny | Self::ImplicitDeny)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => f.write_str("allowed"),
            Self::ExplicitDeny => f.write_str("explicitDeny"),
            Self::ImplicitDeny => f.write_str("implicitDeny"),
            Self::Other(value) => f.write_str(value),
        }
    }
}

/// The simulator's verdict for one action on one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EvaluationOutcome {
    pub action: String,
    pub resource: String,
    pub decision: Decision,
    pub matched_statements: Vec<MatchedStatement>,
}

/// Evaluates policies for a set of actions and resources
#[async_trait]
pub trait Simulator: Send + Sync {
    async fn simulate(&self, request: &SimulationRequest<'_>) -> AwsResult<Vec<EvaluationOutcome>>;
}
