//! Simulation Service Layer
//!
//! The service owns the simulator and the source map built for a run. Each
//! test case makes exactly one simulation call, then every matched statement
//! is attributed. Pass/fail is decided before attribution, so degraded
//! attribution never hides a result.

use log::{debug, info};

use super::report::{Expectation, OutcomeReport, TestReport};
use crate::attribution::attribute_statement;
use crate::aws::{AwsIamSimulator, SimulationRequest, Simulator};
use crate::error::AttributionResult;
use crate::merging::SourceMap;
use crate::types::PolicyKind;

/// Wildcard used when a test case names no resources
pub const ANY_RESOURCE: &str = "*";

/// Actions and resources to simulate, with an optional expected decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
    pub caller_arn: Option<String>,
    pub expectation: Option<Expectation>,
}

impl TestCase {
    #[must_use]
    pub fn new(name: impl Into<String>, actions: Vec<String>) -> Self {
        Self {
            name: name.into(),
            actions,
            resources: Vec::new(),
            caller_arn: None,
            expectation: None,
        }
    }
}

/// Main service struct that holds the simulator and the run's source map
pub struct SimulationService<S> {
    simulator: S,
    source_map: SourceMap,
}

impl SimulationService<AwsIamSimulator> {
    /// Create a service backed by the IAM policy simulator
    ///
    /// The AWS configuration is loaded using the default credential provider chain.
    pub async fn from_env(source_map: SourceMap, region: Option<String>) -> Self {
        Self::new(AwsIamSimulator::from_env(region).await, source_map)
    }
}

impl<S: Simulator> SimulationService<S> {
    pub const fn new(simulator: S, source_map: SourceMap) -> Self {
        Self {
            simulator,
            source_map,
        }
    }

    pub const fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    /// Run one test case
    ///
    /// # Errors
    ///
    /// Returns an error only if the simulation call fails.
    pub async fn run(&self, case: &TestCase) -> AttributionResult<TestReport> {
        let any_resource = [ANY_RESOURCE.to_string()];
        let request = SimulationRequest {
            identity_policy: self.source_map.raw_document(PolicyKind::Identity),
            permissions_boundary: self.source_map.raw_document(PolicyKind::PermissionsBoundary),
            resource_policy: self.source_map.raw_document(PolicyKind::ResourcePolicy),
            actions: &case.actions,
            resources: if case.resources.is_empty() {
                &any_resource[..]
            } else {
                case.resources.as_slice()
            },
            caller_arn: case.caller_arn.as_deref(),
        };

        debug!(
            "Simulating '{}': {} action(s) on {} resource(s)",
            case.name,
            request.actions.len(),
            request.resources.len()
        );
        let outcomes = self.simulator.simulate(&request).await?;

        let outcomes: Vec<OutcomeReport> = outcomes
            .into_iter()
            .map(|outcome| OutcomeReport {
                passed: case
                    .expectation
                    .map(|expected| expected.is_met_by(&outcome.decision)),
                attributions: outcome
                    .matched_statements
                    .iter()
                    .map(|matched| attribute_statement(matched, &self.source_map))
                    .collect(),
                outcome,
            })
            .collect();

        let report = TestReport {
            name: case.name.clone(),
            expectation: case.expectation,
            outcomes,
        };
        info!(
            "Test case '{}' {}",
            case.name,
            if report.passed() { "passed" } else { "failed" }
        );
        Ok(report)
    }
}
