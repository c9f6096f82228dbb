//! `SimulateCustomPolicy` client wrapper

use async_trait::async_trait;
use aws_sdk_iam::types::{EvaluationResult, Position as AwsPosition, Statement as AwsStatement};
use aws_sdk_iam::Client as IamClient;
use log::debug;

use super::{AwsError, AwsResult, Decision, EvaluationOutcome, SimulationRequest, Simulator};
use crate::types::{MatchedStatement, Position};

/// Runs simulations against the IAM policy simulator API
#[derive(Debug, Clone)]
pub struct AwsIamSimulator {
    client: IamClient,
}

impl AwsIamSimulator {
    pub const fn new(client: IamClient) -> Self {
        Self { client }
    }

    /// Create a simulator from the default credential provider chain
    pub async fn from_env(region: Option<String>) -> Self {
        Self::new(IamClient::new(&super::load_config(region).await))
    }
}

#[async_trait]
impl Simulator for AwsIamSimulator {
    async fn simulate(&self, request: &SimulationRequest<'_>) -> AwsResult<Vec<EvaluationOutcome>> {
        let Some(identity_policy) = request.identity_policy else {
            return Err(AwsError::ConfigError(
                "SimulateCustomPolicy needs an identity policy in PolicyInputList".to_string(),
            ));
        };
        let mut outcomes = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let response = self
                .client
                .simulate_custom_policy()
                .policy_input_list(identity_policy)
                .set_permissions_boundary_policy_input_list(
                    request.permissions_boundary.map(|p| vec![p.to_string()]),
                )
                .set_resource_policy(request.resource_policy.map(str::to_string))
                .set_action_names(Some(request.actions.to_vec()))
                .set_resource_arns(Some(request.resources.to_vec()))
                .set_caller_arn(request.caller_arn.map(str::to_string))
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| {
                    AwsError::SimulationError(format!("SimulateCustomPolicy failed: {e:?}"))
                })?;

            outcomes.extend(response.evaluation_results().iter().map(to_outcome));
            debug!(
                "SimulateCustomPolicy page returned {} result(s)",
                response.evaluation_results().len()
            );

            match response.marker() {
                Some(next) if response.is_truncated() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(outcomes)
    }
}

fn to_outcome(result: &EvaluationResult) -> EvaluationOutcome {
    EvaluationOutcome {
        action: result.eval_action_name().to_string(),
        resource: result.eval_resource_name().unwrap_or("*").to_string(),
        decision: Decision::from_api(result.eval_decision().as_str()),
        matched_statements: result.matched_statements().iter().map(to_matched).collect(),
    }
}

fn to_matched(statement: &AwsStatement) -> MatchedStatement {
    MatchedStatement {
        source_policy_id: statement.source_policy_id().unwrap_or_default().to_string(),
        start_position: statement.start_position().and_then(to_position),
        end_position: statement.end_position().and_then(to_position),
    }
}

/// Positions are 1-based; anything else is treated as absent
fn to_position(position: &AwsPosition) -> Option<Position> {
    let line = u32::try_from(position.line()).ok().filter(|&l| l > 0)?;
    let column = u32::try_from(position.column()).ok().filter(|&c| c > 0)?;
    Some(Position::new(line, column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_iam::config::{BehaviorVersion, Region};
    use aws_sdk_iam::types::PolicyEvaluationDecisionType;

    fn offline_simulator() -> AwsIamSimulator {
        let config = aws_sdk_iam::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        AwsIamSimulator::new(IamClient::from_conf(config))
    }

    #[tokio::test]
    async fn test_missing_identity_policy_fails_before_calling_aws() {
        let actions = vec!["s3:GetObject".to_string()];
        let resources = vec!["*".to_string()];
        let request = SimulationRequest {
            permissions_boundary: Some(r#"{"Statement": []}"#),
            actions: &actions,
            resources: &resources,
            ..SimulationRequest::default()
        };

        let err = offline_simulator().simulate(&request).await.unwrap_err();

        assert!(matches!(err, AwsError::ConfigError(_)));
        assert!(err.to_string().contains("PolicyInputList"));
    }

    #[test]
    fn test_statement_conversion() {
        let statement = AwsStatement::builder()
            .source_policy_id("PermissionsBoundaryPolicyInputList.1")
            .start_position(AwsPosition::builder().line(4).column(5).build())
            .end_position(AwsPosition::builder().line(9).column(6).build())
            .build();

        let matched = to_matched(&statement);

        assert_eq!(matched.source_policy_id, "PermissionsBoundaryPolicyInputList.1");
        assert_eq!(matched.start_position, Some(Position::new(4, 5)));
        assert_eq!(matched.end_position, Some(Position::new(9, 6)));
    }

    #[test]
    fn test_zero_position_is_absent() {
        let statement = AwsStatement::builder()
            .source_policy_id("PolicyInputList.1")
            .start_position(AwsPosition::builder().line(0).column(0).build())
            .build();

        let matched = to_matched(&statement);

        assert_eq!(matched.start_position, None);
        assert_eq!(matched.end_position, None);
    }

    #[test]
    fn test_evaluation_result_conversion() {
        let result = EvaluationResult::builder()
            .eval_action_name("s3:DeleteObject")
            .eval_resource_name("arn:aws:s3:::bucket/key")
            .eval_decision(PolicyEvaluationDecisionType::ExplicitDeny)
            .matched_statements(
                AwsStatement::builder()
                    .source_policy_id("PermissionsBoundaryPolicyInputList.1")
                    .build(),
            )
            .build()
            .unwrap();

        let outcome = to_outcome(&result);

        assert_eq!(outcome.action, "s3:DeleteObject");
        assert_eq!(outcome.resource, "arn:aws:s3:::bucket/key");
        assert_eq!(outcome.decision, Decision::ExplicitDeny);
        assert_eq!(outcome.matched_statements.len(), 1);
    }
}
