use aws_sdk_sts::Client as StsClient;

use crate::aws::{AwsError, AwsResult};

/// Return the current caller's ARN as a simulation `CallerArn`.
///
/// Simulating a resource policy requires a caller, and the simulator only
/// accepts IAM user ARNs there. Any other identity (assumed role, federated
/// user) is a configuration error telling the user to pass one explicitly.
///
/// # Arguments
///
/// * `client` - STS client to use for the API call
pub async fn default_caller_arn(client: &StsClient) -> AwsResult<String> {
    let out = client
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| AwsError::SdkError(format!("STS GetCallerIdentity failed: {e}")))?;
    let arn = out
        .arn()
        .ok_or_else(|| AwsError::SdkError("STS GetCallerIdentity missing Arn".to_string()))?;
    usable_caller_arn(arn)
}

/// [`default_caller_arn`] with a client built from the default credential provider chain
pub async fn default_caller_arn_from_env(region: Option<String>) -> AwsResult<String> {
    let config = crate::aws::load_config(region).await;
    default_caller_arn(&StsClient::new(&config)).await
}

fn usable_caller_arn(arn: &str) -> AwsResult<String> {
    let is_iam_user = arn
        .split(':')
        .nth(5)
        .is_some_and(|resource| resource.starts_with("user/"))
        && arn.split(':').nth(2) == Some("iam");
    if is_iam_user {
        Ok(arn.to_string())
    } else {
        Err(AwsError::ConfigError(format!(
            "caller '{arn}' is not an IAM user; pass --caller-arn to simulate a resource policy"
        )))
    }
}
