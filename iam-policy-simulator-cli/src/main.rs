use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use iam_policy_simulator_attribution::aws::sts::default_caller_arn_from_env;
use iam_policy_simulator_attribution::{
    AttributionError, Expectation, PolicyInputs, SimulationService, SourceMap, TestCase,
};
use log::{debug, info};

mod output;

/// Exit code for a run whose expectations were not met
const EXIT_TEST_FAILED: u8 = 1;
/// Exit code for broken policy input or a failed simulation call
const EXIT_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "iam-policy-simulator",
    version,
    about = "Simulate IAM policies and trace matched statements back to their source files"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge the given policies, run one simulation and attribute every matched statement
    Simulate(SimulateArgs),
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Identity policy file sent as the policy input list; the simulator needs one
    #[arg(long, value_name = "FILE", required_unless_present = "dump_source_map")]
    identity_policy: Option<PathBuf>,

    /// SCP/RCP file merged into the permissions boundary; repeat to merge several, in order
    #[arg(long = "scp", value_name = "FILE")]
    scps: Vec<PathBuf>,

    /// Resource policy file, sent verbatim
    #[arg(long, value_name = "FILE")]
    resource_policy: Option<PathBuf>,

    /// Action to simulate, e.g. s3:GetObject; repeatable
    #[arg(long = "action", value_name = "NAME", required_unless_present = "dump_source_map")]
    actions: Vec<String>,

    /// Resource ARN to simulate against; repeatable, defaults to "*"
    #[arg(long = "resource", value_name = "ARN")]
    resources: Vec<String>,

    /// Caller ARN, required by the simulator when a resource policy is given
    #[arg(long, value_name = "ARN", env = "IAM_POLICY_SIMULATOR_CALLER_ARN")]
    caller_arn: Option<String>,

    /// Expected decision: allowed, denied, explicitDeny or implicitDeny
    #[arg(long)]
    expect: Option<Expectation>,

    /// Print the source map as JSON on stdout
    #[arg(long)]
    dump_source_map: bool,

    /// AWS region override
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::error(&e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Simulate(args) => simulate(args).await,
    }
}

async fn simulate(args: SimulateArgs) -> Result<ExitCode> {
    let inputs = PolicyInputs {
        identity_policy: args.identity_policy,
        permissions_boundaries: args.scps,
        resource_policy: args.resource_policy,
    };
    let source_map = SourceMap::build(&inputs).map_err(describe_policy_error)?;

    if args.dump_source_map {
        let json = serde_json::to_string_pretty(&source_map)
            .context("Failed to serialize source map")?;
        println!("{json}");
        if args.actions.is_empty() {
            return Ok(ExitCode::SUCCESS);
        }
    }

    let caller_arn = match (args.caller_arn, source_map.resource_policy.is_some()) {
        (Some(arn), _) => Some(arn),
        (None, true) => {
            debug!("No caller ARN given; asking STS for the current identity");
            Some(
                default_caller_arn_from_env(args.region.clone())
                    .await
                    .context("A resource policy needs a caller ARN")?,
            )
        }
        (None, false) => None,
    };

    let case = TestCase {
        name: describe_case(&args.actions, args.expect),
        actions: args.actions,
        resources: args.resources,
        caller_arn,
        expectation: args.expect,
    };

    let service = SimulationService::from_env(source_map, args.region).await;
    let report = service
        .run(&case)
        .await
        .context("Policy simulation failed")?;
    output::print_report(&report);

    if report.passed() {
        info!("All outcomes met the expectation");
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_TEST_FAILED))
    }
}

fn describe_case(actions: &[String], expectation: Option<Expectation>) -> String {
    let actions = actions.join(", ");
    match expectation {
        Some(expected) => format!("{actions} (expect {expected})"),
        None => actions,
    }
}

/// Author errors already name the file; add a hint on how to fix them
fn describe_policy_error(err: AttributionError) -> anyhow::Error {
    if err.is_author_error() {
        anyhow::Error::new(err).context("Policy input is invalid; fix the file and re-run")
    } else {
        anyhow::Error::new(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_repeated_scps_in_order() {
        let cli = Cli::try_parse_from([
            "iam-policy-simulator",
            "simulate",
            "--identity-policy",
            "identity.json",
            "--scp",
            "b.json",
            "--scp",
            "a.json",
            "--action",
            "s3:GetObject",
            "--expect",
            "explicitDeny",
        ])
        .unwrap();
        let Commands::Simulate(args) = cli.command;
        assert_eq!(args.scps, vec![PathBuf::from("b.json"), PathBuf::from("a.json")]);
        assert_eq!(args.expect, Some(Expectation::ExplicitDeny));
    }

    #[test]
    fn test_action_required_unless_dumping() {
        assert!(Cli::try_parse_from(["iam-policy-simulator", "simulate"]).is_err());
        assert!(Cli::try_parse_from([
            "iam-policy-simulator",
            "simulate",
            "--identity-policy",
            "identity.json",
        ])
        .is_err());
        assert!(
            Cli::try_parse_from(["iam-policy-simulator", "simulate", "--dump-source-map"]).is_ok()
        );
    }

    #[test]
    fn test_identity_policy_required_unless_dumping() {
        let err = Cli::try_parse_from([
            "iam-policy-simulator",
            "simulate",
            "--scp",
            "deny.json",
            "--action",
            "s3:GetObject",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        assert!(Cli::try_parse_from([
            "iam-policy-simulator",
            "simulate",
            "--scp",
            "deny.json",
            "--dump-source-map",
        ])
        .is_ok());
    }

    #[test]
    fn test_describe_case() {
        let actions = vec!["s3:GetObject".to_string(), "s3:PutObject".to_string()];
        assert_eq!(
            describe_case(&actions, Some(Expectation::Denied)),
            "s3:GetObject, s3:PutObject (expect denied)"
        );
        assert_eq!(describe_case(&actions[..1], None), "s3:GetObject");
    }
}
