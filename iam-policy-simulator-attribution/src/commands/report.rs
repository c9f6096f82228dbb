//! Test expectations and per-case reports

use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use crate::attribution::{Attribution, AttributionRenderer};
use crate::aws::{Decision, EvaluationOutcome};

/// Decision a test case expects for every action/resource pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Expectation {
    Allowed,
    /// Either kind of deny
    Denied,
    ExplicitDeny,
    ImplicitDeny,
}

impl Expectation {
    #[must_use]
    pub const fn is_met_by(self, decision: &Decision) -> bool {
        match self {
            Self::Allowed => matches!(decision, Decision::Allowed),
            Self::Denied => decision.is_denied(),
            Self::ExplicitDeny => matches!(decision, Decision::ExplicitDeny),
            Self::ImplicitDeny => matches!(decision, Decision::ImplicitDeny),
        }
    }
}

impl FromStr for Expectation {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "allowed" | "allow" => Ok(Self::Allowed),
            "denied" | "deny" => Ok(Self::Denied),
            "explicitDeny" | "explicit-deny" => Ok(Self::ExplicitDeny),
            "implicitDeny" | "implicit-deny" => Ok(Self::ImplicitDeny),
            other => Err(format!(
                "unknown expectation '{other}' (expected allowed, denied, explicitDeny or implicitDeny)"
            )),
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Allowed => "allowed",
            Self::Denied => "denied",
            Self::ExplicitDeny => "explicitDeny",
            Self::ImplicitDeny => "implicitDeny",
        })
    }
}

/// One evaluation outcome with its matched statements attributed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutcomeReport {
    pub outcome: EvaluationOutcome,
    /// `None` when the test case has no expectation
    pub passed: Option<bool>,
    pub attributions: Vec<Attribution>,
}

/// Result of running one test case
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestReport {
    pub name: String,
    pub expectation: Option<Expectation>,
    pub outcomes: Vec<OutcomeReport>,
}

impl TestReport {
    /// True unless some outcome missed the expectation
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcomes
            .iter()
            .all(|outcome| outcome.passed.unwrap_or(true))
    }

    /// Write the pass/fail lines and attribution blocks to `out`
    ///
    /// # Errors
    ///
    /// Returns any error from writing to `out`.
    pub fn render<W: Write>(&self, renderer: &AttributionRenderer, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self.name)?;
        for report in &self.outcomes {
            let status = match report.passed {
                Some(true) => "PASS",
                Some(false) => "FAIL",
                None => "INFO",
            };
            let outcome = &report.outcome;
            match self.expectation {
                Some(expected) => writeln!(
                    out,
                    "  {status} {} on {}: {} (expected {expected})",
                    outcome.action, outcome.resource, outcome.decision
                )?,
                None => writeln!(
                    out,
                    "  {status} {} on {}: {}",
                    outcome.action, outcome.resource, outcome.decision
                )?,
            }
            if !report.attributions.is_empty() {
                writeln!(out, "  Matched statements:")?;
                for attribution in &report.attributions {
                    renderer.render(attribution, out)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PolicyKind;

    fn outcome(decision: Decision) -> EvaluationOutcome {
        EvaluationOutcome {
            action: "s3:DeleteObject".to_string(),
            resource: "arn:aws:s3:::bucket/key".to_string(),
            decision,
            matched_statements: Vec::new(),
        }
    }

    #[test]
    fn test_expectations() {
        assert!(Expectation::Denied.is_met_by(&Decision::ExplicitDeny));
        assert!(Expectation::Denied.is_met_by(&Decision::ImplicitDeny));
        assert!(!Expectation::Denied.is_met_by(&Decision::Allowed));
        assert!(!Expectation::ExplicitDeny.is_met_by(&Decision::ImplicitDeny));
        assert!(!Expectation::Allowed.is_met_by(&Decision::Other("x".to_string())));
    }

    #[test]
    fn test_expectation_parsing() {
        assert_eq!("explicitDeny".parse::<Expectation>(), Ok(Expectation::ExplicitDeny));
        assert_eq!("deny".parse::<Expectation>(), Ok(Expectation::Denied));
        assert!("maybe".parse::<Expectation>().is_err());
    }

    #[test]
    fn test_render_failure_with_unknown_source() {
        let report = TestReport {
            name: "delete is blocked".to_string(),
            expectation: Some(Expectation::Denied),
            outcomes: vec![OutcomeReport {
                outcome: outcome(Decision::Allowed),
                passed: Some(false),
                attributions: vec![Attribution {
                    source_policy_id: "SomeFutureListType.1".to_string(),
                    kind: PolicyKind::Unknown,
                    tracking_id: None,
                    original_sid: None,
                    source: None,
                }],
            }],
        };

        let mut out = Vec::new();
        report.render(&AttributionRenderer::default(), &mut out).unwrap();
        let rendered = String::from_utf8(out).unwrap();

        assert!(!report.passed());
        assert_eq!(
            rendered,
            "delete is blocked\n  FAIL s3:DeleteObject on arn:aws:s3:::bucket/key: allowed (expected denied)\n  Matched statements:\n    • SomeFutureListType.1 (unknown source)\n"
        );
    }

    #[test]
    fn test_report_without_expectation_passes() {
        let report = TestReport {
            name: "probe".to_string(),
            expectation: None,
            outcomes: vec![OutcomeReport {
                outcome: outcome(Decision::ImplicitDeny),
                passed: None,
                attributions: Vec::new(),
            }],
        };
        assert!(report.passed());
    }
}
