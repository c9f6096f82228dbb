use iam_policy_simulator_attribution::{AttributionRenderer, TestReport};
use log::debug;
use std::io::{self, Write};

pub(crate) fn warn(msg: &str) {
    let _ = writeln!(io::stderr(), "iam-policy-simulator (warning): {msg}");
}

pub(crate) fn error(err: &anyhow::Error) {
    let mut w = io::stderr().lock();
    let _ = writeln!(w, "iam-policy-simulator: {err}");
    for cause in err.chain().skip(1) {
        let _ = writeln!(w, "  caused by: {cause}");
    }
}

/// Print the report on stdout
pub(crate) fn print_report(report: &TestReport) {
    if report.outcomes.is_empty() {
        warn("the simulator returned no evaluation results");
    }
    let mut w = io::stdout().lock();
    if let Err(e) = report.render(&AttributionRenderer::default(), &mut w) {
        debug!("Failed to write report: {e}");
    }
    let _ = w.flush();
}
