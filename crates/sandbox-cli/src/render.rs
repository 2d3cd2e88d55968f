//! Human-readable output

use sandbox_core::{DeployedProgram, DeploymentReport, VerificationOutcome};
use std::fmt::Write as _;
use std::io::{BufRead, Write};

/// Ask before deploying; anything but `y`/`yes` declines
pub(crate) fn confirm(input: &mut impl BufRead, output: &mut impl Write) -> std::io::Result<bool> {
    write!(output, "Proceed? [y/N] ")?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

pub(crate) fn programs(programs: &[&DeployedProgram]) -> String {
    let mut out = String::new();
    for program in programs {
        let _ = writeln!(out, "  {:<16} {}", program.kind().name(), program.address());
    }
    out
}

pub(crate) fn report(report: &DeploymentReport) -> String {
    let mut out = String::from("Deployed programs:\n");
    out.push_str(&programs(&report.programs.iter().collect::<Vec<_>>()));

    let _ = writeln!(
        out,
        "\nConfiguration: {} calls in {} (block {})",
        report.configuration.calls, report.configuration.tx_hash, report.configuration.block_number
    );

    out.push_str("\nVerification:\n");
    for (kind, outcome) in report.verification.entries() {
        let status = match outcome {
            VerificationOutcome::Verified => "verified".to_string(),
            VerificationOutcome::Failed(reason) => format!("FAILED ({reason})"),
            VerificationOutcome::Skipped(reason) => format!("skipped ({reason})"),
            VerificationOutcome::Manual => "verify manually".to_string(),
        };
        let _ = writeln!(out, "  {:<16} {status}", kind.name());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandbox_core::{DeploymentOptions, Orchestrator};
    use sandbox_test_utils::{fixture_artifacts, mainnet_config, network};
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn confirm_accepts_yes_only() {
        for (answer, expected) in [("y\n", true), ("YES\n", true), ("n\n", false), ("\n", false)] {
            let mut out = Vec::new();
            let accepted = confirm(&mut Cursor::new(answer), &mut out).unwrap();
            assert_eq!(accepted, expected, "{answer:?}");
            assert_eq!(String::from_utf8(out).unwrap(), "Proceed? [y/N] ");
        }
    }

    #[tokio::test]
    async fn report_lists_every_program() {
        let config = mainnet_config();
        let report = Orchestrator::new(Arc::new(network(&config)))
            .with_options(DeploymentOptions::default().with_verify_delay(Duration::ZERO))
            .deploy(&config, &fixture_artifacts())
            .await
            .unwrap();

        let text = super::report(&report);
        for program in report.programs.iter() {
            assert!(text.contains(&program.address().to_string()));
        }
        assert!(text.contains("SystemSettings   verify manually"));
        assert!(text.contains("skipped (network has no block explorer)"));
    }
}
