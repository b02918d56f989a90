//! Text reporter
//!
//! The classic pre-commit output: one `file:line<TAB>reason` row per finding
//! followed by a total, or nothing at all when the run is clean.

use std::fmt::Write;

use anyhow::Result;

use crate::models::CheckReport;

/// Render report as plain text. Returns an empty string for a clean run.
pub fn render(report: &CheckReport) -> Result<String> {
    let mut out = String::new();
    for finding in &report.findings {
        writeln!(out, "{finding}")?;
    }
    if !report.findings.is_empty() {
        writeln!(out, "{} total errors", report.findings.len())?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_report;

    #[test]
    fn rows_and_total() {
        let out = render(&test_report()).expect("render");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "app/db.py:6\tstring interpolation of SQL query",
                "app/db.py:14\teval is dangerous",
                "2 total errors",
            ]
        );
    }

    #[test]
    fn clean_run_renders_nothing() {
        let report = CheckReport {
            files_checked: 3,
            ..Default::default()
        };
        assert!(render(&report).expect("render").is_empty());
    }
}
