//! JSON reporter
//!
//! Outputs the full CheckReport as pretty-printed JSON for machine
//! consumption or piping to jq.

use anyhow::Result;

use crate::models::CheckReport;

/// Render report as JSON
pub fn render(report: &CheckReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
