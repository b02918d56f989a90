//! Core data models for sqlsift
//!
//! Findings are plain value records scoped to one check run; nothing here
//! persists or is shared across files.

use serde::{Deserialize, Serialize};

/// Why a query expression was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    SqlInterpolation,
    SqlConcatenation,
    SqlStrFormat,
    Eval,
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reason::SqlInterpolation => write!(f, "string interpolation of SQL query"),
            Reason::SqlConcatenation => write!(f, "string concatenation of SQL query"),
            Reason::SqlStrFormat => write!(f, "str.format called on SQL query"),
            Reason::Eval => write!(f, "eval is dangerous"),
        }
    }
}

/// One reported instance of an unsafe query-construction pattern.
///
/// `line` is the 1-based line of the offending expression itself (e.g. where
/// the concatenation happens), not the sink call that triggered the check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub file: String,
    pub line: usize,
    pub reason: Reason,
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}\t{}", self.file, self.line, self.reason)
    }
}

/// Aggregated results of one run over a set of files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckReport {
    pub findings: Vec<Finding>,
    pub files_checked: usize,
    pub files_failed: usize,
}

impl CheckReport {
    pub fn total(&self) -> usize {
        self.findings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finding_display_matches_report_format() {
        let finding = Finding {
            file: "app/db.py".to_string(),
            line: 6,
            reason: Reason::SqlInterpolation,
        };
        assert_eq!(
            finding.to_string(),
            "app/db.py:6\tstring interpolation of SQL query"
        );
    }

    #[test]
    fn reason_messages() {
        assert_eq!(
            Reason::SqlConcatenation.to_string(),
            "string concatenation of SQL query"
        );
        assert_eq!(
            Reason::SqlStrFormat.to_string(),
            "str.format called on SQL query"
        );
        assert_eq!(Reason::Eval.to_string(), "eval is dangerous");
    }

    #[test]
    fn reason_serializes_snake_case() {
        let json = serde_json::to_string(&Reason::SqlStrFormat).expect("serialize");
        assert_eq!(json, "\"sql_str_format\"");
    }
}
