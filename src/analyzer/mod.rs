//! The tree-walking matcher: canonical-name rendering, backward scope
//! resolution, pattern classification, and the single-pass traversal that
//! ties them together.
//!
//! Data flows one way: the checker dispatches call sites to the classifier,
//! which resolves simple variable references through the scope resolver and
//! compares names via their canonical strings. The caller owns the returned
//! finding list; no state survives a file check.

mod checker;
mod classify;
mod scope;
mod stringify;

use std::path::Path;

use rustpython_parser::{ast::Mod, parse, Mode};
use tracing::debug;

pub use checker::Checker;
pub use stringify::canonicalize;

use crate::config::CheckConfig;
use crate::error::CheckError;
use crate::models::Finding;

/// Check one file's source text. A parse failure is fatal for the file and
/// reported distinctly from "zero findings".
pub fn check_source(
    source: &str,
    filename: &str,
    config: &CheckConfig,
) -> Result<Vec<Finding>, CheckError> {
    let module = parse(source, Mode::Module, filename).map_err(|e| CheckError::Parse {
        path: filename.into(),
        message: e.to_string(),
    })?;
    let suite = match module {
        Mod::Module(m) => m.body,
        _ => Vec::new(),
    };
    let mut checker = Checker::new(filename, source, config);
    let findings = checker.check(&suite);
    debug!("{filename}: {} finding(s)", findings.len());
    Ok(findings)
}

/// Read and check one file.
pub fn check_file(path: &Path, config: &CheckConfig) -> Result<Vec<Finding>, CheckError> {
    let source = std::fs::read_to_string(path).map_err(|e| CheckError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    check_source(&source, &path.to_string_lossy(), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failure_is_an_error_not_zero_findings() {
        let err = check_source("def broken(:\n", "broken.py", &CheckConfig::default())
            .expect_err("parse failure");
        assert!(matches!(err, CheckError::Parse { .. }));
        assert!(err.to_string().contains("broken.py"));
    }

    #[test]
    fn clean_source_yields_empty_list() {
        let findings = check_source(
            "cursor.execute(\"SELECT 1\")\n",
            "clean.py",
            &CheckConfig::default(),
        )
        .expect("check");
        assert!(findings.is_empty());
    }
}
