//! Error types for file-level checks.
//!
//! A file that cannot be read or parsed is a hard failure for that file and
//! is reported distinctly from "zero findings". Unresolvable variable
//! references inside a valid tree are never errors; the classifier fails
//! open and simply reports nothing for that branch.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}
