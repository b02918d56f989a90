//! sqlsift - heuristic SQL injection scanner for Python source
//!
//! Parses Python files into ASTs and flags call sites that pass an unsafely
//! built query string into a database-execution sink (`cursor.execute`,
//! `session.execute` by default), plus any use of `eval`. This is a fast
//! pre-commit pattern matcher, not a taint analyzer: absence of a finding is
//! not a safety guarantee.

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod reporters;

pub use analyzer::{check_file, check_source};
pub use config::CheckConfig;
pub use error::CheckError;
pub use models::{CheckReport, Finding, Reason};
