//! CLI definition and driver
//!
//! Each file is parsed and checked independently, so the per-file checks fan
//! out across a rayon pool with no shared mutable state. Results keep the
//! input file order.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use rayon::prelude::*;
use tracing::error;

use crate::analyzer;
use crate::config::CheckConfig;
use crate::models::CheckReport;
use crate::reporters::{self, OutputFormat};

/// sqlsift - heuristic SQL injection scanner for Python source
#[derive(Parser, Debug)]
#[command(name = "sqlsift")]
#[command(
    version,
    about = "Scan Python files for SQL built with interpolation, concatenation, or str.format",
    long_about = "sqlsift parses each Python file and flags query strings that are built \
unsafely before reaching a database-execution sink (cursor.execute and \
session.execute by default), plus any use of eval.\n\n\
This is a fast heuristic pre-commit check, not a taint analyzer: a clean run \
means no recognized unsafe pattern, not proven safety.",
    after_help = "\
Examples:
  sqlsift app.py models.py             Check two files
  sqlsift --format json src/db.py      JSON output for scripting
  sqlsift --sink db.run_query app.py   Extend the sink denylist
  sqlsift --no-eval app.py             Skip the eval check

Exit status: 0 if all files are clean, 1 if any finding was reported,
2 if any file could not be read or parsed. Findings go to stdout."
)]
pub struct Cli {
    /// Python files to check
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format: text, json
    #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Additional sink name to flag (repeatable)
    #[arg(long = "sink", value_name = "NAME")]
    pub sinks: Vec<String>,

    /// Config file path (default: ./sqlsift.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Disable the unconditional eval check
    #[arg(long)]
    pub no_eval: bool,
}

/// Run the check and map results to an exit status.
pub fn run(cli: Cli) -> Result<u8> {
    let mut config = match &cli.config {
        Some(path) => CheckConfig::from_file(path)?,
        None => CheckConfig::discover(std::path::Path::new(".")),
    };
    for sink in &cli.sinks {
        config.add_sink(sink);
    }
    if cli.no_eval {
        config.flag_eval = false;
    }
    let format: OutputFormat = cli.format.parse()?;

    let results: Vec<_> = cli
        .files
        .par_iter()
        .map(|path| analyzer::check_file(path, &config))
        .collect();

    let mut report = CheckReport::default();
    for result in results {
        match result {
            Ok(findings) => {
                report.findings.extend(findings);
                report.files_checked += 1;
            }
            Err(e) => {
                error!("{e}");
                eprintln!("sqlsift: {e}");
                report.files_failed += 1;
            }
        }
    }

    let rendered = reporters::render(&report, format)?;
    if !rendered.is_empty() {
        if rendered.ends_with('\n') {
            print!("{rendered}");
        } else {
            println!("{rendered}");
        }
    }

    if report.files_failed > 0 {
        Ok(2)
    } else if report.total() > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}
