//! Backward scope resolution
//!
//! Approximates "most recent assignment before use" by textual proximity:
//! the direct children of the nearest enclosing block-like region are
//! scanned in reverse order, then the search escalates outward. Branches of
//! a conditional are not distinguished from each other, and the scan covers
//! the whole block including statements after the use site. This imprecision
//! is intentional and load-bearing for the matcher's behavior; do not
//! tighten it.

use rustpython_parser::ast::{Stmt, StmtAssign};

use crate::analyzer::stringify::canonicalize;

/// The direct child statements of one block-like region, in textual order.
/// For `if`/`for`/`while` this merges the body and the `else` suite.
pub(crate) type Frame<'t> = Vec<&'t Stmt>;

/// Find the nearest preceding assignment to `variable`, searching the
/// innermost frame first and walking outward. Returns the assignment and the
/// depth of the frame it was found in, so that recursive classification of
/// its right-hand side resolves against enclosing scopes only.
///
/// `None` means the variable's origin could not be determined; callers treat
/// that as "no finding", never as unsafe.
pub(crate) fn find_assignment<'t>(
    variable: &str,
    scopes: &[Frame<'t>],
) -> Option<(&'t StmtAssign, usize)> {
    for (depth, frame) in scopes.iter().enumerate().rev() {
        for stmt in frame.iter().rev() {
            if let Stmt::Assign(assign) = stmt {
                if assign.targets.iter().any(|t| canonicalize(t) == variable) {
                    return Some((assign, depth));
                }
            }
        }
    }
    None
}
