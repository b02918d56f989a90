//! Pattern classifier
//!
//! Decides whether a candidate query expression was built unsafely. The
//! decision table is checked in order: `%` interpolation, `+` concatenation,
//! `.format(...)` calls, then variable references resolved through the scope
//! stack and classified recursively. Everything else is "no recognized
//! unsafe pattern", which is not a safety claim.

use std::collections::HashSet;

use rustpython_parser::ast::{Expr, Operator};

use crate::analyzer::scope::{find_assignment, Frame};
use crate::config::{CheckConfig, QueryPattern};
use crate::models::Reason;

/// Classify an expression, returning the reason and the ultimately offending
/// expression. The offending expression carries the source position a
/// finding should point at: for an aliased variable that is the assignment's
/// right-hand side, not the sink call.
///
/// `seen` guards the recursive alias resolution: a variable name already on
/// the resolution path (e.g. `x = x`) classifies as `None` instead of
/// looping.
pub(crate) fn classify<'t>(
    expr: &'t Expr,
    scopes: &[Frame<'t>],
    config: &CheckConfig,
    seen: &mut HashSet<String>,
) -> Option<(Reason, &'t Expr)> {
    match expr {
        Expr::BinOp(bin)
            if matches!(bin.op, Operator::Mod) && config.has_pattern(QueryPattern::Interpolation) =>
        {
            Some((Reason::SqlInterpolation, expr))
        }
        Expr::BinOp(bin)
            if matches!(bin.op, Operator::Add) && config.has_pattern(QueryPattern::Concatenation) =>
        {
            Some((Reason::SqlConcatenation, expr))
        }
        Expr::Call(call) => match call.func.as_ref() {
            Expr::Attribute(attr)
                if attr.attr.as_str() == "format"
                    && config.has_pattern(QueryPattern::StrFormat) =>
            {
                Some((Reason::SqlStrFormat, expr))
            }
            _ => None,
        },
        Expr::Name(name) => {
            if !seen.insert(name.id.to_string()) {
                return None;
            }
            let (assign, depth) = find_assignment(name.id.as_str(), scopes)?;
            classify(&assign.value, &scopes[..=depth], config, seen)
        }
        _ => None,
    }
}
