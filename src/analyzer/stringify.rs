//! Expression canonicalizer
//!
//! Flattens an expression subtree into a string used only for identity
//! comparisons: matching a call target against the sink denylist and
//! matching assignment targets against a variable name. Canonical names are
//! never re-parsed.

use rustpython_parser::ast::{Constant, Expr, Keyword};

/// Render an expression as a canonical name.
///
/// Total over all expression kinds: anything without a dedicated rule falls
/// back to an opaque structural dump that is stable for equality but not
/// meant to be read. A call is always rendered `func([args...], [kwargs...])`
/// with `func` canonicalized recursively, so nested call targets compare
/// consistently.
pub fn canonicalize(expr: &Expr) -> String {
    match expr {
        Expr::Name(name) => name.id.to_string(),
        Expr::Attribute(attr) => format!("{}.{}", canonicalize(&attr.value), attr.attr),
        Expr::Subscript(sub) => {
            format!("{}[{}]", canonicalize(&sub.value), canonicalize(&sub.slice))
        }
        Expr::Call(call) => format!(
            "{}({}, {})",
            canonicalize(&call.func),
            canonicalize_list(&call.args),
            canonicalize_keywords(&call.keywords)
        ),
        Expr::List(list) => canonicalize_list(&list.elts),
        Expr::Constant(constant) => match &constant.value {
            Constant::Str(s) => s.clone(),
            _ => format!("{:?}", expr),
        },
        _ => format!("{:?}", expr),
    }
}

fn canonicalize_list(items: &[Expr]) -> String {
    let parts: Vec<String> = items.iter().map(canonicalize).collect();
    format!("[{}]", parts.join(", "))
}

fn canonicalize_keywords(keywords: &[Keyword]) -> String {
    let parts: Vec<String> = keywords
        .iter()
        .map(|kw| match &kw.arg {
            Some(name) => format!("{}={}", name, canonicalize(&kw.value)),
            None => format!("**{}", canonicalize(&kw.value)),
        })
        .collect();
    format!("[{}]", parts.join(", "))
}
