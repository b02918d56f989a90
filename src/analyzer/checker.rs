//! Traversal engine
//!
//! Walks a parsed module once, depth-first and pre-order, carrying the stack
//! of enclosing block-like regions. Call nodes are checked against the sink
//! denylist and the `eval` rule; recursion continues into every child either
//! way, so sinks nested inside other expressions are still found. Findings
//! are appended in discovery order.

use std::collections::HashSet;

use line_numbers::LinePositions;
use rustpython_parser::ast::{
    Arguments, Comprehension, ExceptHandler, Expr, ExprCall, Keyword, Ranged, Stmt, Suite,
};

use crate::analyzer::classify::classify;
use crate::analyzer::scope::Frame;
use crate::analyzer::stringify::canonicalize;
use crate::config::CheckConfig;
use crate::models::{Finding, Reason};

/// Single-pass checker for one parsed file.
///
/// Holds no state across runs beyond the accumulated findings, which
/// [`Checker::check`] drains; checking the same tree twice yields identical
/// lists.
pub struct Checker<'s> {
    filename: &'s str,
    config: &'s CheckConfig,
    line_positions: LinePositions,
    findings: Vec<Finding>,
}

impl<'s> Checker<'s> {
    pub fn new(filename: &'s str, source: &str, config: &'s CheckConfig) -> Self {
        Self {
            filename,
            config,
            line_positions: LinePositions::from(source),
            findings: Vec::new(),
        }
    }

    /// Walk the module and return all findings in discovery order.
    pub fn check<'t>(&mut self, suite: &'t Suite) -> Vec<Finding> {
        let mut scopes: Vec<Frame<'t>> = vec![suite.iter().collect()];
        self.visit_suite(suite, &mut scopes);
        std::mem::take(&mut self.findings)
    }

    fn visit_suite<'t>(&mut self, suite: &'t [Stmt], scopes: &mut Vec<Frame<'t>>) {
        for stmt in suite {
            self.visit_stmt(stmt, scopes);
        }
    }

    fn visit_stmt<'t>(&mut self, stmt: &'t Stmt, scopes: &mut Vec<Frame<'t>>) {
        match stmt {
            Stmt::FunctionDef(def) => {
                scopes.push(def.body.iter().collect());
                for dec in &def.decorator_list {
                    self.visit_expr(dec, scopes);
                }
                self.visit_arguments(&def.args, scopes);
                if let Some(returns) = &def.returns {
                    self.visit_expr(returns, scopes);
                }
                self.visit_suite(&def.body, scopes);
                scopes.pop();
            }
            Stmt::AsyncFunctionDef(def) => {
                scopes.push(def.body.iter().collect());
                for dec in &def.decorator_list {
                    self.visit_expr(dec, scopes);
                }
                self.visit_arguments(&def.args, scopes);
                if let Some(returns) = &def.returns {
                    self.visit_expr(returns, scopes);
                }
                self.visit_suite(&def.body, scopes);
                scopes.pop();
            }
            Stmt::ClassDef(def) => {
                // class bodies are not assignment-resolution scopes
                for dec in &def.decorator_list {
                    self.visit_expr(dec, scopes);
                }
                for base in &def.bases {
                    self.visit_expr(base, scopes);
                }
                self.visit_keywords(&def.keywords, scopes);
                self.visit_suite(&def.body, scopes);
            }
            Stmt::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.visit_expr(value, scopes);
                }
            }
            Stmt::Delete(del) => {
                for target in &del.targets {
                    self.visit_expr(target, scopes);
                }
            }
            Stmt::Assign(assign) => {
                for target in &assign.targets {
                    self.visit_expr(target, scopes);
                }
                self.visit_expr(&assign.value, scopes);
            }
            Stmt::AugAssign(assign) => {
                self.visit_expr(&assign.target, scopes);
                self.visit_expr(&assign.value, scopes);
            }
            Stmt::AnnAssign(assign) => {
                self.visit_expr(&assign.target, scopes);
                self.visit_expr(&assign.annotation, scopes);
                if let Some(value) = &assign.value {
                    self.visit_expr(value, scopes);
                }
            }
            Stmt::For(for_stmt) => {
                scopes.push(for_stmt.body.iter().chain(&for_stmt.orelse).collect());
                self.visit_expr(&for_stmt.target, scopes);
                self.visit_expr(&for_stmt.iter, scopes);
                self.visit_suite(&for_stmt.body, scopes);
                self.visit_suite(&for_stmt.orelse, scopes);
                scopes.pop();
            }
            Stmt::AsyncFor(for_stmt) => {
                scopes.push(for_stmt.body.iter().chain(&for_stmt.orelse).collect());
                self.visit_expr(&for_stmt.target, scopes);
                self.visit_expr(&for_stmt.iter, scopes);
                self.visit_suite(&for_stmt.body, scopes);
                self.visit_suite(&for_stmt.orelse, scopes);
                scopes.pop();
            }
            Stmt::While(while_stmt) => {
                scopes.push(while_stmt.body.iter().chain(&while_stmt.orelse).collect());
                self.visit_expr(&while_stmt.test, scopes);
                self.visit_suite(&while_stmt.body, scopes);
                self.visit_suite(&while_stmt.orelse, scopes);
                scopes.pop();
            }
            Stmt::If(if_stmt) => {
                // one merged frame for both branches; resolution does not
                // distinguish them
                scopes.push(if_stmt.body.iter().chain(&if_stmt.orelse).collect());
                self.visit_expr(&if_stmt.test, scopes);
                self.visit_suite(&if_stmt.body, scopes);
                self.visit_suite(&if_stmt.orelse, scopes);
                scopes.pop();
            }
            Stmt::With(with_stmt) => {
                scopes.push(with_stmt.body.iter().collect());
                for item in &with_stmt.items {
                    self.visit_expr(&item.context_expr, scopes);
                    if let Some(vars) = &item.optional_vars {
                        self.visit_expr(vars, scopes);
                    }
                }
                self.visit_suite(&with_stmt.body, scopes);
                scopes.pop();
            }
            Stmt::AsyncWith(with_stmt) => {
                scopes.push(with_stmt.body.iter().collect());
                for item in &with_stmt.items {
                    self.visit_expr(&item.context_expr, scopes);
                    if let Some(vars) = &item.optional_vars {
                        self.visit_expr(vars, scopes);
                    }
                }
                self.visit_suite(&with_stmt.body, scopes);
                scopes.pop();
            }
            Stmt::Match(match_stmt) => {
                self.visit_expr(&match_stmt.subject, scopes);
                for case in &match_stmt.cases {
                    if let Some(guard) = &case.guard {
                        self.visit_expr(guard, scopes);
                    }
                    self.visit_suite(&case.body, scopes);
                }
            }
            Stmt::Raise(raise) => {
                if let Some(exc) = &raise.exc {
                    self.visit_expr(exc, scopes);
                }
                if let Some(cause) = &raise.cause {
                    self.visit_expr(cause, scopes);
                }
            }
            Stmt::Try(try_stmt) => {
                self.visit_suite(&try_stmt.body, scopes);
                for handler in &try_stmt.handlers {
                    let ExceptHandler::ExceptHandler(h) = handler;
                    if let Some(type_) = &h.type_ {
                        self.visit_expr(type_, scopes);
                    }
                    self.visit_suite(&h.body, scopes);
                }
                self.visit_suite(&try_stmt.orelse, scopes);
                self.visit_suite(&try_stmt.finalbody, scopes);
            }
            Stmt::TryStar(try_stmt) => {
                self.visit_suite(&try_stmt.body, scopes);
                for handler in &try_stmt.handlers {
                    let ExceptHandler::ExceptHandler(h) = handler;
                    if let Some(type_) = &h.type_ {
                        self.visit_expr(type_, scopes);
                    }
                    self.visit_suite(&h.body, scopes);
                }
                self.visit_suite(&try_stmt.orelse, scopes);
                self.visit_suite(&try_stmt.finalbody, scopes);
            }
            Stmt::Assert(assert) => {
                self.visit_expr(&assert.test, scopes);
                if let Some(msg) = &assert.msg {
                    self.visit_expr(msg, scopes);
                }
            }
            Stmt::Expr(expr_stmt) => {
                self.visit_expr(&expr_stmt.value, scopes);
            }
            // Import, Global, Nonlocal, Pass, Break, Continue
            _ => {}
        }
    }

    fn visit_expr<'t>(&mut self, expr: &'t Expr, scopes: &mut Vec<Frame<'t>>) {
        match expr {
            Expr::Call(call) => {
                self.handle_call(call, scopes);
                self.visit_expr(&call.func, scopes);
                for arg in &call.args {
                    self.visit_expr(arg, scopes);
                }
                self.visit_keywords(&call.keywords, scopes);
            }
            Expr::BoolOp(bool_op) => {
                for value in &bool_op.values {
                    self.visit_expr(value, scopes);
                }
            }
            Expr::NamedExpr(named) => {
                self.visit_expr(&named.target, scopes);
                self.visit_expr(&named.value, scopes);
            }
            Expr::BinOp(bin) => {
                self.visit_expr(&bin.left, scopes);
                self.visit_expr(&bin.right, scopes);
            }
            Expr::UnaryOp(unary) => {
                self.visit_expr(&unary.operand, scopes);
            }
            Expr::Lambda(lambda) => {
                self.visit_arguments(&lambda.args, scopes);
                self.visit_expr(&lambda.body, scopes);
            }
            Expr::IfExp(if_exp) => {
                self.visit_expr(&if_exp.test, scopes);
                self.visit_expr(&if_exp.body, scopes);
                self.visit_expr(&if_exp.orelse, scopes);
            }
            Expr::Dict(dict) => {
                for key in dict.keys.iter().flatten() {
                    self.visit_expr(key, scopes);
                }
                for value in &dict.values {
                    self.visit_expr(value, scopes);
                }
            }
            Expr::Set(set) => {
                for elt in &set.elts {
                    self.visit_expr(elt, scopes);
                }
            }
            Expr::ListComp(comp) => {
                self.visit_expr(&comp.elt, scopes);
                self.visit_comprehensions(&comp.generators, scopes);
            }
            Expr::SetComp(comp) => {
                self.visit_expr(&comp.elt, scopes);
                self.visit_comprehensions(&comp.generators, scopes);
            }
            Expr::DictComp(comp) => {
                self.visit_expr(&comp.key, scopes);
                self.visit_expr(&comp.value, scopes);
                self.visit_comprehensions(&comp.generators, scopes);
            }
            Expr::GeneratorExp(comp) => {
                self.visit_expr(&comp.elt, scopes);
                self.visit_comprehensions(&comp.generators, scopes);
            }
            Expr::Await(await_expr) => {
                self.visit_expr(&await_expr.value, scopes);
            }
            Expr::Yield(yield_expr) => {
                if let Some(value) = &yield_expr.value {
                    self.visit_expr(value, scopes);
                }
            }
            Expr::YieldFrom(yield_from) => {
                self.visit_expr(&yield_from.value, scopes);
            }
            Expr::Compare(compare) => {
                self.visit_expr(&compare.left, scopes);
                for comparator in &compare.comparators {
                    self.visit_expr(comparator, scopes);
                }
            }
            Expr::FormattedValue(formatted) => {
                self.visit_expr(&formatted.value, scopes);
                if let Some(spec) = &formatted.format_spec {
                    self.visit_expr(spec, scopes);
                }
            }
            Expr::JoinedStr(joined) => {
                for value in &joined.values {
                    self.visit_expr(value, scopes);
                }
            }
            Expr::Attribute(attr) => {
                self.visit_expr(&attr.value, scopes);
            }
            Expr::Subscript(sub) => {
                self.visit_expr(&sub.value, scopes);
                self.visit_expr(&sub.slice, scopes);
            }
            Expr::Starred(starred) => {
                self.visit_expr(&starred.value, scopes);
            }
            Expr::List(list) => {
                for elt in &list.elts {
                    self.visit_expr(elt, scopes);
                }
            }
            Expr::Tuple(tuple) => {
                for elt in &tuple.elts {
                    self.visit_expr(elt, scopes);
                }
            }
            Expr::Slice(slice) => {
                if let Some(lower) = &slice.lower {
                    self.visit_expr(lower, scopes);
                }
                if let Some(upper) = &slice.upper {
                    self.visit_expr(upper, scopes);
                }
                if let Some(step) = &slice.step {
                    self.visit_expr(step, scopes);
                }
            }
            // Name, Constant
            _ => {}
        }
    }

    /// The only specialized handler: sink calls get their first positional
    /// argument classified, and `eval` is flagged regardless of arguments.
    fn handle_call<'t>(&mut self, call: &'t ExprCall, scopes: &[Frame<'t>]) {
        let target = canonicalize(&call.func);
        if self.config.is_sink(&target) {
            if let Some(first) = call.args.first() {
                let mut seen = HashSet::new();
                if let Some((reason, offending)) = classify(first, scopes, self.config, &mut seen)
                {
                    self.push_finding(reason, offending.range().start().into());
                }
            }
        }
        if self.config.flag_eval && target.eq_ignore_ascii_case("eval") {
            self.push_finding(Reason::Eval, call.range.start().into());
        }
    }

    fn visit_arguments<'t>(&mut self, args: &'t Arguments, scopes: &mut Vec<Frame<'t>>) {
        for arg in args
            .posonlyargs
            .iter()
            .chain(&args.args)
            .chain(&args.kwonlyargs)
        {
            if let Some(default) = &arg.default {
                self.visit_expr(default, scopes);
            }
            if let Some(annotation) = &arg.def.annotation {
                self.visit_expr(annotation, scopes);
            }
        }
    }

    fn visit_keywords<'t>(&mut self, keywords: &'t [Keyword], scopes: &mut Vec<Frame<'t>>) {
        for keyword in keywords {
            self.visit_expr(&keyword.value, scopes);
        }
    }

    fn visit_comprehensions<'t>(
        &mut self,
        generators: &'t [Comprehension],
        scopes: &mut Vec<Frame<'t>>,
    ) {
        for gen in generators {
            self.visit_expr(&gen.target, scopes);
            self.visit_expr(&gen.iter, scopes);
            for if_clause in &gen.ifs {
                self.visit_expr(if_clause, scopes);
            }
        }
    }

    fn push_finding(&mut self, reason: Reason, offset: usize) {
        let line = self.line_positions.from_offset(offset).as_usize() + 1;
        self.findings.push(Finding {
            file: self.filename.to_string(),
            line,
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustpython_parser::ast::Mod;
    use rustpython_parser::{parse, Mode};

    fn check(source: &str) -> Vec<Finding> {
        check_with(source, &CheckConfig::default())
    }

    fn check_with(source: &str, config: &CheckConfig) -> Vec<Finding> {
        let suite = match parse(source, Mode::Module, "<test>").expect("parse") {
            Mod::Module(m) => m.body,
            _ => panic!("expected module"),
        };
        Checker::new("test.py", source, config).check(&suite)
    }

    #[test]
    fn inline_interpolation() {
        let findings = check("cursor.execute(\"SELECT * FROM t WHERE id=%s\" % x)\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].reason, Reason::SqlInterpolation);
        assert_eq!(findings[0].line, 1);
        assert_eq!(findings[0].file, "test.py");
    }

    #[test]
    fn concatenation_through_alias_points_at_assignment_line() {
        let findings = check("import db\nquery = \"a\" + b\ncursor.execute(query)\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].reason, Reason::SqlConcatenation);
        assert_eq!(findings[0].line, 2);
    }

    #[test]
    fn str_format_through_alias_points_at_assignment_line() {
        let findings = check("query = \"{} \".format(x)\n\ncursor.execute(query)\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].reason, Reason::SqlStrFormat);
        assert_eq!(findings[0].line, 1);
    }

    #[test]
    fn literal_query_is_clean() {
        assert!(check("cursor.execute(\"SELECT 1\")\n").is_empty());
    }

    #[test]
    fn parameterized_query_is_clean() {
        assert!(check("cursor.execute(\"SELECT * FROM t WHERE id=%s\", (x,))\n").is_empty());
    }

    #[test]
    fn eval_is_always_flagged() {
        let findings = check("x = 1\neval(anything)\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].reason, Reason::Eval);
        assert_eq!(findings[0].line, 2);
    }

    #[test]
    fn eval_matches_case_insensitively() {
        let findings = check("EVAL(x)\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].reason, Reason::Eval);
    }

    #[test]
    fn sink_names_match_case_insensitively() {
        let upper = check("CURSOR.EXECUTE(x % y)\n");
        let mixed = check("Session.Execute(x % y)\n");
        assert_eq!(upper.len(), 1);
        assert_eq!(mixed.len(), 1);
        assert_eq!(upper[0].reason, Reason::SqlInterpolation);
        assert_eq!(mixed[0].reason, Reason::SqlInterpolation);
    }

    #[test]
    fn shadowing_resolves_to_nearest_assignment() {
        // the later, safe assignment wins
        let findings = check("q = \"a\" + b\nq = \"SELECT 1\"\ncursor.execute(q)\n");
        assert!(findings.is_empty());

        // reversed order: the unsafe assignment is now nearest
        let findings = check("q = \"SELECT 1\"\nq = \"a\" + b\ncursor.execute(q)\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].reason, Reason::SqlConcatenation);
        assert_eq!(findings[0].line, 2);
    }

    #[test]
    fn check_is_idempotent() {
        let source = "q = \"a\" + b\ncursor.execute(q)\neval(x)\n";
        let suite = match parse(source, Mode::Module, "<test>").expect("parse") {
            Mod::Module(m) => m.body,
            _ => panic!("expected module"),
        };
        let config = CheckConfig::default();
        let mut checker = Checker::new("test.py", source, &config);
        let first = checker.check(&suite);
        let second = checker.check(&suite);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn findings_appear_in_discovery_order() {
        let findings = check("cursor.execute(a % b)\neval(x)\nsession.execute(c + d)\n");
        let reasons: Vec<Reason> = findings.iter().map(|f| f.reason).collect();
        assert_eq!(
            reasons,
            vec![
                Reason::SqlInterpolation,
                Reason::Eval,
                Reason::SqlConcatenation
            ]
        );
    }

    #[test]
    fn two_sinks_on_one_line_each_produce_a_finding() {
        let findings = check("cursor.execute(a % b); session.execute(c % d)\n");
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].line, 1);
        assert_eq!(findings[1].line, 1);
    }

    #[test]
    fn nested_sink_call_is_discovered() {
        let findings = check("log(cursor.execute(q % x))\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].reason, Reason::SqlInterpolation);
    }

    #[test]
    fn sink_inside_function_body_is_found() {
        let findings = check(
            "def lookup(user):\n    q = \"SELECT name FROM users WHERE id=\" + user\n    cursor.execute(q)\n",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].reason, Reason::SqlConcatenation);
        assert_eq!(findings[0].line, 2);
    }

    #[test]
    fn resolution_escalates_to_module_scope() {
        let findings = check(
            "q = \"a\" % b\ndef lookup():\n    cursor.execute(q)\n",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].reason, Reason::SqlInterpolation);
        assert_eq!(findings[0].line, 1);
    }

    #[test]
    fn unresolved_variable_fails_open() {
        assert!(check("cursor.execute(q)\n").is_empty());
    }

    #[test]
    fn self_referential_assignment_does_not_loop() {
        assert!(check("x = x\ncursor.execute(x)\n").is_empty());
    }

    #[test]
    fn branches_are_merged_during_resolution() {
        // a use in the else branch sees the assignment from the then branch
        let findings = check(
            "if cond:\n    q = \"a\" + b\nelse:\n    cursor.execute(q)\n",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].reason, Reason::SqlConcatenation);
        assert_eq!(findings[0].line, 2);
    }

    #[test]
    fn assignment_inside_branch_is_invisible_after_the_if() {
        // the assignment is a child of the If, not of the module block
        let findings = check(
            "if cond:\n    q = \"a\" + b\ncursor.execute(q)\n",
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn assignment_later_in_block_still_resolves() {
        // the reverse scan covers the whole block, including statements
        // after the use site
        let findings = check("cursor.execute(q)\nq = \"a\" + b\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 2);
    }

    #[test]
    fn sink_in_loop_body_resolves_loop_scope() {
        let findings = check(
            "for row in rows:\n    q = \"a\" % row\n    cursor.execute(q)\n",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 2);
    }

    #[test]
    fn custom_sink_from_config() {
        let mut config = CheckConfig::default();
        config.add_sink("db.run_query");
        let findings = check_with("db.run_query(a % b)\n", &config);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].reason, Reason::SqlInterpolation);
    }

    #[test]
    fn eval_check_can_be_disabled() {
        let config = CheckConfig {
            flag_eval: false,
            ..CheckConfig::default()
        };
        assert!(check_with("eval(x)\n", &config).is_empty());
    }

    #[test]
    fn non_sink_method_named_execute_elsewhere_is_clean() {
        assert!(check("runner.execute(a % b)\n").is_empty());
    }

    #[test]
    fn keyword_only_sink_call_is_clean() {
        // no positional argument to classify
        assert!(check("cursor.execute(sql=a % b)\n").is_empty());
    }
}
