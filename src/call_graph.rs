//! Reachability from `main`, used as the dead-code-elimination pass.
//!
//! Simplified from a full call-graph/SCC analysis (mutual recursion is not
//! a concept this compiler needs to classify) down to a worklist mark
//! phase: start at `main`, follow every `FuncCall` name reachable from the
//! function bodies already known to be reachable.

use crate::ast::{Expr, ExprKind, Program, Stmt, StmtKind};
use std::collections::HashSet;

pub fn reachable_functions(program: &Program) -> HashSet<String> {
    let mut reachable = HashSet::new();
    if program.find_function("main").is_none() {
        return reachable;
    }
    let mut worklist = vec!["main".to_string()];
    reachable.insert("main".to_string());

    while let Some(name) = worklist.pop() {
        let Some(func) = program.find_function(&name) else { continue };
        let mut callees = HashSet::new();
        for stmt in &func.body {
            collect_calls_stmt(stmt, &mut callees);
        }
        for callee in callees {
            if reachable.insert(callee.clone()) {
                worklist.push(callee);
            }
        }
    }

    reachable
}

fn collect_calls_stmt(stmt: &Stmt, out: &mut HashSet<String>) {
    match &stmt.kind {
        StmtKind::VarDecl { init: Some(e), .. } => collect_calls_expr(e, out),
        StmtKind::VarDecl { init: None, .. } | StmtKind::ArrayDecl { .. } => {}
        StmtKind::Expr(e) => collect_calls_expr(e, out),
        StmtKind::Return(Some(e)) => collect_calls_expr(e, out),
        StmtKind::Return(None) => {}
        StmtKind::Block(stmts) => stmts.iter().for_each(|s| collect_calls_stmt(s, out)),
        StmtKind::If { cond, then_branch, else_branch } => {
            collect_calls_expr(cond, out);
            collect_calls_stmt(then_branch, out);
            if let Some(e) = else_branch {
                collect_calls_stmt(e, out);
            }
        }
        StmtKind::While { cond, body } => {
            collect_calls_expr(cond, out);
            collect_calls_stmt(body, out);
        }
        StmtKind::For { init, cond, step, body } => {
            if let Some(s) = init {
                collect_calls_stmt(s, out);
            }
            if let Some(c) = cond {
                collect_calls_expr(c, out);
            }
            if let Some(s) = step {
                collect_calls_expr(s, out);
            }
            collect_calls_stmt(body, out);
        }
    }
}

fn collect_calls_expr(expr: &Expr, out: &mut HashSet<String>) {
    match &expr.kind {
        ExprKind::Int(_) | ExprKind::Str(_) | ExprKind::Var(_) => {}
        ExprKind::Unary(_, inner) => collect_calls_expr(inner, out),
        ExprKind::Binary(_, lhs, rhs) => {
            collect_calls_expr(lhs, out);
            collect_calls_expr(rhs, out);
        }
        ExprKind::Assign(_, value) => collect_calls_expr(value, out),
        ExprKind::PostInc(target) => collect_calls_expr(target, out),
        ExprKind::ArrayAccess { index, .. } => collect_calls_expr(index, out),
        ExprKind::Member { base, .. } => collect_calls_expr(base, out),
        ExprKind::FuncCall { name, args } => {
            out.insert(name.clone());
            args.iter().for_each(|a| collect_calls_expr(a, out));
        }
        ExprKind::Syscall(args) => args.iter().for_each(|a| collect_calls_expr(a, out)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn parse(src: &str) -> Program {
        let mut p = Parser::new(src, "t.hel").unwrap();
        p.parse_program().unwrap()
    }

    #[test]
    fn main_alone_is_reachable() {
        let prog = parse("fn main() -> int { return 0; }");
        let r = reachable_functions(&prog);
        assert_eq!(r, HashSet::from(["main".to_string()]));
    }

    #[test]
    fn called_function_is_reachable_uncalled_is_not() {
        let prog = parse(
            "fn f(x: int) -> int { return x+1; } fn g(x: int) -> int { return x; } fn main() -> int { return f(41); }",
        );
        let r = reachable_functions(&prog);
        assert!(r.contains("main"));
        assert!(r.contains("f"));
        assert!(!r.contains("g"));
    }

    #[test]
    fn transitive_calls_are_followed() {
        let prog = parse(
            "fn h() -> int { return 1; } fn f() -> int { return h(); } fn main() -> int { return f(); }",
        );
        let r = reachable_functions(&prog);
        assert!(r.contains("h"));
    }
}
