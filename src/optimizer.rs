//! Constant folding: a post-order pass over each function body.
//!
//! A `Binary` node whose both operands are integer literals is replaced
//! in place with a single integer literal, for `+ - * | &`. Division is
//! only folded when the divisor is nonzero (left as a runtime operation
//! otherwise, since a folded division by zero would silently hide what
//! should be a runtime trap).

use crate::ast::{BinOp, Expr, ExprKind, Program, Stmt, StmtKind};

pub fn fold_program(program: &mut Program) {
    for func in &mut program.functions {
        for stmt in &mut func.body {
            fold_stmt(stmt);
        }
    }
}

fn fold_stmt(stmt: &mut Stmt) {
    match &mut stmt.kind {
        StmtKind::VarDecl { init: Some(e), .. } => fold_expr(e),
        StmtKind::VarDecl { init: None, .. } | StmtKind::ArrayDecl { .. } => {}
        StmtKind::Expr(e) => fold_expr(e),
        StmtKind::Return(Some(e)) => fold_expr(e),
        StmtKind::Return(None) => {}
        StmtKind::Block(stmts) => stmts.iter_mut().for_each(fold_stmt),
        StmtKind::If { cond, then_branch, else_branch } => {
            fold_expr(cond);
            fold_stmt(then_branch);
            if let Some(e) = else_branch {
                fold_stmt(e);
            }
        }
        StmtKind::While { cond, body } => {
            fold_expr(cond);
            fold_stmt(body);
        }
        StmtKind::For { init, cond, step, body } => {
            if let Some(s) = init {
                fold_stmt(s);
            }
            if let Some(c) = cond {
                fold_expr(c);
            }
            if let Some(s) = step {
                fold_expr(s);
            }
            fold_stmt(body);
        }
    }
}

fn fold_expr(expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Int(_) | ExprKind::Str(_) | ExprKind::Var(_) => {}
        ExprKind::Unary(_, inner) => fold_expr(inner),
        ExprKind::Binary(op, lhs, rhs) => {
            fold_expr(lhs);
            fold_expr(rhs);
            if let (ExprKind::Int(l), ExprKind::Int(r)) = (&lhs.kind, &rhs.kind) {
                if let Some(folded) = fold_binop(*op, *l, *r) {
                    expr.kind = ExprKind::Int(folded);
                }
            }
        }
        ExprKind::Assign(_, value) => fold_expr(value),
        ExprKind::PostInc(target) => fold_expr(target),
        ExprKind::ArrayAccess { index, .. } => fold_expr(index),
        ExprKind::Member { base, .. } => fold_expr(base),
        ExprKind::FuncCall { args, .. } | ExprKind::Syscall(args) => args.iter_mut().for_each(fold_expr),
    }
}

fn fold_binop(op: BinOp, l: i64, r: i64) -> Option<i64> {
    match op {
        BinOp::Add => Some(l.wrapping_add(r)),
        BinOp::Sub => Some(l.wrapping_sub(r)),
        BinOp::Mul => Some(l.wrapping_mul(r)),
        BinOp::Div if r != 0 => Some(l.wrapping_div(r)),
        BinOp::BitOr => Some(l | r),
        BinOp::BitAnd => Some(l & r),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn folded(src: &str) -> Program {
        let mut p = Parser::new(src, "t.hel").unwrap();
        let mut prog = p.parse_program().unwrap();
        fold_program(&mut prog);
        prog
    }

    #[test]
    fn folds_additive_and_multiplicative_chain() {
        let prog = folded("fn main() -> int { return 2+3*4; }");
        let StmtKind::Return(Some(expr)) = &prog.functions[0].body[0].kind else { panic!() };
        assert_eq!(expr.kind, ExprKind::Int(14));
    }

    #[test]
    fn division_by_zero_is_left_unfolded() {
        let prog = folded("fn main() -> int { return 4/0; }");
        let StmtKind::Return(Some(expr)) = &prog.functions[0].body[0].kind else { panic!() };
        assert!(matches!(expr.kind, ExprKind::Binary(BinOp::Div, _, _)));
    }

    #[test]
    fn leaves_variable_expressions_alone() {
        let prog = folded("fn main() -> int { int x = 1; return x+2; }");
        let StmtKind::Return(Some(expr)) = &prog.functions[0].body[1].kind else { panic!() };
        assert!(matches!(expr.kind, ExprKind::Binary(BinOp::Add, _, _)));
    }
}
