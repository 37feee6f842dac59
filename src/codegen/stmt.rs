//! Per-node statement emission: declarations, control flow, and
//! expression statements (with the stack-discipline cleanup described in
//! the expanded specification).

use std::fmt::Write;

use crate::ast::{Stmt, StmtKind, TypeName};
use crate::codegen::error::CgResult;
use crate::codegen::expr::gen_expr;
use crate::codegen::state::CodeGen;

pub fn gen_stmt(cg: &mut CodeGen, stmt: &Stmt) -> CgResult<()> {
    match &stmt.kind {
        StmtKind::VarDecl { name, ty, init } => gen_var_decl(cg, name, ty, init.as_ref()),
        StmtKind::ArrayDecl { name, elem_ty, len } => gen_array_decl(cg, name, elem_ty, *len),
        StmtKind::Expr(expr) => {
            gen_expr(cg, expr)?;
            if expr.pushes_value() {
                writeln!(cg.text, "  add rsp, 8")?;
            }
            Ok(())
        }
        StmtKind::Return(value) => gen_return(cg, value.as_ref()),
        StmtKind::Block(stmts) => {
            for s in stmts {
                gen_stmt(cg, s)?;
            }
            Ok(())
        }
        StmtKind::If { cond, then_branch, else_branch } => gen_if(cg, cond, then_branch, else_branch.as_deref()),
        StmtKind::While { cond, body } => gen_while(cg, cond, body),
        StmtKind::For { init, cond, step, body } => gen_for(cg, init.as_deref(), cond, step, body),
    }
}

fn gen_var_decl(cg: &mut CodeGen, name: &str, ty: &TypeName, init: Option<&crate::ast::Expr>) -> CgResult<()> {
    let size = cg.structs.size_of(ty);
    let is_struct = matches!(ty, TypeName::Struct(_));
    let offset = cg.symbols.add(name, ty.clone(), size, is_struct);

    if is_struct {
        return Ok(());
    }

    let Some(init) = init else { return Ok(()) };

    if let crate::ast::ExprKind::Int(v) = &init.kind {
        if matches!(ty, TypeName::Char) {
            writeln!(cg.text, "  mov byte [rbp{offset}], {v}")?;
        } else {
            writeln!(cg.text, "  mov qword [rbp{offset}], {v}")?;
        }
        return Ok(());
    }

    gen_expr(cg, init)?;
    writeln!(cg.text, "  pop rax")?;
    if matches!(ty, TypeName::Char) {
        writeln!(cg.text, "  mov byte [rbp{offset}], al")?;
    } else {
        writeln!(cg.text, "  mov qword [rbp{offset}], rax")?;
    }
    Ok(())
}

fn gen_array_decl(cg: &mut CodeGen, name: &str, elem_ty: &TypeName, len: i64) -> CgResult<()> {
    let elem_size = cg.structs.size_of(elem_ty);
    let total = elem_size * len;
    cg.symbols.add(name, elem_ty.clone(), total, true);
    Ok(())
}

fn gen_return(cg: &mut CodeGen, value: Option<&crate::ast::Expr>) -> CgResult<()> {
    if let Some(value) = value {
        gen_expr(cg, value)?;
        writeln!(cg.text, "  pop rax")?;
    }
    writeln!(cg.text, "  mov rsp, rbp")?;
    writeln!(cg.text, "  pop rbp")?;
    writeln!(cg.text, "  ret")?;
    Ok(())
}

fn gen_if(
    cg: &mut CodeGen,
    cond: &crate::ast::Expr,
    then_branch: &Stmt,
    else_branch: Option<&Stmt>,
) -> CgResult<()> {
    let else_label = format!(".L{}", cg.next_label());
    let end_label = format!(".L{}", cg.next_label());

    gen_expr(cg, cond)?;
    writeln!(cg.text, "  pop rax")?;
    writeln!(cg.text, "  cmp rax, 0")?;
    writeln!(cg.text, "  je {else_label}")?;
    gen_stmt(cg, then_branch)?;
    writeln!(cg.text, "  jmp {end_label}")?;
    writeln!(cg.text, "{else_label}:")?;
    if let Some(else_branch) = else_branch {
        gen_stmt(cg, else_branch)?;
    }
    writeln!(cg.text, "{end_label}:")?;
    Ok(())
}

fn gen_while(cg: &mut CodeGen, cond: &crate::ast::Expr, body: &Stmt) -> CgResult<()> {
    let start_label = format!(".L{}", cg.next_label());
    let end_label = format!(".L{}", cg.next_label());

    writeln!(cg.text, "{start_label}:")?;
    gen_expr(cg, cond)?;
    writeln!(cg.text, "  pop rax")?;
    writeln!(cg.text, "  cmp rax, 0")?;
    writeln!(cg.text, "  je {end_label}")?;
    gen_stmt(cg, body)?;
    writeln!(cg.text, "  jmp {start_label}")?;
    writeln!(cg.text, "{end_label}:")?;
    Ok(())
}

fn gen_for(
    cg: &mut CodeGen,
    init: Option<&Stmt>,
    cond: &Option<crate::ast::Expr>,
    step: &Option<crate::ast::Expr>,
    body: &Stmt,
) -> CgResult<()> {
    if let Some(init) = init {
        gen_stmt(cg, init)?;
    }

    let start_label = format!(".L{}", cg.next_label());
    let end_label = format!(".L{}", cg.next_label());

    writeln!(cg.text, "{start_label}:")?;
    if let Some(cond) = cond {
        gen_expr(cg, cond)?;
        writeln!(cg.text, "  pop rax")?;
        writeln!(cg.text, "  cmp rax, 0")?;
        writeln!(cg.text, "  je {end_label}")?;
    }
    gen_stmt(cg, body)?;
    if let Some(step) = step {
        gen_expr(cg, step)?;
        if step.pushes_value() {
            writeln!(cg.text, "  add rsp, 8")?;
        }
    }
    writeln!(cg.text, "  jmp {start_label}")?;
    writeln!(cg.text, "{end_label}:")?;
    Ok(())
}
