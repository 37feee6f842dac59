//! Per-node expression emission. Every `ExprKind` except `Assign` and
//! `PostInc` leaves exactly one pushed qword — see `Expr::pushes_value`.

use std::fmt::Write;

use crate::ast::{BinOp, Expr, ExprKind, LValue, TypeName, UnOp};
use crate::codegen::error::{CgResult, CodeGenError};
use crate::codegen::state::CodeGen;
use crate::diagnostics::Diagnostic;

const ARG_REGS_64: [&str; 6] = ["rdi", "rsi", "rdx", "rcx", "r8", "r9"];
const SYSCALL_REGS: [&str; 6] = ["rdi", "rsi", "rdx", "r10", "r8", "r9"];

fn is_char(ty: &TypeName) -> bool {
    matches!(ty, TypeName::Char)
}

pub fn gen_expr(cg: &mut CodeGen, expr: &Expr) -> CgResult<()> {
    match &expr.kind {
        ExprKind::Int(v) => {
            writeln!(cg.text, "  mov rax, {v}")?;
            writeln!(cg.text, "  push rax")?;
        }
        ExprKind::Str(text) => {
            let label = format!(".LC{}", cg.next_label());
            writeln!(cg.rodata, "{label}: db `{text}`, 0")?;
            writeln!(cg.text, "  lea rax, [rel {label}]")?;
            writeln!(cg.text, "  push rax")?;
        }
        ExprKind::Var(name) => {
            let sym = lookup(cg, name, &expr.loc)?.clone();
            if sym.is_aggregate {
                writeln!(cg.text, "  lea rax, [rbp{}]", sym.offset)?;
            } else if is_char(&sym.ty) {
                writeln!(cg.text, "  movzx rax, byte [rbp{}]", sym.offset)?;
            } else {
                writeln!(cg.text, "  mov rax, [rbp{}]", sym.offset)?;
            }
            writeln!(cg.text, "  push rax")?;
        }
        ExprKind::Unary(UnOp::Addr, target) => gen_addr_of(cg, target)?,
        ExprKind::Unary(UnOp::Deref, target) => {
            gen_expr(cg, target)?;
            writeln!(cg.text, "  pop rax")?;
            writeln!(cg.text, "  mov rax, [rax]")?;
            writeln!(cg.text, "  push rax")?;
        }
        ExprKind::Unary(UnOp::Neg, target) => {
            gen_expr(cg, target)?;
            writeln!(cg.text, "  pop rax")?;
            writeln!(cg.text, "  neg rax")?;
            writeln!(cg.text, "  push rax")?;
        }
        ExprKind::Unary(UnOp::Not, target) => {
            gen_expr(cg, target)?;
            writeln!(cg.text, "  pop rax")?;
            writeln!(cg.text, "  cmp rax, 0")?;
            writeln!(cg.text, "  sete al")?;
            writeln!(cg.text, "  movzx rax, al")?;
            writeln!(cg.text, "  push rax")?;
        }
        ExprKind::Binary(BinOp::And, lhs, rhs) => gen_logical(cg, lhs, rhs, true)?,
        ExprKind::Binary(BinOp::Or, lhs, rhs) => gen_logical(cg, lhs, rhs, false)?,
        ExprKind::Binary(op, lhs, rhs) => gen_binary(cg, *op, lhs, rhs)?,
        ExprKind::Assign(target, value) => gen_assign(cg, target, value, &expr.loc)?,
        ExprKind::PostInc(target) => gen_post_inc(cg, target, &expr.loc)?,
        ExprKind::ArrayAccess { name, index } => gen_array_read(cg, name, index, &expr.loc)?,
        ExprKind::Member { base, field, arrow } => gen_member_read(cg, base, field, *arrow, &expr.loc)?,
        ExprKind::FuncCall { name, args } => gen_func_call(cg, name, args)?,
        ExprKind::Syscall(args) => gen_syscall(cg, args)?,
    }
    Ok(())
}

fn lookup<'a>(
    cg: &'a CodeGen,
    name: &str,
    loc: &crate::ast::SourceLoc,
) -> CgResult<&'a crate::codegen::state::Symbol> {
    cg.symbols
        .get(name)
        .ok_or_else(|| CodeGenError::from(Diagnostic::new(loc.clone(), format!("undefined variable '{name}'"))))
}

fn gen_addr_of(cg: &mut CodeGen, target: &Expr) -> CgResult<()> {
    match &target.kind {
        ExprKind::Var(name) => {
            let sym = lookup(cg, name, &target.loc)?.clone();
            writeln!(cg.text, "  lea rax, [rbp{}]", sym.offset)?;
            writeln!(cg.text, "  push rax")?;
        }
        ExprKind::Member { base, field, arrow: false } => {
            let base_name = plain_var_name(base)?;
            let sym = lookup(cg, &base_name, &base.loc)?.clone();
            let struct_name = struct_name_of(&sym.ty);
            let (member_off, _) = cg
                .structs
                .member_offset(&struct_name, field)
                .ok_or_else(|| unknown_member(&struct_name, field, &target.loc))?;
            writeln!(cg.text, "  lea rax, [rbp{}]", sym.offset + member_off)?;
            writeln!(cg.text, "  push rax")?;
        }
        _ => return Err(not_an_lvalue(&target.loc)),
    }
    Ok(())
}

fn gen_binary(cg: &mut CodeGen, op: BinOp, lhs: &Expr, rhs: &Expr) -> CgResult<()> {
    gen_expr(cg, lhs)?;
    gen_expr(cg, rhs)?;
    writeln!(cg.text, "  pop rbx")?;
    writeln!(cg.text, "  pop rax")?;
    match op {
        BinOp::Add => writeln!(cg.text, "  add rax, rbx")?,
        BinOp::Sub => writeln!(cg.text, "  sub rax, rbx")?,
        BinOp::Mul => writeln!(cg.text, "  imul rax, rbx")?,
        BinOp::Div => {
            writeln!(cg.text, "  cqo")?;
            writeln!(cg.text, "  idiv rbx")?;
        }
        BinOp::BitOr => writeln!(cg.text, "  or rax, rbx")?,
        BinOp::BitAnd => writeln!(cg.text, "  and rax, rbx")?,
        BinOp::Eq | BinOp::NotEq | BinOp::Lt | BinOp::Gt => {
            let set = match op {
                BinOp::Eq => "sete",
                BinOp::NotEq => "setne",
                BinOp::Lt => "setl",
                BinOp::Gt => "setg",
                _ => unreachable!(),
            };
            writeln!(cg.text, "  cmp rax, rbx")?;
            writeln!(cg.text, "  {set} al")?;
            writeln!(cg.text, "  movzx rax, al")?;
        }
        BinOp::And | BinOp::Or => unreachable!("handled by gen_logical"),
    }
    writeln!(cg.text, "  push rax")?;
    Ok(())
}

fn gen_logical(cg: &mut CodeGen, lhs: &Expr, rhs: &Expr, is_and: bool) -> CgResult<()> {
    let short_circuit = format!(".L{}", cg.next_label());
    let end = format!(".L{}", cg.next_label());

    gen_expr(cg, lhs)?;
    writeln!(cg.text, "  pop rax")?;
    writeln!(cg.text, "  cmp rax, 0")?;
    if is_and {
        writeln!(cg.text, "  je {short_circuit}")?;
    } else {
        writeln!(cg.text, "  jne {short_circuit}")?;
    }

    gen_expr(cg, rhs)?;
    writeln!(cg.text, "  pop rax")?;
    writeln!(cg.text, "  cmp rax, 0")?;
    writeln!(cg.text, "  setne al")?;
    writeln!(cg.text, "  movzx rax, al")?;
    writeln!(cg.text, "  jmp {end}")?;

    writeln!(cg.text, "{short_circuit}:")?;
    writeln!(cg.text, "  mov rax, {}", if is_and { 0 } else { 1 })?;

    writeln!(cg.text, "{end}:")?;
    writeln!(cg.text, "  push rax")?;
    Ok(())
}

fn plain_var_name(expr: &Expr) -> CgResult<String> {
    match &expr.kind {
        ExprKind::Var(name) => Ok(name.clone()),
        _ => Err(not_an_lvalue(&expr.loc)),
    }
}

fn struct_name_of(ty: &TypeName) -> String {
    match ty {
        TypeName::Struct(name) => name.clone(),
        _ => String::new(),
    }
}

fn not_an_lvalue(loc: &crate::ast::SourceLoc) -> CodeGenError {
    CodeGenError::from(Diagnostic::new(loc.clone(), "invalid l-value"))
}

fn unknown_member(struct_name: &str, field: &str, loc: &crate::ast::SourceLoc) -> CodeGenError {
    CodeGenError::from(Diagnostic::new(loc.clone(), format!("unknown member '{field}' of struct '{struct_name}'")))
}

fn gen_member_read(cg: &mut CodeGen, base: &Expr, field: &str, arrow: bool, loc: &crate::ast::SourceLoc) -> CgResult<()> {
    let base_name = plain_var_name(base)?;
    let sym = lookup(cg, &base_name, &base.loc)?.clone();
    let struct_name = struct_name_of(&sym.ty);
    let (member_off, width) =
        cg.structs.member_offset(&struct_name, field).ok_or_else(|| unknown_member(&struct_name, field, loc))?;

    if arrow {
        writeln!(cg.text, "  mov rax, [rbp{}]", sym.offset)?;
        if width == 1 {
            writeln!(cg.text, "  movzx rax, byte [rax+{member_off}]")?;
        } else {
            writeln!(cg.text, "  mov rax, [rax+{member_off}]")?;
        }
    } else {
        let disp = sym.offset + member_off;
        if width == 1 {
            writeln!(cg.text, "  movzx rax, byte [rbp{disp}]")?;
        } else {
            writeln!(cg.text, "  mov rax, [rbp{disp}]")?;
        }
    }
    writeln!(cg.text, "  push rax")?;
    Ok(())
}

fn gen_array_read(cg: &mut CodeGen, name: &str, index: &Expr, loc: &crate::ast::SourceLoc) -> CgResult<()> {
    let sym = lookup(cg, name, loc)?.clone();
    let width = if is_char(&sym.ty) { 1 } else { 8 };
    gen_expr(cg, index)?;
    writeln!(cg.text, "  pop rbx")?;
    writeln!(cg.text, "  imul rbx, {width}")?;
    writeln!(cg.text, "  lea rax, [rbp{}]", sym.offset)?;
    writeln!(cg.text, "  add rax, rbx")?;
    if width == 1 {
        writeln!(cg.text, "  movzx rax, byte [rax]")?;
    } else {
        writeln!(cg.text, "  mov rax, [rax]")?;
    }
    writeln!(cg.text, "  push rax")?;
    Ok(())
}

pub fn gen_assign(cg: &mut CodeGen, target: &LValue, value: &Expr, loc: &crate::ast::SourceLoc) -> CgResult<()> {
    match target {
        LValue::Var(name) => {
            let sym = lookup(cg, name, loc)?.clone();
            if let ExprKind::Int(v) = &value.kind {
                // Fast path: immediate move, no push/pop.
                if is_char(&sym.ty) {
                    writeln!(cg.text, "  mov byte [rbp{}], {v}", sym.offset)?;
                } else {
                    writeln!(cg.text, "  mov qword [rbp{}], {v}", sym.offset)?;
                }
                return Ok(());
            }
            gen_expr(cg, value)?;
            writeln!(cg.text, "  pop rax")?;
            if is_char(&sym.ty) {
                writeln!(cg.text, "  mov byte [rbp{}], al", sym.offset)?;
            } else {
                writeln!(cg.text, "  mov qword [rbp{}], rax", sym.offset)?;
            }
        }
        LValue::Deref(ptr) => {
            gen_expr(cg, value)?;
            gen_expr(cg, ptr)?;
            writeln!(cg.text, "  pop rax")?;
            writeln!(cg.text, "  pop rbx")?;
            writeln!(cg.text, "  mov [rax], rbx")?;
        }
        LValue::ArrayAccess { name, index } => {
            let sym = lookup(cg, name, loc)?.clone();
            let width = if is_char(&sym.ty) { 1 } else { 8 };
            gen_expr(cg, value)?;
            gen_expr(cg, index)?;
            writeln!(cg.text, "  pop rbx")?;
            writeln!(cg.text, "  imul rbx, {width}")?;
            writeln!(cg.text, "  lea rax, [rbp{}]", sym.offset)?;
            writeln!(cg.text, "  add rax, rbx")?;
            writeln!(cg.text, "  pop rcx")?;
            if width == 1 {
                writeln!(cg.text, "  mov byte [rax], cl")?;
            } else {
                writeln!(cg.text, "  mov [rax], rcx")?;
            }
        }
        LValue::Member { base, field, arrow } => {
            let base_name = plain_var_name(base)?;
            let sym = lookup(cg, &base_name, &base.loc)?.clone();
            let struct_name = struct_name_of(&sym.ty);
            let (member_off, width) =
                cg.structs.member_offset(&struct_name, field).ok_or_else(|| unknown_member(&struct_name, field, loc))?;
            gen_expr(cg, value)?;
            writeln!(cg.text, "  pop rax")?;
            if *arrow {
                writeln!(cg.text, "  mov rbx, [rbp{}]", sym.offset)?;
                if width == 1 {
                    writeln!(cg.text, "  mov byte [rbx+{member_off}], al")?;
                } else {
                    writeln!(cg.text, "  mov [rbx+{member_off}], rax")?;
                }
            } else {
                let disp = sym.offset + member_off;
                if width == 1 {
                    writeln!(cg.text, "  mov byte [rbp{disp}], al")?;
                } else {
                    writeln!(cg.text, "  mov qword [rbp{disp}], rax")?;
                }
            }
        }
    }
    Ok(())
}

fn gen_post_inc(cg: &mut CodeGen, target: &Expr, loc: &crate::ast::SourceLoc) -> CgResult<()> {
    let name = plain_var_name(target)?;
    let sym = lookup(cg, &name, loc)?.clone();
    if is_char(&sym.ty) {
        writeln!(cg.text, "  inc byte [rbp{}]", sym.offset)?;
    } else {
        writeln!(cg.text, "  inc qword [rbp{}]", sym.offset)?;
    }
    Ok(())
}

fn gen_func_call(cg: &mut CodeGen, name: &str, args: &[Expr]) -> CgResult<()> {
    for arg in args {
        gen_expr(cg, arg)?;
    }
    for i in (0..args.len().min(6)).rev() {
        writeln!(cg.text, "  pop {}", ARG_REGS_64[i])?;
    }
    writeln!(cg.text, "  call {name}")?;
    writeln!(cg.text, "  push rax")?;
    Ok(())
}

fn gen_syscall(cg: &mut CodeGen, args: &[Expr]) -> CgResult<()> {
    for arg in args {
        gen_expr(cg, arg)?;
    }
    for i in (0..args.len().min(7)).rev() {
        let reg = if i == 0 { "rax" } else { SYSCALL_REGS[i - 1] };
        writeln!(cg.text, "  pop {reg}")?;
    }
    writeln!(cg.text, "  syscall")?;
    writeln!(cg.text, "  push rax")?;
    Ok(())
}
