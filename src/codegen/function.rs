//! Per-function prologue, parameter binding, and body emission.

use std::fmt::Write;

use crate::ast::{Function, TypeName};
use crate::codegen::error::CgResult;
use crate::codegen::state::{CodeGen, MAX_FRAME};
use crate::codegen::stmt::gen_stmt;

const ARG_REGS_64: [&str; 6] = ["rdi", "rsi", "rdx", "rcx", "r8", "r9"];
const ARG_REGS_8: [&str; 6] = ["dil", "sil", "dl", "cl", "r8b", "r9b"];

pub fn gen_function(cg: &mut CodeGen, func: &Function) -> CgResult<()> {
    cg.symbols = crate::codegen::state::SymbolTable::new();

    let entry = if func.name == "main" { "_start".to_string() } else { func.name.clone() };

    writeln!(cg.text, "global {entry}")?;
    writeln!(cg.text, "{entry}:")?;
    writeln!(cg.text, "  push rbp")?;
    writeln!(cg.text, "  mov rbp, rsp")?;
    writeln!(cg.text, "  sub rsp, {MAX_FRAME}")?;

    for (i, param) in func.params.iter().enumerate() {
        let size = cg.structs.size_of(&param.ty);
        let offset = cg.symbols.add(&param.name, param.ty.clone(), size, matches!(param.ty, TypeName::Struct(_)));
        if i < 6 {
            if size == 1 {
                writeln!(cg.text, "  mov byte [rbp{offset}], {}", ARG_REGS_8[i])?;
            } else {
                writeln!(cg.text, "  mov qword [rbp{offset}], {}", ARG_REGS_64[i])?;
            }
        }
    }

    for stmt in &func.body {
        gen_stmt(cg, stmt)?;
    }

    Ok(())
}
