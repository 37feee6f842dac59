//! Top-level codegen entry point: walks reachable functions in source
//! order and assembles the final NASM text, appending a buffered
//! `.rodata` section only when a string literal was actually emitted.

use crate::ast::Program;
use crate::call_graph::reachable_functions;
use crate::codegen::error::CgResult;
use crate::codegen::function::gen_function;
use crate::codegen::state::CodeGen;
use crate::struct_registry::StructRegistry;

pub fn generate(program: &Program, structs: &StructRegistry) -> CgResult<String> {
    let reachable = reachable_functions(program);
    let mut cg = CodeGen::new(structs, &reachable);

    cg.text.push_str("section .text\n");
    for func in &program.functions {
        if !reachable.contains(&func.name) {
            continue;
        }
        gen_function(&mut cg, func)?;
    }

    let mut out = cg.text;
    if !cg.rodata.is_empty() {
        out.push_str("section .rodata\n");
        out.push_str(&cg.rodata);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::fold_program;
    use crate::parser::Parser;

    fn compile(src: &str) -> String {
        let mut p = Parser::new(src, "t.hel").unwrap();
        let mut prog = p.parse_program().unwrap();
        fold_program(&mut prog);
        let structs = StructRegistry::from_defs(prog.structs.clone());
        generate(&prog, &structs).unwrap()
    }

    #[test]
    fn minimal_main_has_no_rodata_section() {
        let asm = compile("fn main() -> int { return 42; }");
        assert_eq!(asm.matches("global _start").count(), 1);
        assert!(asm.contains("mov rax, 42"));
        assert!(asm.contains("pop rbp"));
        assert!(asm.contains("  ret"));
        assert!(!asm.contains(".rodata"));
    }

    #[test]
    fn constant_folding_removes_arithmetic_instructions() {
        let asm = compile("fn main() -> int { return 2+3*4; }");
        assert_eq!(asm.matches("mov rax, 14").count(), 1);
        assert!(!asm.contains("add rax"));
        assert!(!asm.contains("imul rax"));
    }

    #[test]
    fn unreachable_functions_are_not_emitted() {
        let asm = compile(
            "fn f(x: int) -> int { return x+1; } fn g(x: int) -> int { return x; } fn main() -> int { return f(41); }",
        );
        assert!(asm.contains("f:"));
        assert!(!asm.contains("g:"));
    }

    #[test]
    fn array_index_scales_by_element_width() {
        let asm = compile(
            "fn main() -> int { int a[3]; a[0] = 10; a[1] = 20; a[2] = 30; return a[1]; }",
        );
        assert!(asm.contains("imul rbx, 8"));
    }

    #[test]
    fn struct_member_store_and_load_use_dense_offsets() {
        let asm = compile(
            "struct P { x: int, y: char } fn main() -> int { P p; p.x = 7; p.y = 'A'; return p.x; }",
        );
        assert!(asm.contains("mov qword [rbp-9], rax"));
        assert!(asm.contains("mov byte [rbp-1], al"));
    }

    #[test]
    fn for_range_has_exactly_one_string_label() {
        let asm = compile("fn main() -> int { for i in 0..3 { syscall(1, 1, \"x\", 1); } return 0; }");
        assert_eq!(asm.matches(".LC").count(), 2); // one definition, one `lea` reference
        assert!(asm.contains("db `x`, 0"));
    }
}
