//! CodeGen state: the per-function symbol table and the mutable
//! accumulators (`.text`, buffered `.rodata`, label counter) threaded
//! through every codegen submodule.

use crate::ast::TypeName;
use crate::struct_registry::StructRegistry;
use std::collections::HashSet;

/// Fixed per-function stack reservation. Exceeding it is a non-fatal
/// warning, not a compile error.
pub const MAX_FRAME: i64 = 4096;

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub offset: i64,
    pub ty: TypeName,
    /// `true` for array/struct locals where `ty` names the element/struct
    /// type rather than the variable's own scalar type.
    pub is_aggregate: bool,
}

/// Per-function symbol table. Reset (via `SymbolTable::new`) on every
/// `Function` node; offsets only ever decrease from 0.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    current_offset: i64,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Reserves `size` bytes and returns the new (negative) offset.
    /// Emits a stderr warning, not an error, if the frame now exceeds
    /// `MAX_FRAME` — compilation continues per spec.
    pub fn add(&mut self, name: impl Into<String>, ty: TypeName, size: i64, is_aggregate: bool) -> i64 {
        let name = name.into();
        self.current_offset -= size;
        let offset = self.current_offset;
        if -offset > MAX_FRAME {
            eprintln!("warning: local frame exceeds MAX_FRAME ({MAX_FRAME} bytes) while adding '{name}'");
        }
        self.symbols.push(Symbol { name, offset, ty, is_aggregate });
        offset
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().rev().find(|s| s.name == name)
    }
}

pub struct CodeGen<'a> {
    pub text: String,
    pub rodata: String,
    label_counter: usize,
    pub symbols: SymbolTable,
    pub structs: &'a StructRegistry,
    pub reachable: &'a HashSet<String>,
}

impl<'a> CodeGen<'a> {
    pub fn new(structs: &'a StructRegistry, reachable: &'a HashSet<String>) -> Self {
        CodeGen {
            text: String::new(),
            rodata: String::new(),
            label_counter: 0,
            symbols: SymbolTable::new(),
            structs,
            reachable,
        }
    }

    /// A monotonically increasing counter shared by branch labels and
    /// string-literal labels.
    pub fn next_label(&mut self) -> usize {
        let n = self.label_counter;
        self.label_counter += 1;
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_decrease_and_never_collide() {
        let mut t = SymbolTable::new();
        let a = t.add("a", TypeName::Int, 8, false);
        let b = t.add("b", TypeName::Char, 1, false);
        assert_eq!(a, -8);
        assert_eq!(b, -9);
    }

    #[test]
    fn lookup_prefers_most_recent_declaration() {
        let mut t = SymbolTable::new();
        t.add("x", TypeName::Int, 8, false);
        t.add("x", TypeName::Int, 8, false);
        assert_eq!(t.get("x").unwrap().offset, -16);
    }

    #[test]
    fn label_counter_never_repeats() {
        let structs = StructRegistry::new();
        let reachable = HashSet::new();
        let mut cg = CodeGen::new(&structs, &reachable);
        let labels: Vec<_> = (0..5).map(|_| cg.next_label()).collect();
        assert_eq!(labels, vec![0, 1, 2, 3, 4]);
    }
}
