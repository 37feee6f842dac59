//! x86-64 NASM code generation.
//!
//! A stack machine: every expression leaves its value pushed on the
//! machine stack (see `Expr::pushes_value` for the two exceptions);
//! consumers pop into `rax`/`rbx`/`rcx`. Submodules mirror the shape of
//! the pipeline stage itself: `state` holds the mutable accumulators and
//! the per-function symbol table, `function` handles the prologue and
//! parameter binding, `expr`/`stmt` hold the per-node emission rules, and
//! `program` drives the whole pass over reachable functions.

mod error;
mod expr;
mod function;
mod program;
mod state;
mod stmt;

pub use error::{CgResult, CodeGenError};
pub use program::generate;
