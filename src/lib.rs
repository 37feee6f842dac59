//! Helium compiler library.
//!
//! The driver pipeline: read the source file, flatten `#include`s, lex
//! and parse, fold constants, then emit NASM. Each stage has its own
//! error type; [`HeliumError`] unifies them so callers have one thing
//! to report.

pub mod ast;
pub mod call_graph;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod lexer;
pub mod optimizer;
pub mod parser;
pub mod preprocessor;
pub mod struct_registry;

pub use ast::Program;
pub use codegen::{CgResult, CodeGenError, generate};
pub use config::CompilerConfig;
pub use diagnostics::Diagnostic;
pub use parser::Parser;
pub use struct_registry::StructRegistry;

use std::fmt;
use std::fs;
use std::path::Path;

/// Unifies the error types surfaced by each pipeline stage so the CLI
/// (or an embedder) has one type to match on and one `report` to call.
#[derive(Debug)]
pub enum HeliumError {
    Io(String),
    Parse(Diagnostic),
    CodeGen(CodeGenError),
}

impl fmt::Display for HeliumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeliumError::Io(msg) => write!(f, "{msg}"),
            HeliumError::Parse(d) => write!(f, "{d}"),
            HeliumError::CodeGen(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for HeliumError {}

impl From<Diagnostic> for HeliumError {
    fn from(d: Diagnostic) -> Self {
        HeliumError::Parse(d)
    }
}

impl From<CodeGenError> for HeliumError {
    fn from(e: CodeGenError) -> Self {
        HeliumError::CodeGen(e)
    }
}

impl HeliumError {
    /// Render with the offending source line and a caret, when the
    /// error carries a location; falls back to a bare message for I/O
    /// failures that happen before any token exists.
    ///
    /// `source` must be the *preprocessed* buffer the error's byte
    /// offsets were computed against — see [`CompileError`].
    pub fn report(&self, source: &str) -> String {
        match self {
            HeliumError::Parse(d) => d.report(source),
            HeliumError::CodeGen(CodeGenError::Logic(d)) => d.report(source),
            other => other.to_string(),
        }
    }
}

/// A compile failure paired with the preprocessed buffer its `SourceLoc`s
/// point into. Token/diagnostic offsets are only meaningful against this
/// buffer, not the raw input file (`#include` flattening and `#file`
/// markers mean the two generally differ), so callers report from here
/// rather than re-reading the input path themselves.
#[derive(Debug)]
pub struct CompileError {
    pub error: HeliumError,
    pub source: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for CompileError {}

impl CompileError {
    pub fn report(&self) -> String {
        self.error.report(&self.source)
    }
}

/// Compile a Helium source file to NASM assembly, using default
/// configuration (output to `out.s`).
pub fn compile_file(source_path: &Path) -> Result<(), CompileError> {
    compile_file_with_config(source_path, &CompilerConfig::default())
}

/// Compile a Helium source file to NASM assembly under the given
/// configuration.
pub fn compile_file_with_config(
    source_path: &Path,
    config: &CompilerConfig,
) -> Result<(), CompileError> {
    let path_str = source_path.to_string_lossy().into_owned();
    let preprocessed = preprocessor::preprocess_file(&path_str)
        .map_err(|d| CompileError { error: HeliumError::from(d), source: String::new() })?;

    let result = run_pipeline(&preprocessed, &path_str, config);
    result.map_err(|error| CompileError { error, source: preprocessed })
}

fn run_pipeline(
    preprocessed: &str,
    path_str: &str,
    config: &CompilerConfig,
) -> Result<(), HeliumError> {
    let mut parser = Parser::new(preprocessed, path_str.to_string())?;
    let mut program = parser.parse_program()?;
    optimizer::fold_program(&mut program);

    let structs = StructRegistry::from_defs(program.structs.clone());
    let asm = generate(&program, &structs)?;

    fs::write(&config.output_path, asm).map_err(|e| {
        HeliumError::Io(format!("failed to write {}: {e}", config.output_path.display()))
    })?;

    if config.keep_preprocessed {
        let pp_path = config.output_path.with_extension("i");
        fs::write(&pp_path, preprocessed).map_err(|e| {
            HeliumError::Io(format!("failed to write {}: {e}", pp_path.display()))
        })?;
    }

    Ok(())
}
