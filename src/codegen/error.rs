//! Codegen-local error type, split the same way the upstream compiler's
//! `CodeGenError` is: a logic error (reported with source position) vs. a
//! formatting failure from `write!`.

use std::fmt;

#[derive(Debug)]
pub enum CodeGenError {
    Logic(crate::diagnostics::Diagnostic),
    Format(fmt::Error),
}

impl fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeGenError::Logic(d) => write!(f, "{d}"),
            CodeGenError::Format(e) => write!(f, "formatting error: {e}"),
        }
    }
}

impl std::error::Error for CodeGenError {}

impl From<crate::diagnostics::Diagnostic> for CodeGenError {
    fn from(d: crate::diagnostics::Diagnostic) -> Self {
        CodeGenError::Logic(d)
    }
}

impl From<fmt::Error> for CodeGenError {
    fn from(e: fmt::Error) -> Self {
        CodeGenError::Format(e)
    }
}

pub type CgResult<T> = Result<T, CodeGenError>;
