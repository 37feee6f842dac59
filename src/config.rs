//! Compiler configuration.
//!
//! Kept as its own module, separate from the CLI, so the driver pipeline
//! in [`crate::compile_file_with_config`] can be called directly by
//! embedders without going through [`std::env::args`].

use std::path::PathBuf;

/// Configuration for a single compilation run.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Where the generated assembly is written.
    pub output_path: PathBuf,

    /// Keep the flattened (post-`#include`, post-`#define`) source
    /// alongside the output, for inspecting what the preprocessor did.
    pub keep_preprocessed: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            output_path: PathBuf::from("out.s"),
            keep_preprocessed: false,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_keep_preprocessed(mut self, keep: bool) -> Self {
        self.keep_preprocessed = keep;
        self
    }
}
