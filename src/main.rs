//! Helium compiler CLI
//!
//! Command-line interface for compiling Helium source files to NASM
//! assembly. Argument parsing is a small hand-rolled scan rather than a
//! `clap` derive: unknown flags are taken as the input filename, which a
//! strict argv parser doesn't model well.

use std::path::PathBuf;
use std::process;

use heliumc::CompilerConfig;

struct Args {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    keep_preprocessed: bool,
    show_version: bool,
}

fn parse_args(argv: &[String]) -> Args {
    let mut args = Args { input: None, output: None, keep_preprocessed: false, show_version: false };
    let mut iter = argv.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-V" | "--version" => args.show_version = true,
            "-o" | "--output" => {
                if let Some(path) = iter.next() {
                    args.output = Some(PathBuf::from(path));
                }
            }
            "--keep-preprocessed" => args.keep_preprocessed = true,
            other => args.input = Some(PathBuf::from(other)),
        }
    }
    args
}

fn main() {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&argv);

    if args.show_version {
        println!("heliumc {}", env!("CARGO_PKG_VERSION"));
        process::exit(0);
    }

    let Some(input) = args.input else {
        eprintln!("usage: heliumc <input> [-o <output>] [--keep-preprocessed]");
        process::exit(1);
    };

    let mut config = CompilerConfig::new();
    if let Some(output) = args.output {
        config = config.with_output_path(output);
    }
    config = config.with_keep_preprocessed(args.keep_preprocessed);

    run_build(&input, &config);
}

fn run_build(input: &std::path::Path, config: &CompilerConfig) {
    match heliumc::compile_file_with_config(input, config) {
        Ok(()) => {
            println!("Compiled {} -> {}", input.display(), config.output_path.display());
        }
        Err(e) => {
            eprintln!("{}", e.report());
            process::exit(1);
        }
    }
}
