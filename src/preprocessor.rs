//! `#include` flattening.
//!
//! Recursively inlines included files into a single buffer, wrapping each
//! file's contribution in synthetic `#file "path" N` markers so the lexer
//! can recover accurate per-file line numbers after flattening.

use crate::diagnostics::{Diagnostic, HResult};
use std::path::Path;

pub fn preprocess_file(path: &str) -> HResult<String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Diagnostic::bare(format!("could not open file {path}: {e}")))?;
    preprocess_str(path, &contents)
}

fn preprocess_str(path: &str, contents: &str) -> HResult<String> {
    let mut out = String::new();
    out.push_str(&format!("#file \"{path}\" 1\n"));

    let base_dir = Path::new(path).parent();
    let mut file_line_number: u32 = 1;

    for line in contents.split_inclusive('\n') {
        file_line_number += 1;

        if let Some(include_pos) = line.find("#include") {
            let after = &line[include_pos..];
            let start_quote = after.find('"');
            let end_quote = after.rfind('"');
            if let (Some(s), Some(e)) = (start_quote, end_quote) {
                if e > s {
                    let included_name = &after[s + 1..e];
                    let included_path = match base_dir {
                        Some(dir) if !included_name.starts_with('/') => {
                            dir.join(included_name).to_string_lossy().into_owned()
                        }
                        _ => included_name.to_string(),
                    };
                    let included_content = preprocess_file(&included_path)?;
                    out.push_str(&included_content);
                    out.push_str(&format!("\n#file \"{path}\" {file_line_number}\n"));
                    continue;
                }
            }
        }

        out.push_str(line);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flat_file_gets_a_single_start_marker() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "int main() {{ return 0; }}").unwrap();
        let path = f.path().to_string_lossy().into_owned();
        let out = preprocess_file(&path).unwrap();
        assert!(out.starts_with(&format!("#file \"{path}\" 1\n")));
        assert_eq!(out.matches("#file").count(), 1);
    }

    #[test]
    fn include_emits_start_and_restore_markers() {
        let dir = tempfile::tempdir().unwrap();
        let inc_path = dir.path().join("a.hel");
        std::fs::write(&inc_path, "int x;\n").unwrap();
        let main_path = dir.path().join("main.hel");
        std::fs::write(&main_path, format!("#include \"{}\"\nint main() {{ return 0; }}\n", "a.hel")).unwrap();

        let out = preprocess_file(&main_path.to_string_lossy()).unwrap();
        assert_eq!(out.matches("#file").count(), 3);
        assert!(out.contains("int x;"));
        assert!(out.contains("int main()"));
    }
}
