//! Recovering a translation unit's compiler command from a `compile_commands.json`
//! database.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// One translation unit entry of a JSON compilation database.
#[derive(Debug, Clone, Deserialize)]
struct CompilationUnit {
    directory: String,
    file: String,
    command: Option<String>,
    arguments: Option<Vec<String>>,
}

/// A loaded, cached `compile_commands.json`.
#[derive(Debug, Clone, Default)]
pub struct CompileCommands {
    units: Vec<CompilationUnit>,
}

/// Replaces `\"` with `'`, then doubles every remaining backslash.
///
/// This is a workaround for malformed databases emitted by some upstream generators.
/// It is fragile and intentionally not extended: a well-formed database round-trips
/// through `serde_json` unchanged.
fn sanitize(raw: &str) -> String {
    raw.replace("\\\"", "'").replace('\\', "\\\\")
}

impl CompileCommands {
    /// Loads and caches the database at `dir/compile_commands.json`.
    ///
    /// A missing or malformed database is logged and treated as empty; it is not an
    /// error for the caller (fingerprinting will simply abort downstream).
    pub fn load(dir: &Path) -> Self {
        let path = dir.join("compile_commands.json");
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Failed to read compilation database {}: {e}", path.display());
                return Self::default();
            }
        };
        let sanitized = sanitize(&raw);
        match serde_json::from_str::<Vec<CompilationUnit>>(&sanitized) {
            Ok(units) => Self { units },
            Err(e) => {
                log::warn!("Failed to parse compilation database {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Recovers the shell-split compiler command for `source`, matching by real-path
    /// equality. At most one match is used.
    pub fn resolve(&self, source: &Path) -> Option<Vec<String>> {
        let source_real = fs::canonicalize(source).ok()?;
        for unit in &self.units {
            let unit_path = PathBuf::from(&unit.directory).join(&unit.file);
            let unit_real = match fs::canonicalize(&unit_path) {
                Ok(p) => p,
                Err(_) => continue, // entries whose file doesn't exist are skipped silently
            };
            if unit_real != source_real {
                continue;
            }
            if let Some(command) = &unit.command {
                return shell_words::split(command).ok();
            }
            if let Some(arguments) = &unit.arguments {
                return Some(arguments.clone());
            }
        }
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn resolves_command_field_over_arguments() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("foo.cpp");
        fs::write(&source, "int main() {}").unwrap();
        let db = format!(
            r#"[{{"directory": "{}", "file": "foo.cpp", "command": "clang++ -c foo.cpp -o foo.o", "arguments": ["clang++", "-wrong"]}}]"#,
            dir.path().display()
        );
        fs::write(dir.path().join("compile_commands.json"), db).unwrap();

        let commands = CompileCommands::load(dir.path());
        let resolved = commands.resolve(&source).expect("should resolve");
        assert_eq!(resolved, vec!["clang++", "-c", "foo.cpp", "-o", "foo.o"]);
    }

    #[test]
    fn falls_back_to_arguments_array() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("foo.cpp");
        fs::write(&source, "int main() {}").unwrap();
        let db = format!(
            r#"[{{"directory": "{}", "file": "foo.cpp", "arguments": ["clang++", "-c", "foo.cpp"]}}]"#,
            dir.path().display()
        );
        fs::write(dir.path().join("compile_commands.json"), db).unwrap();

        let commands = CompileCommands::load(dir.path());
        let resolved = commands.resolve(&source).expect("should resolve");
        assert_eq!(resolved, vec!["clang++", "-c", "foo.cpp"]);
    }

    #[test]
    fn missing_database_is_treated_as_empty() {
        let dir = tempdir().unwrap();
        let commands = CompileCommands::load(dir.path());
        assert!(commands.units.is_empty());
    }

    #[test]
    fn entries_for_nonexistent_files_are_skipped() {
        let dir = tempdir().unwrap();
        let db = format!(
            r#"[{{"directory": "{}", "file": "missing.cpp", "command": "clang++ -c missing.cpp"}}]"#,
            dir.path().display()
        );
        fs::write(dir.path().join("compile_commands.json"), db).unwrap();
        let commands = CompileCommands::load(dir.path());
        assert!(commands.resolve(&dir.path().join("missing.cpp")).is_none());
    }

    #[test]
    fn sanitize_replaces_escaped_quote_then_doubles_backslashes() {
        let raw = r#"{"a": "x\"y", "b": "c\\d"}"#;
        let sanitized = sanitize(raw);
        assert_eq!(sanitized, r#"{"a": "x'y", "b": "c\\\\d"}"#);
    }
}
