//! This module holds the command-line surface: classifying the invocation into a
//! [`ManagementMode`], and (for wrap-mode invocations) the pure argument-vector
//! transforms that turn a compiler's compile invocation into a preprocess invocation.

mod structs;
pub use structs::{CompilerArgsSource, ManagementMode, WrapInvocation};

use std::path::PathBuf;

const DIRECTORIES_FLAG_PREFIX: &str = "--directories_with_clang_tidy=";
const DIRECTORIES_SEPARATOR: char = '*';

/// Classifies a raw argument vector (program name already stripped) into a
/// [`ManagementMode`].
pub fn parse(args: &[String]) -> ManagementMode {
    match args.first().map(String::as_str) {
        Some("--cache-dir") => ManagementMode::PrintCacheDir,
        Some("--show-stats") => ManagementMode::ShowStats,
        Some("--clean") => ManagementMode::Clean,
        Some("--zero-stats") => ManagementMode::ZeroStats,
        _ => ManagementMode::Run(parse_wrap_invocation(args)),
    }
}

fn parse_wrap_invocation(args: &[String]) -> WrapInvocation {
    let (config_dirs, without_flag) = extract_directories_flag(args);
    let normalized = normalize_equals_flag(&without_flag, "-p");

    if let Some(dash_dash) = normalized.iter().position(|a| a == "--") {
        let analyzer_args = normalized[..dash_dash].to_vec();
        let compiler_args = normalized[dash_dash + 1..].to_vec();
        return WrapInvocation {
            original_args: normalized,
            analyzer_args,
            compiler_args: CompilerArgsSource::Inline(compiler_args),
            config_dirs,
        };
    }

    if let Some(p_idx) = normalized.iter().position(|a| a == "-p") {
        if let Some(database_dir) = normalized.get(p_idx + 1).map(PathBuf::from) {
            let source_hint = normalized[p_idx + 2..]
                .iter()
                .find(|a| !a.starts_with('-'))
                .map(PathBuf::from);
            return WrapInvocation {
                original_args: normalized.clone(),
                analyzer_args: normalized,
                compiler_args: CompilerArgsSource::CompileDb {
                    database_dir,
                    source_hint,
                },
                config_dirs,
            };
        }
    }

    WrapInvocation {
        original_args: normalized.clone(),
        analyzer_args: normalized,
        compiler_args: CompilerArgsSource::None,
        config_dirs,
    }
}

/// Pulls the synthetic `--directories_with_clang_tidy=A*B*...` flag out of `args`,
/// returning the configured directories and the remaining args in original order.
fn extract_directories_flag(args: &[String]) -> (Vec<PathBuf>, Vec<String>) {
    let mut dirs = Vec::new();
    let mut rest = Vec::with_capacity(args.len());
    for arg in args {
        if let Some(value) = arg.strip_prefix(DIRECTORIES_FLAG_PREFIX) {
            dirs = value
                .split(DIRECTORIES_SEPARATOR)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect();
        } else {
            rest.push(arg.clone());
        }
    }
    (dirs, rest)
}

/// Splits any `<flag>=<value>` token into two tokens `<flag> <value>`, e.g. `-p=DIR` into
/// `-p DIR`, leaving every other argument untouched.
fn normalize_equals_flag(args: &[String], flag: &str) -> Vec<String> {
    let prefix = format!("{flag}=");
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        if let Some(value) = arg.strip_prefix(&prefix) {
            out.push(flag.to_string());
            out.push(value.to_string());
        } else {
            out.push(arg.clone());
        }
    }
    out
}

/// Inserts `-D__clang_analyzer__=1` immediately after `argv[0]`.
pub fn insert_analyzer_define(args: &[String]) -> Vec<String> {
    let mut out = args.to_vec();
    let insert_at = if out.is_empty() { 0 } else { 1 };
    out.insert(insert_at, "-D__clang_analyzer__=1".to_string());
    out
}

/// Replaces the argument following any `-o`/`--output` with `-` (emit to stdout).
pub fn redirect_output_to_stdout(args: &[String]) -> Vec<String> {
    let mut out = args.to_vec();
    let mut i = 0;
    while i < out.len() {
        if (out[i] == "-o" || out[i] == "--output") && i + 1 < out.len() {
            out[i + 1] = "-".to_string();
            i += 2;
        } else {
            i += 1;
        }
    }
    out
}

/// Replaces any `-c` with `-E` (preprocess instead of compile).
pub fn convert_compile_to_preprocess(args: &[String]) -> Vec<String> {
    args.iter()
        .map(|a| if a == "-c" { "-E".to_string() } else { a.clone() })
        .collect()
}

/// Inserts `-P` immediately after every `-E` (suppress line markers/filename comments).
pub fn suppress_preprocessor_markers(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len() + 1);
    for arg in args {
        let is_e = arg == "-E";
        out.push(arg.clone());
        if is_e {
            out.push("-P".to_string());
        }
    }
    out
}

/// Applies the full rewrite pipeline (§4.1) that turns a compile invocation into a
/// canonical preprocess invocation.
pub fn rewrite_for_preprocessing(compiler_args: &[String]) -> Vec<String> {
    let args = insert_analyzer_define(compiler_args);
    let args = redirect_output_to_stdout(&args);
    let args = convert_compile_to_preprocess(&args);
    suppress_preprocessor_markers(&args)
}

/// Drops `-export-fixes` and its following value from an argument slice (used before
/// fingerprinting analyzer args; §4.5).
pub fn drop_export_fixes(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut i = 0;
    while i < args.len() {
        if args[i] == "-export-fixes" {
            i += 2; // skip the flag and its value
        } else {
            out.push(args[i].clone());
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detects_management_modes() {
        assert_eq!(parse(&strs(&["--cache-dir"])), ManagementMode::PrintCacheDir);
        assert_eq!(parse(&strs(&["--show-stats"])), ManagementMode::ShowStats);
        assert_eq!(parse(&strs(&["--clean"])), ManagementMode::Clean);
        assert_eq!(parse(&strs(&["--zero-stats"])), ManagementMode::ZeroStats);
    }

    #[test]
    fn inline_mode_splits_on_dash_dash() {
        let args = strs(&["clang-tidy", "foo.cpp", "--", "clang++", "-c", "foo.cpp"]);
        let ManagementMode::Run(wrap) = parse(&args) else {
            panic!("expected Run mode")
        };
        assert_eq!(wrap.analyzer_args, strs(&["clang-tidy", "foo.cpp"]));
        assert_eq!(
            wrap.compiler_args,
            CompilerArgsSource::Inline(strs(&["clang++", "-c", "foo.cpp"]))
        );
    }

    #[test]
    fn directories_flag_is_extracted_and_removed() {
        let args = strs(&[
            "clang-tidy",
            "--directories_with_clang_tidy=/a*/b",
            "foo.cpp",
            "--",
            "clang++",
            "-c",
            "foo.cpp",
        ]);
        let ManagementMode::Run(wrap) = parse(&args) else {
            panic!("expected Run mode")
        };
        assert_eq!(wrap.config_dirs, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert!(!wrap
            .original_args
            .iter()
            .any(|a| a.starts_with(DIRECTORIES_FLAG_PREFIX)));
    }

    #[test]
    fn compile_db_mode_finds_dir_and_source_hint() {
        let args = strs(&["clang-tidy", "-p", "build", "foo.cpp"]);
        let ManagementMode::Run(wrap) = parse(&args) else {
            panic!("expected Run mode")
        };
        match wrap.compiler_args {
            CompilerArgsSource::CompileDb {
                database_dir,
                source_hint,
            } => {
                assert_eq!(database_dir, PathBuf::from("build"));
                assert_eq!(source_hint, Some(PathBuf::from("foo.cpp")));
            }
            other => panic!("expected CompileDb mode, got {other:?}"),
        }
    }

    #[test]
    fn compile_db_mode_normalizes_equals_form() {
        let args = strs(&["clang-tidy", "-p=build", "foo.cpp"]);
        let ManagementMode::Run(wrap) = parse(&args) else {
            panic!("expected Run mode")
        };
        match wrap.compiler_args {
            CompilerArgsSource::CompileDb { database_dir, .. } => {
                assert_eq!(database_dir, PathBuf::from("build"));
            }
            other => panic!("expected CompileDb mode, got {other:?}"),
        }
    }

    #[test]
    fn no_dash_dash_or_p_abandons_compiler_args() {
        let args = strs(&["clang-tidy", "foo.cpp"]);
        let ManagementMode::Run(wrap) = parse(&args) else {
            panic!("expected Run mode")
        };
        assert_eq!(wrap.compiler_args, CompilerArgsSource::None);
    }

    #[test]
    fn rewrite_pipeline_produces_canonical_preprocess_invocation() {
        let compiler_args = strs(&["clang++", "-c", "foo.cpp", "-o", "foo.o"]);
        let rewritten = rewrite_for_preprocessing(&compiler_args);
        assert_eq!(
            rewritten,
            strs(&[
                "clang++",
                "-D__clang_analyzer__=1",
                "-E",
                "-P",
                "foo.cpp",
                "-o",
                "-"
            ])
        );
    }

    #[test]
    fn rewrite_pipeline_handles_output_flag_variant() {
        let compiler_args = strs(&["clang++", "--output", "foo.o", "-c", "foo.cpp"]);
        let rewritten = rewrite_for_preprocessing(&compiler_args);
        assert_eq!(
            rewritten,
            strs(&[
                "clang++",
                "-D__clang_analyzer__=1",
                "--output",
                "-",
                "-E",
                "-P",
                "foo.cpp"
            ])
        );
    }

    #[test]
    fn drop_export_fixes_removes_flag_and_value() {
        let args = strs(&["-checks=*", "-export-fixes", "/tmp/fixes.yaml", "foo.cpp"]);
        assert_eq!(drop_export_fixes(&args), strs(&["-checks=*", "foo.cpp"]));
    }
}
