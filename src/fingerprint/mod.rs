//! Combines the preprocessed translation unit, the normalized argument sets, and the
//! active `.clang-tidy` configuration into a single 40-hex-character digest.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;

use crate::cli::{drop_export_fixes, rewrite_for_preprocessing};
use crate::hasher::Hasher;
use crate::preprocess::{run_preprocessor, PreprocessError};

const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "h", "hpp"];

/// Why fingerprinting could not produce a digest. In every case the caller falls back
/// to running the analyzer uncached (§4.1, §4.3, §7).
#[derive(Debug, Error)]
pub enum FingerprintAbort {
    #[error("no compiler arguments could be recovered for this invocation")]
    NoCompilerArgs,

    #[error("preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
}

/// Everything the digest is a pure function of.
pub struct FingerprintInputs<'a> {
    /// `argv[0]` (the analyzer path) followed by the analyzer's own arguments.
    pub analyzer_args: &'a [String],
    /// `argv[0]` (the compiler path) followed by the compiler's own arguments, not yet
    /// rewritten for preprocessing.
    pub compiler_args: &'a [String],
    pub config_dirs: &'a [PathBuf],
    pub strip_list: &'a [String],
    pub exclude_regex: Option<&'a Regex>,
    pub debug_dump_dir: Option<&'a Path>,
}

/// Trims whitespace and surrounding quotes, resolves to a real path if the token names
/// an existing filesystem entry, then applies the strip list. Returns `None` if the
/// result is empty (§4.5).
pub fn normalize_token(token: &str, strip_list: &[String]) -> Option<String> {
    let trimmed = token.trim().trim_matches('"');
    let mut value = trimmed.to_string();
    if let Ok(real) = fs::canonicalize(&value) {
        value = real.to_string_lossy().into_owned();
    }
    for s in strip_list {
        if !s.is_empty() {
            value = value.replace(s.as_str(), "");
        }
    }
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Normalizes every token, drops tokens matching `exclude`, then deduplicates and sorts
/// the result so that re-orderings and duplicates do not change the digest (§4.5).
pub fn normalize_arg_set(
    args: &[String],
    strip_list: &[String],
    exclude: Option<&Regex>,
) -> Vec<String> {
    let mut set: Vec<String> = args
        .iter()
        .filter(|a| !exclude.is_some_and(|re| re.is_match(a)))
        .filter_map(|a| normalize_token(a, strip_list))
        .collect();
    set.sort();
    set.dedup();
    set
}

/// The first path in `analyzer_args` (past `argv[0]`) that exists on disk and has one of
/// the recognized source extensions (§4.5).
pub fn find_source_file(analyzer_args: &[String]) -> Option<PathBuf> {
    analyzer_args.iter().skip(1).find_map(|arg| {
        let path = Path::new(arg);
        let ext = path.extension()?.to_str()?;
        if SOURCE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) && path.exists() {
            Some(path.to_path_buf())
        } else {
            None
        }
    })
}

/// The `.clang-tidy` files, in lexicographic path order, whose directory is an ancestor
/// (inclusive) of `source` and is listed in `config_dirs` (§3, §4.5).
pub fn active_config_files(source: &Path, config_dirs: &[PathBuf]) -> Vec<PathBuf> {
    let Ok(source_real) = fs::canonicalize(source) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = config_dirs
        .iter()
        .filter_map(|d| fs::canonicalize(d).ok())
        .filter(|d| source_real.starts_with(d))
        .map(|d| d.join(".clang-tidy"))
        .filter(|f| f.is_file())
        .collect();
    files.sort();
    files.dedup();
    files
}

/// Feeds one `.clang-tidy` file's non-comment, whitespace-tokenized, normalized content
/// into `hasher`, concatenated with no separator (§4.5).
fn feed_config_file(hasher: &mut Hasher, path: &Path, strip_list: &[String]) {
    let Ok(contents) = fs::read_to_string(path) else {
        log::warn!("Failed to read clang-tidy config {}", path.display());
        return;
    };
    for line in contents.lines() {
        if line.starts_with("# ") {
            continue;
        }
        for token in line.split_whitespace() {
            if let Some(normalized) = normalize_token(token, strip_list) {
                hasher.update(normalized.as_bytes());
            }
        }
    }
}

/// Builds the 40-hex-character fingerprint digest described in §3.
pub fn build_digest(inputs: FingerprintInputs) -> Result<String, FingerprintAbort> {
    if inputs.compiler_args.is_empty() {
        return Err(FingerprintAbort::NoCompilerArgs);
    }

    let rewritten = rewrite_for_preprocessing(inputs.compiler_args);
    let preprocessed = run_preprocessor(&rewritten)?;

    let mut hasher = match inputs.debug_dump_dir {
        Some(dir) => Hasher::with_debug_dump(dir).unwrap_or_else(|e| {
            log::warn!("Failed to open debug dump in {}: {e}", dir.display());
            Hasher::new()
        }),
        None => Hasher::new(),
    };
    hasher.update(&preprocessed);

    if let Some(source) = find_source_file(inputs.analyzer_args) {
        for config_file in active_config_files(&source, inputs.config_dirs) {
            feed_config_file(&mut hasher, &config_file, inputs.strip_list);
        }
    }

    let analyzer_tail = drop_export_fixes(&inputs.analyzer_args[1..]);
    for token in normalize_arg_set(&analyzer_tail, inputs.strip_list, inputs.exclude_regex) {
        hasher.update(token.as_bytes());
        hasher.update(b"\n");
    }

    for token in normalize_arg_set(
        &inputs.compiler_args[1..],
        inputs.strip_list,
        inputs.exclude_regex,
    ) {
        hasher.update(token.as_bytes());
        hasher.update(b"\n");
    }

    Ok(hasher.hexdigest())
}
