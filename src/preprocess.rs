//! Re-invoking the compiler in preprocess-only mode and capturing its canonical output.

use std::io;
use std::process::Command;

use thiserror::Error;

/// Why the preprocess step could not produce fingerprintable output.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("failed to spawn preprocessor {0:?}: {1}")]
    Spawn(Vec<String>, io::Error),

    /// The compiler reported something on stderr; per §4.3, this invalidates the
    /// fingerprint rather than being treated as a hard failure.
    #[error("preprocessor reported stderr, abandoning fingerprint")]
    StderrReported { stderr: Vec<u8> },
}

/// Runs `rewritten_compiler_args` (`argv[0]` is the compiler binary) and returns stdout.
///
/// Per §4.3: if the compiler writes anything to stderr, the entire fingerprint is
/// abandoned, since a preprocessing error or warning invalidates the inputs.
pub fn run_preprocessor(rewritten_compiler_args: &[String]) -> Result<Vec<u8>, PreprocessError> {
    let (program, args) = rewritten_compiler_args
        .split_first()
        .ok_or_else(|| PreprocessError::Spawn(rewritten_compiler_args.to_vec(), io::Error::new(io::ErrorKind::InvalidInput, "empty compiler command")))?;

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| PreprocessError::Spawn(rewritten_compiler_args.to_vec(), e))?;

    if !output.stderr.is_empty() {
        return Err(PreprocessError::StderrReported {
            stderr: output.stderr,
        });
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn captures_stdout_of_a_clean_command() {
        let args = vec!["printf".to_string(), "hello".to_string()];
        let out = run_preprocessor(&args).unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn stderr_output_abandons_fingerprint() {
        let args = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo oops 1>&2".to_string(),
        ];
        let err = run_preprocessor(&args).unwrap_err();
        assert!(matches!(err, PreprocessError::StderrReported { .. }));
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let args = vec!["this-binary-does-not-exist-anywhere".to_string()];
        let err = run_preprocessor(&args).unwrap_err();
        assert!(matches!(err, PreprocessError::Spawn(_, _)));
    }
}
