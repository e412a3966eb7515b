//! The orchestrator: turns a process argument vector into an exit code.
//!
//! This is the one place that reads the environment, builds the cache coordinator,
//! decides hit vs. miss, and invokes the analyzer on a miss (§4.9).

use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::cache::CacheCoordinator;
use crate::cli::{self, CompilerArgsSource, ManagementMode, WrapInvocation};
use crate::compiledb::CompileCommands;
use crate::config::Config;
use crate::fingerprint::{build_digest, FingerprintInputs};
use crate::stats::print_stats;

/// Runs the wrapper end to end and returns the process exit code (§6: analyzer's exit
/// code on miss, 0 on hit, 1 on wrapper internal error).
pub async fn run_main(args: Vec<String>) -> u8 {
    if let Err(e) = crate::logger::init() {
        eprintln!("failed to initialize logger: {e}");
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {e:#}");
            return 1;
        }
    };
    crate::logger::set_level(config.debug);

    let mode = cli::parse(args.get(1..).unwrap_or_default());

    match dispatch(mode, &config).await {
        Ok(code) => code,
        Err(e) => {
            if config.debug {
                panic!("{e:#}");
            }
            log::error!("{e:#}");
            1
        }
    }
}

async fn dispatch(mode: ManagementMode, config: &Config) -> anyhow::Result<u8> {
    match mode {
        ManagementMode::PrintCacheDir => {
            println!("{}", config.cache_dir.display());
            Ok(0)
        }
        ManagementMode::ShowStats => {
            let coordinator = CacheCoordinator::from_config(config).await;
            let snapshot = coordinator.query_stats().await;
            print_stats(&snapshot);
            Ok(0)
        }
        ManagementMode::Clean => {
            let coordinator = CacheCoordinator::from_config(config).await;
            coordinator.local().clean()?;
            Ok(0)
        }
        ManagementMode::ZeroStats => {
            let coordinator = CacheCoordinator::from_config(config).await;
            coordinator.local().zero_stats()?;
            Ok(0)
        }
        ManagementMode::Run(invocation) => run_wrapped(invocation, config).await,
    }
}

/// Resolves the compiler-arg vector for `invocation`, returning an empty vector if none
/// could be recovered (which later aborts fingerprinting per §4.1).
fn resolve_compiler_args(invocation: &WrapInvocation) -> Vec<String> {
    match &invocation.compiler_args {
        CompilerArgsSource::Inline(args) => args.clone(),
        CompilerArgsSource::CompileDb {
            database_dir,
            source_hint,
        } => {
            let db = CompileCommands::load(database_dir);
            source_hint
                .as_ref()
                .and_then(|source| db.resolve(source))
                .unwrap_or_default()
        }
        CompilerArgsSource::None => Vec::new(),
    }
}

async fn run_wrapped(invocation: WrapInvocation, config: &Config) -> anyhow::Result<u8> {
    let compiler_args = resolve_compiler_args(&invocation);

    let dump_dir: Option<PathBuf> = config.dump.then(|| config.dump_dir.clone());
    let digest = build_digest(FingerprintInputs {
        analyzer_args: &invocation.analyzer_args,
        compiler_args: &compiler_args,
        config_dirs: &invocation.config_dirs,
        strip_list: &config.strip_list,
        exclude_regex: config.exclude_hash_regex.as_ref(),
        debug_dump_dir: dump_dir.as_deref(),
    });

    let digest = match digest {
        Ok(digest) => Some(digest),
        Err(e) => {
            log::info!("Fingerprinting abandoned, running uncached: {e}");
            None
        }
    };

    let coordinator = CacheCoordinator::from_config(config).await;

    if let Some(digest) = &digest {
        if config.save_output {
            if let Some(payload) = coordinator.get_cache_data(digest).await {
                std::io::stdout().write_all(&payload)?;
                return Ok(0);
            }
        } else if coordinator.is_cached(digest).await {
            return Ok(0);
        }
    }

    run_analyzer_and_maybe_store(&invocation, config, &coordinator, digest.as_deref()).await
}

/// Runs the real analyzer, streaming its output through ours, then conditionally
/// stores the result per §4.9 steps 4-7.
async fn run_analyzer_and_maybe_store(
    invocation: &WrapInvocation,
    config: &Config,
    coordinator: &CacheCoordinator,
    digest: Option<&str>,
) -> anyhow::Result<u8> {
    let (program, args) = invocation
        .original_args
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("empty analyzer invocation"))?;

    let output = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .await;

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            log::error!("Failed to spawn analyzer {program}: {e}");
            return Ok(1);
        }
    };

    std::io::stdout().write_all(&output.stdout)?;

    let exit_code = output.status.code().unwrap_or(1) as u8;
    let tidy_success =
        exit_code == 0 && (output.stdout.is_empty() || config.ignore_output || config.save_output);

    if tidy_success {
        if let Some(digest) = digest {
            if config.save_output {
                coordinator.store_in_cache_with_data(digest, &output.stdout).await;
            } else {
                coordinator.store_in_cache(digest).await;
            }
        }
    }

    Ok(exit_code)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cli::CompilerArgsSource;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn resolve_compiler_args_returns_inline_args_verbatim() {
        let invocation = WrapInvocation {
            original_args: vec![],
            analyzer_args: vec![],
            compiler_args: CompilerArgsSource::Inline(vec!["clang++".into(), "-c".into()]),
            config_dirs: vec![],
        };
        assert_eq!(resolve_compiler_args(&invocation), vec!["clang++", "-c"]);
    }

    #[test]
    fn resolve_compiler_args_resolves_from_compile_db() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("foo.cpp");
        fs::write(&source, "int main(){}").unwrap();
        let db = format!(
            r#"[{{"directory": "{}", "file": "foo.cpp", "command": "clang++ -c foo.cpp"}}]"#,
            dir.path().display()
        );
        fs::write(dir.path().join("compile_commands.json"), db).unwrap();

        let invocation = WrapInvocation {
            original_args: vec![],
            analyzer_args: vec![],
            compiler_args: CompilerArgsSource::CompileDb {
                database_dir: dir.path().to_path_buf(),
                source_hint: Some(source),
            },
            config_dirs: vec![],
        };
        assert_eq!(resolve_compiler_args(&invocation), vec!["clang++", "-c", "foo.cpp"]);
    }

    #[test]
    fn resolve_compiler_args_is_empty_with_no_source() {
        let invocation = WrapInvocation {
            original_args: vec![],
            analyzer_args: vec![],
            compiler_args: CompilerArgsSource::None,
            config_dirs: vec![],
        };
        assert!(resolve_compiler_args(&invocation).is_empty());
    }
}
