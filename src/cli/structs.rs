use std::path::PathBuf;

/// What the wrapper should do with this invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagementMode {
    /// Print the resolved cache directory and exit.
    PrintCacheDir,
    /// Print cache statistics and exit.
    ShowStats,
    /// Recursively remove the cache directory and exit.
    Clean,
    /// Delete the local stats file and exit.
    ZeroStats,
    /// Wrap an analyzer invocation.
    Run(WrapInvocation),
}

/// Where this invocation's compiler arguments should come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerArgsSource {
    /// Args were given inline, after a standalone `--`.
    Inline(Vec<String>),
    /// Args must be recovered from a `compile_commands.json` in `database_dir`, keyed by
    /// `source_hint`.
    CompileDb {
        database_dir: PathBuf,
        source_hint: Option<PathBuf>,
    },
    /// Neither form was present on the command line.
    None,
}

/// A parsed "wrap this analyzer invocation" command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapInvocation {
    /// The full, original argument vector (minus the synthetic
    /// `--directories_with_clang_tidy=...` flag), used verbatim to invoke the analyzer.
    pub original_args: Vec<String>,

    /// The analyzer-arg slice: `argv[0]` (the analyzer path) followed by whatever args
    /// precede `--`/`-p`, used for fingerprinting.
    pub analyzer_args: Vec<String>,

    /// Where to obtain the compiler-arg slice for preprocessing.
    pub compiler_args: CompilerArgsSource,

    /// Directories (from `--directories_with_clang_tidy=A*B*...`) under which
    /// `.clang-tidy` files are considered part of the active configuration.
    pub config_dirs: Vec<PathBuf>,
}
