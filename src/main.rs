#![cfg(not(test))]
//! This crate is the binary executable's entrypoint.
use std::{env, process::ExitCode};

use ::ctcache::runner::run_main;

/// Forwards CLI args to [`run_main()`] and maps its result to a process exit code.
#[tokio::main]
pub async fn main() -> ExitCode {
    let args = env::args().collect::<Vec<String>>();
    ExitCode::from(run_main(args).await)
}
