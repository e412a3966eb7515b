//! `ctcache` is a fingerprinting cache wrapper for `clang-tidy`.
//!
//! It reconstructs the preprocessed translation unit that an analyzer
//! invocation would see, folds it together with the analyzer/compiler
//! arguments and the applicable `.clang-tidy` configuration into a single
//! digest, and skips the analyzer entirely on a digest hit.

pub mod cache;
pub mod cli;
pub mod compiledb;
pub mod config;
pub mod fingerprint;
pub mod hasher;
pub mod logger;
pub mod preprocess;
pub mod runner;
pub mod stats;
