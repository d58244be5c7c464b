//! CLI module for tabreload - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for running the engine,
//! one-shot reloads, job management and settings.

pub mod commands;

pub use commands::Cli;
