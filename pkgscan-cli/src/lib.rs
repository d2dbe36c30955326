//! pkgscan CLI library
//!
//! Exposes argument parsing, command handlers and output rendering so the
//! `pkgscan` binary stays a thin dispatcher and integration tests can drive
//! handlers directly.

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
