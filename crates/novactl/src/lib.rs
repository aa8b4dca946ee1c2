//! NOVA Control - library side of the CLI.

pub mod commands;
pub mod output;
pub mod repl;
