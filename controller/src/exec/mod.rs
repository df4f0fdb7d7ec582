//! External command execution

pub mod runner;

pub use runner::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
