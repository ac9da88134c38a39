use crate::env::Environment;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Object-safe trait for any command that can be executed by the shell.
///
/// This is implemented by built-ins via a blanket impl and by external commands.
/// Built-ins write their output to `stdout`; external programs write to the
/// shell's inherited standard output directly.
pub trait ExecutableCommand {
    /// Executes the command.
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment)
    -> Result<ExitCode>;
}

/// Factory that tries to create a command from a parsed argument vector.
///
/// Returns `None` when the factory doesn't recognize `argv[0]`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided arguments.
    fn try_create(&self, env: &Environment, argv: &[String]) -> Option<Box<dyn ExecutableCommand>>;
}
