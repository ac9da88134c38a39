use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::history::{self, HistoryError};
use crate::interpreter::Factory;
use anyhow::{Context, Result, anyhow};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Names the dispatcher treats as built-ins.
pub const BUILTIN_NAMES: &[&str] = &["exit", "cd", "export", "local", "vars", "history"];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "history".
    fn name() -> &'static str;

    /// Executes the command against the shell state.
    ///
    /// Errors are reported on `stdout` by the caller and become exit code 1.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        match T::execute(*self, stdout, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                tracing::debug!(builtin = T::name(), error = %e, "builtin failed");
                writeln!(stdout, "{:#}", e)?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.output.trim_end())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, _env: &Environment, argv: &[String]) -> Option<Box<dyn ExecutableCommand>> {
        let (name, rest) = argv.split_first()?;
        if name != T::name() {
            return None;
        }
        // Everything after the name is an operand, even `help` or `-1`.
        let args: Vec<&str> = std::iter::once("--").chain(rest.iter().map(String::as_str)).collect();
        Some(match T::from_args(&[name.as_str()], &args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

/// Split `name=value` at the first `=`. A missing `=` reads as an empty value.
///
/// Returns `None` when the name is empty.
fn parse_assignment(arg: &str) -> Option<(&str, &str)> {
    let (name, value) = arg.split_once('=').unwrap_or((arg, ""));
    if name.is_empty() {
        return None;
    }
    Some((name, value))
}

#[derive(FromArgs)]
/// Exit the shell with status 0.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute or relative to the current directory.
    pub args: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let target = match self.args.as_slice() {
            [target] => PathBuf::from(target),
            [] => return Err(anyhow!("Usage: cd <directory>")),
            _ => return Err(anyhow!("Too many input arguments for cd")),
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        env::set_current_dir(&new_dir).context("Error: chdir() fails")?;
        env.current_dir = fs::canonicalize(&new_dir).unwrap_or(new_dir);
        tracing::debug!(dir = %env.current_dir.display(), "changed directory");
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Set an environment variable; an empty value removes it.
pub struct Export {
    #[argh(positional, greedy)]
    /// assignment in the form NAME=VALUE.
    pub args: Vec<String>,
}

impl BuiltinCommand for Export {
    fn name() -> &'static str {
        "export"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let [assignment] = self.args.as_slice() else {
            return Err(anyhow!("Usage: export <variable>=<value>"));
        };
        let (name, value) =
            parse_assignment(assignment).ok_or_else(|| anyhow!("Error: invalid environment variable"))?;
        if value.is_empty() {
            env.remove_var(name);
        } else {
            env.set_var(name, value);
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Set a shell-local variable; an empty value removes it.
pub struct Local {
    #[argh(positional, greedy)]
    /// assignment in the form NAME=VALUE.
    pub args: Vec<String>,
}

impl BuiltinCommand for Local {
    fn name() -> &'static str {
        "local"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let [assignment] = self.args.as_slice() else {
            return Err(anyhow!("Usage: local <variable>=<value>"));
        };
        let (name, value) =
            parse_assignment(assignment).ok_or_else(|| anyhow!("Error: invalid local variable"))?;
        if value.is_empty() {
            env.locals.unset(name);
        } else {
            env.locals.set(name, value)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List shell-local variables as NAME=VALUE lines.
pub struct Vars {
    #[argh(positional, greedy)]
    /// must be empty.
    pub args: Vec<String>,
}

impl BuiltinCommand for Vars {
    fn name() -> &'static str {
        "vars"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        if !self.args.is_empty() {
            return Err(anyhow!("Usage: vars"));
        }
        for (name, value) in env.locals.iter() {
            writeln!(stdout, "{}={}", name, value)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Show, re-run or resize the command history.
///
/// `history` lists entries, `history N` re-runs entry N (1 is the most recent),
/// `history set N` changes how many entries are kept.
pub struct History {
    #[argh(positional, greedy)]
    /// nothing, an index, or `set` followed by a size.
    pub args: Vec<String>,
}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        match self.args.as_slice() {
            [] => {
                for (index, line) in env.history.show() {
                    write!(stdout, "{}) {}", index, line)?;
                    if !line.ends_with('\n') {
                        writeln!(stdout)?;
                    }
                }
            }
            [index] => {
                let index = index
                    .parse::<usize>()
                    .map_err(|_| HistoryError::InvalidIndex(0))?;
                let line = env.history.get(index)?.to_string();
                tracing::debug!(index, line = line.trim_end(), "replaying history entry");
                env.replay = Some(line);
            }
            [set, size] if set == "set" => {
                let size = history::parse_size(size)?;
                env.history.resize(size);
                tracing::debug!(size, "resized history");
            }
            _ => return Err(anyhow!("history usage error")),
        }
        Ok(0)
    }
}
