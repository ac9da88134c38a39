//! `wsh`: a small Unix command-line shell.
//!
//! The shell reads command lines interactively or from a batch file, runs a
//! handful of built-ins (`exit`, `cd`, `export`, `local`, `vars`, `history`)
//! in-process, substitutes `$name` references, and starts everything else as
//! child processes, including `|`-separated pipelines.
//!
//! The main entry point is [`Interpreter`], which owns the session
//! [`env::Environment`] and dispatches each line. The public modules expose the
//! pieces it is built from so they can be used and tested on their own.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
mod external;
pub mod history;
mod interpreter;
pub mod parser;
pub mod pipeline;
pub mod vars;

pub use builtin::{BUILTIN_NAMES, is_builtin};
pub use config::Config;
pub use external::find_command_path;
pub use interpreter::Interpreter;
