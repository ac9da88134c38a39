use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, execve, fork};
use std::borrow::Cow;
use std::convert::Infallible;
use std::ffi::{CString, OsStr};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Search path used when `PATH` is not exported.
const DEFAULT_PATH: &str = "/bin:/usr/bin";

/// Interpreter for executables that the kernel refuses to load.
const FALLBACK_SHELL: &str = "/bin/sh";

/// Command that is not a builtin: a program started in a child process.
pub struct ExternalCommand {
    argv: Vec<String>,
}

impl ExternalCommand {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(&self, _env: &Environment, argv: &[String]) -> Option<Box<dyn ExecutableCommand>> {
        if argv.is_empty() {
            return None;
        }
        Some(Box::new(ExternalCommand::new(argv.to_vec())))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        // Anything still buffered would be written twice if the child failed
        // to exec and flushed its copy.
        stdout.flush()?;
        let pid = spawn(|| exec_or_die(&self.argv, env)).context("Error: fork() fails")?;
        tracing::debug!(%pid, argv = ?self.argv, "spawned external command");
        wait_for(pid)
    }
}

/// Fork a child that runs `child` and never returns to the caller's logic.
pub(crate) fn spawn(child: impl FnOnce() -> Infallible) -> Result<Pid, Errno> {
    // SAFETY: the shell runs on a single thread; the child only builds its
    // argument vector and then replaces its image or calls `_exit`.
    match unsafe { fork() }? {
        ForkResult::Parent { child: pid } => Ok(pid),
        ForkResult::Child => match child() {},
    }
}

/// Block until `pid` exits and translate its status into an exit code.
pub(crate) fn wait_for(pid: Pid) -> Result<ExitCode> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                tracing::debug!(%pid, code, "child exited");
                return Ok(code);
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                tracing::debug!(%pid, ?signal, "child killed by signal");
                return Ok(128 + signal as i32);
            }
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e).with_context(|| format!("waitpid({}) failed", pid)),
        }
    }
}

/// Replace the current process image with `argv`, or report the failure and
/// terminate. Only ever called in a forked child.
pub(crate) fn exec_or_die(argv: &[String], env: &Environment) -> Infallible {
    let err = match exec(argv, env) {
        Err(e) => e,
        Ok(never) => match never {},
    };
    die(&format!("execvp: {}", err.desc()))
}

/// Print `message` and terminate the current (child) process with status 1.
pub(crate) fn die(message: &str) -> Infallible {
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{}", message);
    let _ = stdout.flush();
    // SAFETY: `_exit` skips atexit handlers and stdio teardown that belong to
    // the parent's copy of the process.
    unsafe { nix::libc::_exit(1) }
}

fn exec(argv: &[String], env: &Environment) -> Result<Infallible, Errno> {
    let name = argv.first().ok_or(Errno::ENOENT)?;
    let search_paths = env.get_var("PATH").unwrap_or(DEFAULT_PATH);
    let program = find_command_path(OsStr::new(search_paths), Path::new(name)).ok_or(Errno::ENOENT)?;

    let program = CString::new(program.as_os_str().as_encoded_bytes()).map_err(|_| Errno::EINVAL)?;
    let args = argv
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| Errno::EINVAL)?;
    let vars: Vec<CString> = env
        .vars
        .iter()
        .filter_map(|(k, v)| CString::new(format!("{}={}", k, v)).ok())
        .collect();

    match execve(&program, &args, &vars) {
        // No recognised header (e.g. a script without `#!`): hand it to sh.
        Err(Errno::ENOEXEC) => exec_with_shell(program, &args[1..], &vars),
        other => other,
    }
}

fn exec_with_shell(script: CString, rest: &[CString], vars: &[CString]) -> Result<Infallible, Errno> {
    let shell = CString::new(FALLBACK_SHELL).map_err(|_| Errno::EINVAL)?;
    let mut args = Vec::with_capacity(rest.len() + 2);
    args.push(c"sh".to_owned());
    args.push(script);
    args.extend_from_slice(rest);
    execve(&shell, &args, vars)
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Any path containing a `/` (absolute, `./foo`, `bin/sh`): returned as is if it exists.
/// - A bare name: each directory in `search_paths` (PATH syntax) is tried in order and
///   the first executable regular file wins; files without any execute bit are skipped.
/// - Empty path: returns `None`.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, _) => None,
        (Some(x), None) if !path.is_absolute() && !path.starts_with(".") => {
            find_in_path(search_paths, x.as_os_str()).map(Cow::Owned)
        }
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}
