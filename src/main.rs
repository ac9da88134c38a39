use argh::{EarlyExit, FromArgs};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use wsh::{Config, Interpreter};

#[derive(FromArgs)]
/// A small Unix shell. Without arguments it reads commands interactively,
/// otherwise it runs the commands in the given batch file.
struct Args {
    #[argh(positional)]
    /// file with one command per line.
    script: Option<PathBuf>,
}

/// Parse the command line, returning the batch file to run, if any.
///
/// argh only sees a lossy copy of the arguments; the path itself is taken from
/// the raw `OsString` so that non-UTF-8 file names still open.
fn parse_args() -> Result<Option<PathBuf>, ExitCode> {
    let argv: Vec<OsString> = std::env::args_os().collect();
    let lossy: Vec<String> = argv.iter().map(|arg| arg.to_string_lossy().into_owned()).collect();
    let (cmd, rest) = lossy.split_first().map_or(("wsh", &[][..]), |(c, r)| (c.as_str(), r));
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
    let args = Args::from_args(&[cmd], &rest).map_err(|EarlyExit { output, status }| match status {
        Ok(()) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(()) => {
            println!("Usage: wsh [batch file]");
            ExitCode::FAILURE
        }
    })?;
    // The only positional is always the last argument.
    Ok(args.script.and_then(|_| argv.last().map(PathBuf::from)))
}

fn main() -> ExitCode {
    let script = match parse_args() {
        Ok(script) => script,
        Err(code) => return code,
    };
    let config = Config::from_env();
    init_logging(&config);

    let mut shell = Interpreter::new(config);
    let result = match &script {
        Some(path) => shell.run_file(path),
        None => shell.repl(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
