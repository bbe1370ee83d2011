use anyhow::{Context, Result};
use argh::FromArgs;
use pipesh::Interpreter;
use pipesh::runner::ShellRunner;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Interactive shell that pipes one text buffer through built-ins and external commands.
struct Options {
    #[argh(option, short = 'c')]
    /// execute a single command line and exit
    command: Option<String>,

    #[argh(option, default = "256")]
    /// number of lines kept in the input history
    history_size: usize,

    #[argh(option, default = "PathBuf::from(\"/bin/sh\")")]
    /// interpreter used for external commands
    shell: PathBuf,

    #[argh(option)]
    /// truncate the output of each external command to this many bytes
    output_limit: Option<usize>,

    #[argh(option)]
    /// write debug logs to this file
    debug_log: Option<PathBuf>,

    #[argh(switch, short = 'q')]
    /// do not print the welcome banner
    quiet: bool,
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("can't create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let options: Options = argh::from_env();
    if let Some(path) = &options.debug_log {
        init_logging(path)?;
    }

    let runner = ShellRunner::new(&options.shell).with_output_limit(options.output_limit);
    let mut shell = Interpreter::default().with_runner(runner);

    if let Some(line) = &options.command {
        shell.execute(line);
        return Ok(());
    }

    if !options.quiet {
        println!("Welcome to pipesh.");
        println!("Stages are joined with '|', the last one may end with '> file'.");
        println!("Built-ins: tail, uniq, cd, exit. Everything else runs through {}.\n", options.shell.display());
    }
    shell.repl(options.history_size).context("line editor failed")
}
