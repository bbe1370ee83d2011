use crate::command::{CommandFactory, ExecutableCommand, PipelineBuffer};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use lexopt::prelude::*;
use regex::Regex;
use std::collections::VecDeque;
use std::env;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// Built-in commands known to the shell at compile time.
///
/// Builtins run in-process against the pipeline buffer. Their argument parsing is
/// forgiving: unknown flags are skipped and bad numbers read as zero, so creating
/// a builtin never fails.
pub(crate) trait BuiltinCommand: Sized {
    /// Canonical name of the command, e.g. "tail" or "cd".
    fn name() -> &'static str;

    /// Builds the command from the tokens following its name.
    fn from_args(args: &[String]) -> Self;

    /// Runs the command, reading and replacing `buffer`.
    fn run(self, buffer: &mut PipelineBuffer, env: &mut Environment) -> Result<()>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, buffer: &mut PipelineBuffer, env: &mut Environment) -> Result<()> {
        if let Err(err) = T::run(*self, buffer, env) {
            debug!(command = T::name(), "ignored failure: {err:#}");
        }
        Ok(())
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[String],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(Box::new(T::from_args(args)))
        } else {
            None
        }
    }
}

static LEADING_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*([+-]?[0-9]+)").expect("leading integer pattern"));

/// Reads a count the way C's `atoi` would: leading digits only, garbage is zero.
/// Negative counts clamp to zero.
fn parse_count(text: &str) -> usize {
    let Some(captures) = LEADING_INTEGER.captures(text) else {
        return 0;
    };
    let digits = &captures[1];
    match digits.parse::<i64>() {
        Ok(n) => usize::try_from(n).unwrap_or(0),
        Err(_) if digits.starts_with('-') => 0,
        Err(_) => usize::MAX,
    }
}

/// Splits a buffer into lines; a trailing newline does not start another line.
fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    let mut lines: Vec<&[u8]> = data.split(|&b| b == b'\n').collect();
    if lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}

fn push_line(out: &mut Vec<u8>, line: &[u8]) {
    out.extend_from_slice(line);
    out.push(b'\n');
}

fn make_parser(args: &[String]) -> lexopt::Parser {
    lexopt::Parser::from_args(args.iter().cloned())
}

fn positional(value: std::ffi::OsString) -> Option<String> {
    value.string().ok().filter(|v| v != "-")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailMode {
    Lines,
    Bytes,
}

/// Output the last part of the buffer or of files.
#[derive(Debug, PartialEq, Eq)]
pub struct Tail {
    pub mode: TailMode,
    pub count: usize,
    /// 0 never prints headers, 1 prints them for several files, 2 always.
    pub verbosity: usize,
    pub files: Vec<String>,
}

impl Default for Tail {
    fn default() -> Self {
        Self {
            mode: TailMode::Lines,
            count: 10,
            verbosity: 1,
            files: Vec::new(),
        }
    }
}

impl Tail {
    fn tail_buffer(&self, buffer: &mut PipelineBuffer) {
        match self.mode {
            TailMode::Lines => {
                let lines = split_lines(buffer);
                let start = lines.len().saturating_sub(self.count);
                let mut out = Vec::new();
                for line in &lines[start..] {
                    push_line(&mut out, line);
                }
                *buffer = out;
            }
            TailMode::Bytes => {
                let start = buffer.len().saturating_sub(self.count);
                buffer.drain(..start);
            }
        }
    }

    fn tail_file(&self, path: &Path, out: &mut Vec<u8>) -> Result<()> {
        let file = File::open(path).with_context(|| format!("can't open {}", path.display()))?;
        match self.mode {
            TailMode::Lines => {
                let mut window = VecDeque::with_capacity(self.count.min(1024));
                for line in BufReader::new(file).split(b'\n') {
                    window.push_back(line?);
                    if window.len() > self.count {
                        window.pop_front();
                    }
                }
                for line in &window {
                    push_line(out, line);
                }
            }
            TailMode::Bytes => {
                let mut file = file;
                let size = file.metadata()?.len();
                let start = size.saturating_sub(self.count as u64);
                file.seek(SeekFrom::Start(start))?;
                file.read_to_end(out)?;
            }
        }
        Ok(())
    }
}

impl BuiltinCommand for Tail {
    fn name() -> &'static str {
        "tail"
    }

    fn from_args(args: &[String]) -> Self {
        let mut tail = Tail::default();
        let mut parser = make_parser(args);
        loop {
            let arg = match parser.next() {
                Ok(Some(arg)) => arg,
                Ok(None) => break,
                Err(err) => {
                    debug!("tail: skipping argument: {err}");
                    continue;
                }
            };
            match arg {
                Short('q') | Long("quiet") | Long("silent") => tail.verbosity = 0,
                Short('v') | Long("verbose") => tail.verbosity = 2,
                Short('c') | Long("bytes") => {
                    tail.mode = TailMode::Bytes;
                    if let Ok(value) = parser.value() {
                        tail.count = parse_count(&value.to_string_lossy());
                    }
                }
                Short('n') | Long("lines") => {
                    tail.mode = TailMode::Lines;
                    if let Ok(value) = parser.value() {
                        tail.count = parse_count(&value.to_string_lossy());
                    }
                }
                Value(value) => tail.files.extend(positional(value)),
                Long(_) => {
                    parser.optional_value();
                }
                Short(_) => {}
            }
        }
        tail
    }

    fn run(self, buffer: &mut PipelineBuffer, env: &mut Environment) -> Result<()> {
        debug!(?self, input_len = buffer.len(), "tail");
        if self.files.is_empty() {
            self.tail_buffer(buffer);
            return Ok(());
        }

        let headers = self.verbosity * self.files.len() > 1;
        let mut out = Vec::new();
        for name in &self.files {
            if headers {
                out.extend_from_slice(format!("==> {name} <==\n").as_bytes());
            }
            if let Err(err) = self.tail_file(&env.resolve(name), &mut out) {
                debug!("tail: {name}: {err:#}");
            }
        }
        *buffer = out;
        Ok(())
    }
}

/// Filter adjacent matching lines.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Uniq {
    pub ignore_case: bool,
    /// Print one copy of each repeated run instead of every run.
    pub repeated: bool,
    pub input: Option<String>,
    pub output: Option<String>,
}

impl Uniq {
    fn same(&self, left: &[u8], right: &[u8]) -> bool {
        if self.ignore_case {
            left.eq_ignore_ascii_case(right)
        } else {
            left == right
        }
    }

    fn filter(&self, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut lines = split_lines(input).into_iter().peekable();
        while let Some(first) = lines.next() {
            let mut run = 1;
            while lines.next_if(|line| self.same(first, line)).is_some() {
                run += 1;
            }
            if !self.repeated || run > 1 {
                push_line(&mut out, first);
            }
        }
        out
    }
}

impl BuiltinCommand for Uniq {
    fn name() -> &'static str {
        "uniq"
    }

    fn from_args(args: &[String]) -> Self {
        let mut uniq = Uniq::default();
        let mut paths = 0;
        let mut parser = make_parser(args);
        loop {
            let arg = match parser.next() {
                Ok(Some(arg)) => arg,
                Ok(None) => break,
                Err(err) => {
                    debug!("uniq: skipping argument: {err}");
                    continue;
                }
            };
            match arg {
                Short('i') | Long("ignore-case") => uniq.ignore_case = true,
                Short('d') | Long("repeated") => uniq.repeated = true,
                Short('u') | Long("unique") => uniq.repeated = false,
                Value(value) => {
                    let Ok(path) = value.string() else { continue };
                    // "-" holds a slot but stands for the pipeline buffer.
                    let path = (path != "-").then_some(path);
                    match paths {
                        0 => uniq.input = path,
                        1 => uniq.output = path,
                        _ => {}
                    }
                    paths += 1;
                }
                Long(_) => {
                    parser.optional_value();
                }
                Short(_) => {}
            }
        }
        uniq
    }

    fn run(self, buffer: &mut PipelineBuffer, env: &mut Environment) -> Result<()> {
        debug!(?self, input_len = buffer.len(), "uniq");
        let input = match &self.input {
            Some(name) => fs::read(env.resolve(name)).unwrap_or_else(|err| {
                debug!("uniq: {name}: {err}");
                Vec::new()
            }),
            None => std::mem::take(buffer),
        };
        let filtered = self.filter(&input);
        match &self.output {
            Some(name) => {
                let path = env.resolve(name);
                fs::write(&path, filtered)
                    .with_context(|| format!("can't write {}", path.display()))?;
            }
            None => *buffer = filtered,
        }
        Ok(())
    }
}

/// Change the current working directory.
/// Without a target, changes to the directory named by HOME.
#[derive(Debug, PartialEq, Eq)]
pub struct Cd {
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn from_args(args: &[String]) -> Self {
        Cd {
            target: args.first().cloned(),
        }
    }

    fn run(self, _buffer: &mut PipelineBuffer, env: &mut Environment) -> Result<()> {
        debug!(?self, "cd");
        let target = match self.target {
            Some(t) => PathBuf::from(t),
            None => PathBuf::from(env.get_var("HOME").context("no target and HOME not set")?),
        };

        let new_dir = env.resolve(target);
        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("can't canonicalize {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("can't chdir to {}", canonical.display()))?;
        env.current_dir = canonical;
        Ok(())
    }
}

/// Stop the shell once the current stage finishes.
#[derive(Debug, PartialEq, Eq)]
pub struct Exit;

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn from_args(_args: &[String]) -> Self {
        Exit
    }

    fn run(self, _buffer: &mut PipelineBuffer, env: &mut Environment) -> Result<()> {
        env.should_exit = true;
        Ok(())
    }
}
