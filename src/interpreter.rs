use crate::command::{CommandFactory, PipelineBuffer};
use crate::env::Environment;
use crate::parser::{self, Pipeline};
use crate::runner::{ProcessRunner, ShellRunner};
use crate::tokenizer::split_whitespace;
use anyhow::Context;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate, see `BuiltinCommand`.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A shell that threads one buffer through the stages of each line.
///
/// The interpreter owns the session [`Environment`], a list of [`CommandFactory`]
/// objects queried by command name, and the [`ProcessRunner`] used for every stage
/// no factory recognizes. See [`Default`] for the built-ins included out of the box.
///
/// Example
/// ```
/// use pipesh::Interpreter;
/// let mut sh = Interpreter::default();
/// let mut out = Vec::new();
/// assert!(sh.execute_with_output("echo hello | tail -n 1", &mut out));
/// assert_eq!(out, b"hello\n");
/// assert!(!sh.execute_with_output("exit", &mut out));
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
    runner: Box<dyn ProcessRunner>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            commands,
            runner: Box::new(ShellRunner::default()),
        }
    }

    /// Replace the runner used for external stages.
    pub fn with_runner(mut self, runner: impl ProcessRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    /// Replace the session environment.
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Session state as left by the lines executed so far.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Execute one line, printing its output to the terminal.
    ///
    /// Returns `false` when `exit` ran and the shell should stop.
    pub fn execute(&mut self, line: &str) -> bool {
        self.execute_with_output(line, &mut std::io::stdout())
    }

    /// Execute one line, writing output that is not redirected to `terminal`.
    ///
    /// Nothing but the continue flag leaves this function: failures of individual
    /// stages or of the output sink are logged and otherwise ignored.
    pub fn execute_with_output(&mut self, line: &str, terminal: &mut dyn Write) -> bool {
        debug!(line, "executing line");
        self.env.should_exit = false;
        let Pipeline { stages, redirect } = parser::parse_line(line);

        let mut buffer = PipelineBuffer::new();
        for stage in &stages {
            self.dispatch(stage, &mut buffer);
            if self.env.should_exit {
                break;
            }
        }

        let sunk = match &redirect {
            Some(target) => self.write_redirect(target, &buffer),
            None => terminal
                .write_all(&buffer)
                .and_then(|()| terminal.flush())
                .context("can't write to terminal"),
        };
        if let Err(err) = sunk {
            warn!("{err:#}");
        }

        !self.env.should_exit
    }

    /// Route one stage to a built-in or to the process runner.
    fn dispatch(&mut self, stage: &str, buffer: &mut PipelineBuffer) {
        debug!(stage, input_len = buffer.len(), "dispatching stage");
        let tokens = split_whitespace(stage);
        let Some((name, args)) = tokens.split_first() else {
            return;
        };

        let command = self
            .commands
            .iter()
            .find_map(|factory| factory.try_create(&self.env, name, args));
        match command {
            Some(cmd) => {
                if let Err(err) = cmd.execute(buffer, &mut self.env) {
                    debug!(stage, "built-in failed: {err:#}");
                }
            }
            None => {
                // The untokenized stage keeps the user's quoting for the shell.
                if let Err(err) = self.runner.run(stage, buffer, &self.env) {
                    warn!("{err}");
                }
            }
        }
    }

    fn write_redirect(&self, target: &Path, buffer: &[u8]) -> anyhow::Result<()> {
        let path = self.env.resolve(target);
        let mut file = File::create(&path)
            .with_context(|| format!("can't create {}", path.display()))?;
        file.write_all(buffer)
            .and_then(|()| file.flush())
            .with_context(|| format!("can't write {}", path.display()))
    }

    fn prompt(&self) -> String {
        format!("{}> ", self.env.current_dir.display())
    }

    /// Interactive read-eval loop on the terminal.
    ///
    /// History is kept by the line editor, bounded to `history_size` entries.
    /// Ends on `exit`, Ctrl-C or Ctrl-D.
    pub fn repl(&mut self, history_size: usize) -> rustyline::Result<()> {
        let config = Config::builder()
            .max_history_size(history_size)?
            .auto_add_history(false)
            .build();
        let mut rl = DefaultEditor::with_config(config)?;

        loop {
            match rl.readline(&self.prompt()) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    if !self.execute(&line) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins: `exit`, `tail`, `uniq`, `cd`
    /// - `/bin/sh -c` for everything else
    fn default() -> Self {
        use crate::builtin::*;
        Self::new(vec![
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Tail>::default()),
            Box::new(Factory::<Uniq>::default()),
            Box::new(Factory::<Cd>::default()),
        ])
    }
}
