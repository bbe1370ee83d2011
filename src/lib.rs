//! A small interactive shell that threads a single text buffer through a pipeline.
//!
//! A line such as `cat notes.txt | uniq -i | tail -n 3 > last.txt` is split into
//! stages. Every stage reads the buffer produced by the previous one and replaces
//! it with its own output. Stages are either built-ins implemented in Rust
//! (`tail`, `uniq`, `cd`, `exit`) or external commands handed to `/bin/sh -c`.
//! The final buffer is printed to the terminal or written to the redirection target.
//!
//! The main entry point is [`Interpreter`]. The public modules [`command`], [`env`]
//! and [`runner`] expose the traits needed to plug in custom commands or a custom
//! process runner.

mod builtin;
pub mod command;
pub mod env;
mod interpreter;
mod parser;
pub mod runner;
pub mod tokenizer;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
