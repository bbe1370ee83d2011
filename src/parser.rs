use crate::tokenizer::split;
use std::path::PathBuf;

/// A command line split into pipe-separated stages.
///
/// There is no quoting: `|` always separates stages and the first `>` of the
/// last stage always starts the redirection target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pipeline {
    /// Trimmed stage texts in execution order. Empty only for a blank line.
    pub stages: Vec<String>,
    /// File receiving the final buffer instead of the terminal.
    pub redirect: Option<PathBuf>,
}

/// Parse a raw line into stages and an optional output redirection.
pub fn parse_line(line: &str) -> Pipeline {
    let mut stages = split(line, "|");
    let mut redirect = None;

    if let Some(last) = stages.last_mut() {
        if last.contains('>') {
            let mut parts = split(last, ">").into_iter();
            if let (Some(command), Some(target)) = (parts.next(), parts.next()) {
                *last = command;
                redirect = Some(PathBuf::from(target));
            }
        }
    }

    Pipeline { stages, redirect }
}
