use std::collections::HashMap;
use std::env as stdenv;
use std::path::{Path, PathBuf};

/// Per-session shell state, passed by `&mut` to every stage instead of living in globals.
///
/// `cd` updates `current_dir`, `exit` raises `should_exit`, and external commands
/// receive `vars` as their environment and `current_dir` as their working directory.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Variables exported to child processes; `HOME` is looked up here by bare `cd`.
    pub vars: HashMap<String, String>,
    /// Base for relative paths given to built-ins and for spawned commands.
    pub current_dir: PathBuf,
    /// Raised by `exit` during the current line; cleared before each new line.
    pub should_exit: bool,
}

impl Environment {
    /// Snapshot the process variables and working directory at shell start-up.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            should_exit: false,
        }
    }

    /// Session variable `key`, or the live process variable if the session lacks it.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Resolve a user-supplied path against `current_dir`.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.current_dir.join(path)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::env::Environment;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn empty_env(dir: &str) -> Environment {
        Environment {
            vars: HashMap::new(),
            current_dir: PathBuf::from(dir),
            should_exit: false,
        }
    }

    #[test]
    fn test_session_var_shadows_process_env() {
        let mut env = empty_env("/");

        assert_eq!(env.get_var("PIPESH_SURELY_UNSET_VAR_12345"), None);

        env.vars.insert("KEY".into(), "VALUE".into());

        assert_eq!(env.get_var("KEY"), Some("VALUE".to_string()));
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
        assert!(!env.should_exit);
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let env = empty_env("/srv/data");
        assert_eq!(env.resolve("notes.txt"), PathBuf::from("/srv/data/notes.txt"));
        assert_eq!(env.resolve("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }
}
