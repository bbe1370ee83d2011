use crate::env::Environment;
use anyhow::Result;

/// The text blob threaded through every stage of one pipeline.
///
/// Kept as raw bytes: external commands may emit anything, and `tail -c`
/// cuts at byte offsets.
pub type PipelineBuffer = Vec<u8>;

/// Object-safe trait for any command that can run as a pipeline stage.
///
/// Built-ins implement it through a blanket impl in the `builtin` module.
pub trait ExecutableCommand {
    /// Executes the command, reading and replacing `buffer`.
    ///
    /// An `Err` never aborts the pipeline; the caller logs it and moves on with
    /// whatever the command left in the buffer.
    fn execute(self: Box<Self>, buffer: &mut PipelineBuffer, env: &mut Environment) -> Result<()>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`; the stage then
/// falls through to the next factory and finally to the process runner.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[String],
    ) -> Option<Box<dyn ExecutableCommand>>;
}
