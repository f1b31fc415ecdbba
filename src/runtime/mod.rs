//! The embedded interpreter seam.
//!
//! The execution worker owns exactly one [`Runtime`] and drives it through
//! [`ExecutionHooks`]: the runtime reports every statement boundary, its
//! output and graph changes, and the hooks decide whether to keep going.

mod convert;
mod script;

use thiserror::Error;

use crate::graph::GraphSnapshot;
use crate::protocol::ConversionDirection;

pub use convert::translate;
pub use script::ScriptRuntime;

/// A statement boundary reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepFrame {
    /// 1-based source line about to run.
    pub line: u32,
    /// Call depth, 0 at module level.
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAction {
    Proceed,
    /// Unwind the whole execution as soon as possible.
    Abort,
}

pub trait ExecutionHooks {
    fn on_line(&mut self, frame: StepFrame) -> LineAction;
    fn stdout(&mut self, text: &str);
    fn stderr(&mut self, text: &str);
    fn graph(&mut self, snapshot: &GraphSnapshot);
}

pub trait Runtime: Send {
    /// Boot the interpreter and load its support files.
    fn load(&mut self) -> Result<(), RuntimeError>;

    /// Run `source` to completion, failure, or until a hook aborts.
    fn execute(&mut self, source: &str, hooks: &mut dyn ExecutionHooks) -> Result<(), ScriptError>;

    fn convert(&mut self, direction: ConversionDirection, source: &str) -> Result<String, RuntimeError>;
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime failed to load: {0}")]
    Load(String),

    #[error("{0}")]
    Conversion(String),
}

/// How an execution ended when it did not run to completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("  File \"{path}\", line {line}\nSyntaxError: {message}\n")]
    Syntax {
        path: String,
        line: u32,
        message: String,
    },

    #[error("{traceback}")]
    Raised { traceback: String },

    #[error("execution terminated")]
    Terminated,
}
