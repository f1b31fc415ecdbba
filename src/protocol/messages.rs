use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::SharedControlBlock;

/// Controller -> worker, delivered through the worker's request channel.
#[derive(Debug, Clone)]
pub enum WorkerRequest {
    /// Boot the runtime. Carries the block the worker polls while running.
    Initialize { control: Arc<SharedControlBlock> },
    /// Breakpoints for the next execution (1-based lines).
    SetBreakpoints { lines: Vec<u32> },
    StartExecution { source: String },
    StartConversion {
        direction: ConversionDirection,
        source: String,
    },
}

/// Worker -> controller. Serialises with the `type` tags the playground UI
/// switches on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerEvent {
    Initialized { success: bool },
    BreakHit { line: u32 },
    Stdout { output: String },
    Stderr { output: String },
    /// JSON-encoded `{nodes, edges}`.
    JacGraph { graph: String },
    ExecEnd,
    ConversionResult { success: bool, output: String },
}

impl WorkerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerEvent::Initialized { .. } => "initialized",
            WorkerEvent::BreakHit { .. } => "breakHit",
            WorkerEvent::Stdout { .. } => "stdout",
            WorkerEvent::Stderr { .. } => "stderr",
            WorkerEvent::JacGraph { .. } => "jacGraph",
            WorkerEvent::ExecEnd => "execEnd",
            WorkerEvent::ConversionResult { .. } => "conversionResult",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionDirection {
    #[serde(rename = "jac2py")]
    JacToPython,
    #[serde(rename = "py2jac")]
    PythonToJac,
}

impl ConversionDirection {
    pub fn source_language(&self) -> &'static str {
        match self {
            ConversionDirection::JacToPython => "Jac",
            ConversionDirection::PythonToJac => "Python",
        }
    }

    pub fn target_language(&self) -> &'static str {
        match self {
            ConversionDirection::JacToPython => "Python",
            ConversionDirection::PythonToJac => "Jac",
        }
    }
}

impl fmt::Display for ConversionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionDirection::JacToPython => write!(f, "jac2py"),
            ConversionDirection::PythonToJac => write!(f, "py2jac"),
        }
    }
}
