pub mod config;
pub mod controller;
pub mod debugger;
pub mod error;
pub mod executor;
pub mod graph;
pub mod parser;
pub mod protocol;
pub mod runtime;

pub use config::PlaygroundConfig;
pub use controller::{convert_jac_to_python, convert_python_to_jac, ThreadController};
pub use error::{PlaygroundError, Result};
pub use graph::{GraphEdge, GraphNode, GraphSnapshot};
pub use protocol::{ControlCommand, SharedControlBlock, WorkerEvent, WorkerRequest};
pub use runtime::{Runtime, ScriptRuntime};
