//! The controller side: owns the worker thread, routes commands and
//! demultiplexes worker events to typed subscribers.

mod conversion;
mod events;
mod thread;

pub use conversion::{convert_jac_to_python, convert_python_to_jac};
pub use events::{
    BreakCallback, EndCallback, GraphCallback, InitializedCallback, OutputCallback,
    Subscriptions, SuppressedOutput,
};
pub use thread::ThreadController;
