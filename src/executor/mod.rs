//! The execution worker: a dedicated thread that owns the runtime, serves
//! controller requests in order and streams events back.

mod hooks;
mod worker;

pub use hooks::DebugHooks;
pub use worker::{spawn, WorkerHandle};
