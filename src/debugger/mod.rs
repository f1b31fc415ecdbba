mod breakpoints;
mod context;
mod session;
mod stepping;

pub use breakpoints::Breakpoints;
pub use context::DebugContext;
pub use session::{ExecutionSession, SessionState};
pub use stepping::RunMode;
