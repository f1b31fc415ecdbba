mod control_block;
mod messages;

pub use control_block::{ControlCommand, SharedControlBlock, CONTROL_SLOTS};
pub use messages::{ConversionDirection, WorkerEvent, WorkerRequest};
