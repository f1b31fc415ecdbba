use crate::protocol::ControlCommand;

/// Run modes for the debugger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Continue,
    StepOver,
    StepInto,
    StepOut,
}

impl RunMode {
    /// The mode a resume command switches to; `None` for commands that do
    /// not resume.
    pub fn from_command(command: ControlCommand) -> Option<Self> {
        match command {
            ControlCommand::Continue => Some(RunMode::Continue),
            ControlCommand::StepOver => Some(RunMode::StepOver),
            ControlCommand::StepInto => Some(RunMode::StepInto),
            ControlCommand::StepOut => Some(RunMode::StepOut),
            ControlCommand::ClearBreakpoints
            | ControlCommand::SetBreakpoint(_)
            | ControlCommand::Terminate => None,
        }
    }

    pub fn command(&self) -> ControlCommand {
        match self {
            RunMode::Continue => ControlCommand::Continue,
            RunMode::StepOver => ControlCommand::StepOver,
            RunMode::StepInto => ControlCommand::StepInto,
            RunMode::StepOut => ControlCommand::StepOut,
        }
    }
}
