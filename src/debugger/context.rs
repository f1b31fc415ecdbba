use super::breakpoints::Breakpoints;
use super::RunMode;
use crate::protocol::ControlCommand;
use tracing::{debug, warn};

/// Worker-side stepping state: decides at each statement boundary whether
/// execution must suspend.
#[derive(Debug, Clone)]
pub struct DebugContext {
    breakpoints: Breakpoints,
    mode: RunMode,
    /// Call depth at the moment the last step command was consumed.
    step_depth: usize,
}

impl DebugContext {
    pub fn new(breakpoints: Breakpoints) -> Self {
        Self {
            breakpoints,
            mode: RunMode::Continue,
            step_depth: 0,
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RunMode) {
        self.mode = mode;
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    pub fn add_breakpoint(&mut self, line: u32) {
        self.breakpoints.add(line);
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    /// Breakpoints stop in every mode; otherwise the step mode decides.
    pub fn should_stop_at(&self, line: u32, depth: usize) -> bool {
        if self.breakpoints.contains(line) {
            return true;
        }
        match self.mode {
            RunMode::Continue => false,
            RunMode::StepInto => true,
            RunMode::StepOver => depth <= self.step_depth,
            RunMode::StepOut => depth < self.step_depth,
        }
    }

    /// Apply a resume command consumed while suspended at `depth`.
    pub fn resume(&mut self, command: ControlCommand, depth: usize) {
        match RunMode::from_command(command) {
            Some(mode) => {
                self.mode = mode;
                self.step_depth = depth;
                debug!(?mode, depth, "resuming");
            }
            None => warn!(?command, "not a resume command"),
        }
    }

    /// Apply a breakpoint command. Returns `false` for any other command.
    pub fn apply_breakpoint_command(&mut self, command: ControlCommand) -> bool {
        match command {
            ControlCommand::ClearBreakpoints => self.clear_breakpoints(),
            ControlCommand::SetBreakpoint(line) => self.add_breakpoint(line),
            _ => return false,
        }
        true
    }
}
