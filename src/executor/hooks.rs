use std::sync::mpsc::Sender;
use tracing::{debug, warn};

use crate::debugger::DebugContext;
use crate::graph::GraphSnapshot;
use crate::protocol::{ControlCommand, SharedControlBlock, WorkerEvent};
use crate::runtime::{ExecutionHooks, LineAction, StepFrame};

/// Hooks the worker hands to the runtime for one execution session.
///
/// Every statement boundary is an observation point: the control block is
/// polled without blocking, and the worker parks in [`SharedControlBlock::wait`]
/// when the debug context says to stop.
pub struct DebugHooks<'a> {
    control: &'a SharedControlBlock,
    context: DebugContext,
    events: &'a Sender<WorkerEvent>,
    graph: GraphSnapshot,
    graph_dirty: bool,
    disconnected: bool,
}

impl<'a> DebugHooks<'a> {
    pub fn new(
        control: &'a SharedControlBlock,
        context: DebugContext,
        events: &'a Sender<WorkerEvent>,
    ) -> Self {
        Self {
            control,
            context,
            events,
            graph: GraphSnapshot::new(),
            graph_dirty: false,
            disconnected: false,
        }
    }

    pub fn context(&self) -> &DebugContext {
        &self.context
    }

    /// Whether the controller side of the event channel is gone.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    fn send(&mut self, event: WorkerEvent) {
        if self.disconnected {
            return;
        }
        if self.events.send(event).is_err() {
            warn!("controller dropped the event channel; aborting execution");
            self.disconnected = true;
        }
    }

    /// Publish the latest graph if it changed since the last publication.
    pub fn flush_graph(&mut self) {
        if !self.graph_dirty {
            return;
        }
        self.graph_dirty = false;
        match self.graph.to_json() {
            Ok(graph) => self.send(WorkerEvent::JacGraph { graph }),
            Err(err) => warn!(%err, "graph snapshot could not be encoded"),
        }
    }

    /// Poll once without blocking. Returns `true` when the run must abort.
    fn observe(&mut self) -> bool {
        let Some(command) = self.control.try_take() else {
            return false;
        };
        match command {
            ControlCommand::Terminate => true,
            command if command.resumes() => {
                warn!(?command, "resume command received while running; dropped");
                false
            }
            command => {
                debug!(?command, "breakpoint command applied while running");
                self.context.apply_breakpoint_command(command);
                false
            }
        }
    }

    fn suspend(&mut self, frame: StepFrame) -> LineAction {
        self.flush_graph();
        self.send(WorkerEvent::BreakHit { line: frame.line });
        if self.disconnected {
            return LineAction::Abort;
        }
        debug!(line = frame.line, depth = frame.depth, "suspended");

        loop {
            match self.control.wait() {
                ControlCommand::Terminate => return LineAction::Abort,
                command if command.resumes() => {
                    self.context.resume(command, frame.depth);
                    return LineAction::Proceed;
                }
                command => {
                    debug!(?command, "breakpoint command applied while suspended");
                    self.context.apply_breakpoint_command(command);
                }
            }
        }
    }
}

impl ExecutionHooks for DebugHooks<'_> {
    fn on_line(&mut self, frame: StepFrame) -> LineAction {
        if self.disconnected || self.observe() {
            return LineAction::Abort;
        }
        if self.context.should_stop_at(frame.line, frame.depth) {
            return self.suspend(frame);
        }
        LineAction::Proceed
    }

    fn stdout(&mut self, text: &str) {
        self.send(WorkerEvent::Stdout {
            output: text.to_string(),
        });
    }

    fn stderr(&mut self, text: &str) {
        self.send(WorkerEvent::Stderr {
            output: text.to_string(),
        });
    }

    fn graph(&mut self, snapshot: &GraphSnapshot) {
        if self.graph.merge(snapshot) > 0 {
            self.graph_dirty = true;
        }
    }
}
