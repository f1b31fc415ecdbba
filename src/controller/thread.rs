use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::events::{
    BreakCallback, EndCallback, GraphCallback, InitializedCallback, OutputCallback, Subscriptions,
};
use crate::config::PlaygroundConfig;
use crate::debugger::{Breakpoints, ExecutionSession};
use crate::error::{PlaygroundError, Result};
use crate::executor::{self, WorkerHandle};
use crate::graph::GraphSnapshot;
use crate::protocol::{
    ControlCommand, ConversionDirection, SharedControlBlock, WorkerEvent, WorkerRequest,
};
use crate::runtime::Runtime;

/// Controller side of the execution worker.
///
/// Requests travel over the worker's channel; commands for a running or
/// suspended session go through the shared control block, so stepping never
/// waits on the worker. Events are only delivered from [`pump`] and
/// [`wait_event`], on the caller's thread.
///
/// [`pump`]: ThreadController::pump
/// [`wait_event`]: ThreadController::wait_event
pub struct ThreadController {
    config: PlaygroundConfig,
    runtime: Option<Box<dyn Runtime>>,
    worker: Option<WorkerHandle>,
    control: Arc<SharedControlBlock>,
    loaded: bool,
    breakpoints: Breakpoints,
    session: Option<ExecutionSession>,
    subscriptions: Subscriptions,
    /// Conversion replies still owed for requests that timed out.
    stale_conversions: usize,
}

impl ThreadController {
    pub fn new(config: PlaygroundConfig, runtime: Box<dyn Runtime>) -> Self {
        Self {
            config,
            runtime: Some(runtime),
            worker: None,
            control: Arc::new(SharedControlBlock::new()),
            loaded: false,
            breakpoints: Breakpoints::new(),
            session: None,
            subscriptions: Subscriptions::default(),
            stale_conversions: 0,
        }
    }

    pub fn config(&self) -> &PlaygroundConfig {
        &self.config
    }

    /// Spawn the worker and boot its runtime. Returns whether the runtime
    /// loaded; a failed load is not retried.
    pub fn initialize(&mut self) -> Result<bool> {
        let runtime = match self.runtime.take() {
            Some(runtime) if self.worker.is_none() => runtime,
            _ => {
                warn!("initialize called on an initialized controller");
                return Err(PlaygroundError::AlreadyInitialized);
            }
        };

        let worker = executor::spawn(&self.config, runtime)?;
        self.worker = Some(worker);
        self.send(WorkerRequest::Initialize {
            control: Arc::clone(&self.control),
        })?;

        let timeout = self.config.init_timeout();
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.recv(remaining)? {
                Some(WorkerEvent::Initialized { success }) => {
                    self.dispatch(WorkerEvent::Initialized { success });
                    return Ok(success);
                }
                Some(event) => self.dispatch(event),
                None => {
                    return Err(PlaygroundError::InitializationTimeout {
                        millis: millis(timeout),
                    })
                }
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn breakpoints(&self) -> Vec<u32> {
        self.breakpoints.lines()
    }

    pub fn session(&self) -> Option<&ExecutionSession> {
        self.session.as_ref()
    }

    pub fn is_session_active(&self) -> bool {
        self.session.as_ref().is_some_and(ExecutionSession::is_active)
    }

    /// Replace the breakpoint set. During a session the worker's set is
    /// cleared and rebuilt one command at a time through the control block.
    pub fn set_breakpoints(&mut self, lines: &[u32]) -> Result<()> {
        self.breakpoints.replace(lines);
        debug!(lines = ?self.breakpoints.lines(), "breakpoints replaced");

        if self.is_session_active() {
            if !self.hand_off(ControlCommand::ClearBreakpoints)? {
                return Ok(());
            }
            for line in self.breakpoints.lines() {
                if !self.hand_off(ControlCommand::SetBreakpoint(line))? {
                    return Ok(());
                }
            }
            Ok(())
        } else if self.worker.is_some() {
            self.send(WorkerRequest::SetBreakpoints {
                lines: self.breakpoints.lines(),
            })
        } else {
            Ok(())
        }
    }

    /// Start running `source`. Returns as soon as the request is sent.
    pub fn start_execution(&mut self, source: &str) -> Result<()> {
        if self.worker.is_none() || !self.loaded {
            warn!("start requested before the runtime loaded");
            return Err(PlaygroundError::NotInitialized);
        }
        if self.is_session_active() {
            warn!("start requested while a session is active");
            return Err(PlaygroundError::SessionActive);
        }

        // The worker is between sessions, so anything still pending is a
        // leftover from the last one.
        self.control.reset();
        self.send(WorkerRequest::SetBreakpoints {
            lines: self.breakpoints.lines(),
        })?;
        self.send(WorkerRequest::StartExecution {
            source: source.to_string(),
        })?;
        self.session = Some(ExecutionSession::new(source));
        info!("execution session started");
        Ok(())
    }

    pub fn continue_execution(&mut self) -> Result<()> {
        self.resume(ControlCommand::Continue)
    }

    pub fn step_over(&mut self) -> Result<()> {
        self.resume(ControlCommand::StepOver)
    }

    pub fn step_into(&mut self) -> Result<()> {
        self.resume(ControlCommand::StepInto)
    }

    pub fn step_out(&mut self) -> Result<()> {
        self.resume(ControlCommand::StepOut)
    }

    /// Ask the worker to abort the session. Completion is reported by the
    /// usual `execEnd`.
    pub fn terminate(&mut self) -> Result<()> {
        let Some(session) = self.session.as_mut().filter(|s| s.is_active()) else {
            warn!("terminate requested with no active session");
            return Err(PlaygroundError::NoActiveSession);
        };
        session.resume();
        self.control.post(ControlCommand::Terminate);
        info!("termination requested");
        Ok(())
    }

    fn resume(&mut self, command: ControlCommand) -> Result<()> {
        let Some(session) = self.session.as_mut().filter(|s| s.is_paused()) else {
            warn!(?command, "resume requested while not suspended");
            return Err(PlaygroundError::NotSuspended);
        };
        session.resume();
        self.control.post(command);
        debug!(?command, "resume posted");
        Ok(())
    }

    /// Post one command once the slot is free and wait for the worker to
    /// consume it. Returns `Ok(false)` when the session ended first.
    fn hand_off(&mut self, command: ControlCommand) -> Result<bool> {
        let timeout = self.config.command_handoff_timeout();
        // A resume posted just before must reach the worker intact.
        if !self.control.wait_idle(timeout) {
            return self.handoff_stalled(command, timeout);
        }
        self.control.post(command);
        if self.control.wait_idle(timeout) {
            return Ok(true);
        }
        self.handoff_stalled(command, timeout)
    }

    fn handoff_stalled(&mut self, command: ControlCommand, timeout: Duration) -> Result<bool> {
        self.pump()?;
        if !self.is_session_active() {
            debug!(?command, "session ended before the command was consumed");
            self.control.reset();
            return Ok(false);
        }
        warn!(?command, "worker did not consume the command in time");
        Err(PlaygroundError::CommandNotConsumed {
            code: command.code(),
            millis: millis(timeout),
        })
    }

    /// Dispatch every event already received. Returns how many there were.
    pub fn pump(&mut self) -> Result<usize> {
        let mut count = 0;
        loop {
            let Some(worker) = self.worker.as_ref() else {
                return Ok(count);
            };
            match worker.events.try_recv() {
                Ok(event) => {
                    self.dispatch(event);
                    count += 1;
                }
                Err(TryRecvError::Empty) => return Ok(count),
                Err(TryRecvError::Disconnected) => return Err(PlaygroundError::WorkerUnavailable),
            }
        }
    }

    /// Block up to `timeout` for one event, dispatch it, and hand back a
    /// copy. `Ok(None)` on timeout.
    pub fn wait_event(&mut self, timeout: Duration) -> Result<Option<WorkerEvent>> {
        let event = self.recv(timeout)?;
        if let Some(event) = &event {
            self.dispatch(event.clone());
        }
        Ok(event)
    }

    fn dispatch(&mut self, event: WorkerEvent) {
        debug!(kind = event.kind(), "event");
        match event {
            WorkerEvent::Initialized { success } => {
                // Also reached when the reply outlived `initialize`'s timeout.
                self.loaded = success;
                info!(success, "execution worker initialized");
                self.subscriptions.initialized(success);
            }
            WorkerEvent::BreakHit { line } => {
                if let Some(session) = self.session.as_mut() {
                    session.suspend_at(line);
                }
                self.subscriptions.break_hit(line);
            }
            WorkerEvent::Stdout { output } => {
                if let Some(session) = self.session.as_mut() {
                    session.append_stdout(&output);
                }
                self.subscriptions.stdout(&output);
            }
            WorkerEvent::Stderr { output } => {
                if let Some(session) = self.session.as_mut() {
                    session.append_stderr(&output);
                }
                self.subscriptions.stderr(&output);
            }
            WorkerEvent::JacGraph { graph } => match GraphSnapshot::from_json(&graph) {
                Ok(snapshot) => {
                    if let Some(session) = self.session.as_mut() {
                        session.merge_graph(&snapshot);
                    }
                    self.subscriptions.graph(&snapshot);
                }
                Err(err) => warn!(%err, "dropping malformed graph snapshot"),
            },
            WorkerEvent::ExecEnd => {
                if let Some(session) = self.session.as_mut() {
                    session.end();
                }
                info!("execution session ended");
                self.subscriptions.exec_end();
            }
            WorkerEvent::ConversionResult { success, .. } => {
                if self.stale_conversions > 0 {
                    self.stale_conversions -= 1;
                }
                debug!(success, "discarding conversion reply with no pending request");
            }
        }
    }

    /// One bounded conversion exchange. Output subscribers are parked for
    /// its duration and restored on every path.
    pub fn convert(&mut self, direction: ConversionDirection, source: &str) -> Result<String> {
        if source.trim().is_empty() {
            return Err(PlaygroundError::EmptySource { direction });
        }
        if self.worker.is_none() || !self.loaded {
            return Err(PlaygroundError::NotInitialized);
        }
        if self.is_session_active() {
            warn!(%direction, "conversion requested while a session is active");
            return Err(PlaygroundError::SessionActive);
        }

        let saved = self.subscriptions.suppress_output();
        let result = self.exchange_conversion(direction, source);
        self.subscriptions.restore_output(saved);
        result
    }

    fn exchange_conversion(&mut self, direction: ConversionDirection, source: &str) -> Result<String> {
        self.send(WorkerRequest::StartConversion {
            direction,
            source: source.to_string(),
        })?;

        let timeout = self.config.conversion_timeout();
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.recv(remaining)? {
                Some(WorkerEvent::ConversionResult { success, output }) => {
                    if self.stale_conversions > 0 {
                        self.stale_conversions -= 1;
                        debug!("discarding reply to a timed-out conversion");
                        continue;
                    }
                    debug!(%direction, success, "conversion reply");
                    return if success {
                        Ok(output)
                    } else {
                        Err(PlaygroundError::ConversionFailed(output))
                    };
                }
                Some(event) => self.dispatch(event),
                None => {
                    self.stale_conversions += 1;
                    warn!(%direction, "conversion timed out");
                    return Err(PlaygroundError::ConversionTimeout {
                        millis: millis(timeout),
                    });
                }
            }
        }
    }

    pub fn on_initialized(&mut self, callback: impl FnMut(bool) + 'static) -> Option<InitializedCallback> {
        self.subscriptions.set_initialized(Some(Box::new(callback)))
    }

    pub fn on_break_hit(&mut self, callback: impl FnMut(u32) + 'static) -> Option<BreakCallback> {
        self.subscriptions.set_break_hit(Some(Box::new(callback)))
    }

    pub fn on_stdout(&mut self, callback: impl FnMut(&str) + 'static) -> Option<OutputCallback> {
        self.subscriptions.set_stdout(Some(Box::new(callback)))
    }

    pub fn on_stderr(&mut self, callback: impl FnMut(&str) + 'static) -> Option<OutputCallback> {
        self.subscriptions.set_stderr(Some(Box::new(callback)))
    }

    pub fn on_graph(&mut self, callback: impl FnMut(&GraphSnapshot) + 'static) -> Option<GraphCallback> {
        self.subscriptions.set_graph(Some(Box::new(callback)))
    }

    pub fn on_exec_end(&mut self, callback: impl FnMut() + 'static) -> Option<EndCallback> {
        self.subscriptions.set_exec_end(Some(Box::new(callback)))
    }

    pub fn subscriptions_mut(&mut self) -> &mut Subscriptions {
        &mut self.subscriptions
    }

    /// Terminate any active session, close the request channel and join the
    /// worker thread.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop_session();
        if let Some(worker) = self.worker.take() {
            let WorkerHandle {
                requests,
                events,
                thread,
            } = worker;
            drop(requests);
            let joined = thread.join();
            drop(events);
            joined.map_err(|_| PlaygroundError::WorkerUnavailable)?;
            info!("execution worker joined");
        }
        Ok(())
    }

    fn stop_session(&mut self) {
        if self.is_session_active() {
            self.control.post(ControlCommand::Terminate);
        }
    }

    fn send(&self, request: WorkerRequest) -> Result<()> {
        let worker = self.worker.as_ref().ok_or(PlaygroundError::NotInitialized)?;
        worker
            .requests
            .send(request)
            .map_err(|_| PlaygroundError::WorkerUnavailable)
    }

    fn recv(&self, timeout: Duration) -> Result<Option<WorkerEvent>> {
        let worker = self.worker.as_ref().ok_or(PlaygroundError::NotInitialized)?;
        match worker.events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(PlaygroundError::WorkerUnavailable),
        }
    }
}

impl Drop for ThreadController {
    fn drop(&mut self) {
        self.stop_session();
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
