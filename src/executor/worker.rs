use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, SendError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use super::DebugHooks;
use crate::config::PlaygroundConfig;
use crate::debugger::{Breakpoints, DebugContext};
use crate::protocol::{ConversionDirection, SharedControlBlock, WorkerEvent, WorkerRequest};
use crate::runtime::{ExecutionHooks, Runtime, RuntimeError, ScriptError};

const NOT_READY: &str = "runtime environment not ready";
const STOPPED_BY_USER: &str = "Execution stopped by user.\n";

/// The controller's ends of the worker's two channels.
pub struct WorkerHandle {
    pub requests: Sender<WorkerRequest>,
    pub events: Receiver<WorkerEvent>,
    pub thread: JoinHandle<()>,
}

/// Spawn the execution worker on its own named thread. The worker owns
/// `runtime` until its request channel closes.
pub fn spawn(config: &PlaygroundConfig, runtime: Box<dyn Runtime>) -> io::Result<WorkerHandle> {
    let (request_tx, request_rx) = channel::<WorkerRequest>();
    let (event_tx, event_rx) = channel::<WorkerEvent>();

    let worker = ExecutionWorker::new(runtime, event_tx);
    let thread = thread::Builder::new()
        .name(config.worker_thread_name.clone())
        .spawn(move || worker.run(request_rx))?;

    Ok(WorkerHandle {
        requests: request_tx,
        events: event_rx,
        thread,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Pending,
    Loaded,
    Failed,
}

struct ExecutionWorker {
    runtime: Box<dyn Runtime>,
    control: Option<Arc<SharedControlBlock>>,
    load: LoadState,
    breakpoints: Breakpoints,
    events: Sender<WorkerEvent>,
}

type Disconnected = SendError<WorkerEvent>;

impl ExecutionWorker {
    fn new(runtime: Box<dyn Runtime>, events: Sender<WorkerEvent>) -> Self {
        Self {
            runtime,
            control: None,
            load: LoadState::Pending,
            breakpoints: Breakpoints::new(),
            events,
        }
    }

    fn run(mut self, requests: Receiver<WorkerRequest>) {
        info!("execution worker started");
        for request in requests {
            if self.handle(request).is_err() {
                warn!("controller dropped the event channel");
                break;
            }
        }
        info!("execution worker exiting");
    }

    fn handle(&mut self, request: WorkerRequest) -> Result<(), Disconnected> {
        match request {
            WorkerRequest::Initialize { control } => self.initialize(control),
            WorkerRequest::SetBreakpoints { lines } => {
                self.breakpoints.replace(&lines);
                debug!(count = self.breakpoints.len(), "breakpoints buffered");
                Ok(())
            }
            WorkerRequest::StartExecution { source } => self.execute(&source),
            WorkerRequest::StartConversion { direction, source } => {
                self.convert(direction, &source)
            }
        }
    }

    fn initialize(&mut self, control: Arc<SharedControlBlock>) -> Result<(), Disconnected> {
        self.control = Some(control);
        if self.load == LoadState::Pending {
            self.load = match self.runtime.load() {
                Ok(()) => {
                    info!("runtime loaded");
                    LoadState::Loaded
                }
                Err(err) => {
                    error!(%err, "runtime failed to load");
                    LoadState::Failed
                }
            };
        } else {
            warn!(state = ?self.load, "initialize received twice; load is not retried");
        }
        self.events.send(WorkerEvent::Initialized {
            success: self.load == LoadState::Loaded,
        })
    }

    fn execute(&mut self, source: &str) -> Result<(), Disconnected> {
        let control = match (&self.control, self.load) {
            (Some(control), LoadState::Loaded) => Arc::clone(control),
            _ => {
                warn!("execution requested before the runtime loaded");
                self.events.send(WorkerEvent::Stderr {
                    output: format!("{}\n", NOT_READY),
                })?;
                return self.events.send(WorkerEvent::ExecEnd);
            }
        };

        info!(breakpoints = self.breakpoints.len(), "execution started");

        let context = DebugContext::new(self.breakpoints.clone());
        let mut hooks = DebugHooks::new(&control, context, &self.events);
        let runtime = &mut self.runtime;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| runtime.execute(source, &mut hooks)));

        match outcome {
            Ok(Ok(())) => info!("execution finished"),
            Ok(Err(ScriptError::Terminated)) => {
                info!("execution terminated");
                hooks.stdout(STOPPED_BY_USER);
            }
            Ok(Err(err)) => {
                debug!("execution raised");
                hooks.stderr(&err.to_string());
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(%message, "runtime panicked");
                hooks.stderr(&format!("internal error: {}\n", message));
            }
        }
        hooks.flush_graph();
        let disconnected = hooks.is_disconnected();
        drop(hooks);

        if disconnected {
            return Err(SendError(WorkerEvent::ExecEnd));
        }
        self.events.send(WorkerEvent::ExecEnd)
    }

    fn convert(&mut self, direction: ConversionDirection, source: &str) -> Result<(), Disconnected> {
        debug!(%direction, "conversion requested");
        let reply = if self.load == LoadState::Loaded {
            self.runtime.convert(direction, source)
        } else {
            Err(RuntimeError::Conversion(NOT_READY.to_string()))
        };
        let event = match reply {
            Ok(output) => WorkerEvent::ConversionResult {
                success: true,
                output,
            },
            Err(err) => WorkerEvent::ConversionResult {
                success: false,
                output: err.to_string(),
            },
        };
        self.events.send(event)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "runtime panicked".to_string()
    }
}
