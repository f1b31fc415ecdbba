use crate::graph::GraphSnapshot;

pub type InitializedCallback = Box<dyn FnMut(bool)>;
pub type BreakCallback = Box<dyn FnMut(u32)>;
pub type OutputCallback = Box<dyn FnMut(&str)>;
pub type GraphCallback = Box<dyn FnMut(&GraphSnapshot)>;
pub type EndCallback = Box<dyn FnMut()>;

/// One optional subscriber per event kind. Registering replaces the previous
/// subscriber, which is handed back to the caller.
#[derive(Default)]
pub struct Subscriptions {
    initialized: Option<InitializedCallback>,
    break_hit: Option<BreakCallback>,
    stdout: Option<OutputCallback>,
    stderr: Option<OutputCallback>,
    graph: Option<GraphCallback>,
    exec_end: Option<EndCallback>,
}

/// Output subscribers parked while a conversion exchange runs.
#[must_use]
pub struct SuppressedOutput {
    stdout: Option<OutputCallback>,
    stderr: Option<OutputCallback>,
}

impl Subscriptions {
    pub fn set_initialized(&mut self, callback: Option<InitializedCallback>) -> Option<InitializedCallback> {
        std::mem::replace(&mut self.initialized, callback)
    }

    pub fn set_break_hit(&mut self, callback: Option<BreakCallback>) -> Option<BreakCallback> {
        std::mem::replace(&mut self.break_hit, callback)
    }

    pub fn set_stdout(&mut self, callback: Option<OutputCallback>) -> Option<OutputCallback> {
        std::mem::replace(&mut self.stdout, callback)
    }

    pub fn set_stderr(&mut self, callback: Option<OutputCallback>) -> Option<OutputCallback> {
        std::mem::replace(&mut self.stderr, callback)
    }

    pub fn set_graph(&mut self, callback: Option<GraphCallback>) -> Option<GraphCallback> {
        std::mem::replace(&mut self.graph, callback)
    }

    pub fn set_exec_end(&mut self, callback: Option<EndCallback>) -> Option<EndCallback> {
        std::mem::replace(&mut self.exec_end, callback)
    }

    pub fn has_stdout(&self) -> bool {
        self.stdout.is_some()
    }

    pub fn has_stderr(&self) -> bool {
        self.stderr.is_some()
    }

    pub fn suppress_output(&mut self) -> SuppressedOutput {
        SuppressedOutput {
            stdout: self.stdout.take(),
            stderr: self.stderr.take(),
        }
    }

    pub fn restore_output(&mut self, saved: SuppressedOutput) {
        self.stdout = saved.stdout;
        self.stderr = saved.stderr;
    }

    pub(crate) fn initialized(&mut self, success: bool) {
        if let Some(callback) = self.initialized.as_mut() {
            callback(success);
        }
    }

    pub(crate) fn break_hit(&mut self, line: u32) {
        if let Some(callback) = self.break_hit.as_mut() {
            callback(line);
        }
    }

    pub(crate) fn stdout(&mut self, text: &str) {
        if let Some(callback) = self.stdout.as_mut() {
            callback(text);
        }
    }

    pub(crate) fn stderr(&mut self, text: &str) {
        if let Some(callback) = self.stderr.as_mut() {
            callback(text);
        }
    }

    pub(crate) fn graph(&mut self, snapshot: &GraphSnapshot) {
        if let Some(callback) = self.graph.as_mut() {
            callback(snapshot);
        }
    }

    pub(crate) fn exec_end(&mut self) {
        if let Some(callback) = self.exec_end.as_mut() {
            callback();
        }
    }
}
