use crate::graph::GraphSnapshot;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Suspended,
    Ended,
}

/// Controller-side view of one run of user code.
#[derive(Debug, Clone)]
pub struct ExecutionSession {
    source: String,
    state: SessionState,
    stdout: String,
    stderr: String,
    highlighted_line: Option<u32>,
    graph: GraphSnapshot,
}

impl ExecutionSession {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            state: SessionState::Running,
            stdout: String::new(),
            stderr: String::new(),
            highlighted_line: None,
            graph: GraphSnapshot::new(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Running or suspended.
    pub fn is_active(&self) -> bool {
        self.state != SessionState::Ended
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == SessionState::Suspended
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn highlighted_line(&self) -> Option<u32> {
        self.highlighted_line
    }

    /// Everything displayed so far, merged across snapshots.
    pub fn graph(&self) -> &GraphSnapshot {
        &self.graph
    }

    pub fn suspend_at(&mut self, line: u32) {
        if self.state == SessionState::Ended {
            debug!(line, "breakpoint reported after the session ended");
            return;
        }
        self.state = SessionState::Suspended;
        self.highlighted_line = Some(line);
    }

    pub fn resume(&mut self) {
        if self.state == SessionState::Suspended {
            self.state = SessionState::Running;
            self.highlighted_line = None;
        }
    }

    pub fn end(&mut self) {
        self.state = SessionState::Ended;
        self.highlighted_line = None;
    }

    pub fn append_stdout(&mut self, text: &str) {
        self.stdout.push_str(text);
    }

    pub fn append_stderr(&mut self, text: &str) {
        self.stderr.push_str(text);
    }

    pub fn merge_graph(&mut self, snapshot: &GraphSnapshot) -> usize {
        self.graph.merge(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlight_follows_suspension() {
        let mut session = ExecutionSession::new("print(1)");
        assert!(session.is_running());
        session.suspend_at(4);
        assert!(session.is_paused());
        assert_eq!(session.highlighted_line(), Some(4));
        session.resume();
        assert_eq!(session.highlighted_line(), None);
        session.suspend_at(6);
        session.end();
        assert!(!session.is_active());
        assert_eq!(session.highlighted_line(), None);
    }

    #[test]
    fn late_break_does_not_revive_an_ended_session() {
        let mut session = ExecutionSession::new("");
        session.end();
        session.suspend_at(2);
        assert_eq!(session.state(), SessionState::Ended);
    }
}
