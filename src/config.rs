use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// Tunables for the controller and the execution worker.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaygroundConfig {
    /// Deadline for a conversion request/response exchange.
    pub conversion_timeout_ms: u64,
    /// Deadline for the worker's `initialized` reply.
    pub init_timeout_ms: u64,
    /// How long the controller waits for the worker to consume one control
    /// command while rebuilding breakpoints mid-run.
    pub command_handoff_timeout_ms: u64,
    pub worker_thread_name: String,
    /// File name reported in tracebacks.
    pub source_path: String,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            conversion_timeout_ms: 30_000,
            init_timeout_ms: 10_000,
            command_handoff_timeout_ms: 1_000,
            worker_thread_name: "execution-worker".to_string(),
            source_path: "/tmp/main.jac".to_string(),
        }
    }
}

impl PlaygroundConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_millis(self.conversion_timeout_ms)
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn command_handoff_timeout(&self) -> Duration {
        Duration::from_millis(self.command_handoff_timeout_ms)
    }
}
