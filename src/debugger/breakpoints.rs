use std::collections::BTreeSet;
use tracing::debug;

/// Unique 1-based source lines, iterated in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Breakpoints {
    points: BTreeSet<u32>,
}

impl Breakpoints {
    pub fn new() -> Self {
        Self {
            points: BTreeSet::new(),
        }
    }

    pub fn from_lines(lines: &[u32]) -> Self {
        Self {
            points: lines.iter().copied().filter(|&l| l > 0).collect(),
        }
    }

    pub fn add(&mut self, line: u32) {
        if line == 0 {
            debug!("ignoring breakpoint on line 0");
            return;
        }
        self.points.insert(line);
        debug!(line, "breakpoint set");
    }

    pub fn remove(&mut self, line: u32) {
        self.points.remove(&line);
        debug!(line, "breakpoint removed");
    }

    pub fn contains(&self, line: u32) -> bool {
        self.points.contains(&line)
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Clear, then rebuild from `lines`.
    pub fn replace(&mut self, lines: &[u32]) {
        *self = Self::from_lines(lines);
    }

    pub fn lines(&self) -> Vec<u32> {
        self.points.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
