//! Shared control block: the synchronous command channel used while the
//! worker is parked at a suspension point.
//!
//! The block holds exactly one outstanding command. Posting a second command
//! before the worker consumed the first overwrites it; callers that need
//! several commands delivered in order must wait for the block to go idle
//! between posts (see [`SharedControlBlock::wait_idle`]).

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::{Duration, Instant};
use tracing::{trace, warn};

pub const CONTROL_SLOTS: usize = 3;

const SLOT_PENDING: usize = 0;
const SLOT_CODE: usize = 1;
const SLOT_ARG: usize = 2;

const IDLE: i32 = 0;
const PENDING: i32 = 1;

/// Commands understood by the worker at a suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    ClearBreakpoints,
    /// 1-based source line.
    SetBreakpoint(u32),
    Continue,
    StepOver,
    StepInto,
    StepOut,
    Terminate,
}

impl ControlCommand {
    pub fn code(&self) -> i32 {
        match self {
            ControlCommand::ClearBreakpoints => 1,
            ControlCommand::SetBreakpoint(_) => 2,
            ControlCommand::Continue => 3,
            ControlCommand::StepOver => 4,
            ControlCommand::StepInto => 5,
            ControlCommand::StepOut => 6,
            ControlCommand::Terminate => 7,
        }
    }

    pub fn arg(&self) -> i32 {
        match self {
            ControlCommand::SetBreakpoint(line) => i32::try_from(*line).unwrap_or(i32::MAX),
            _ => 0,
        }
    }

    pub fn decode(code: i32, arg: i32) -> Option<Self> {
        let command = match code {
            1 => ControlCommand::ClearBreakpoints,
            2 => ControlCommand::SetBreakpoint(u32::try_from(arg).ok()?),
            3 => ControlCommand::Continue,
            4 => ControlCommand::StepOver,
            5 => ControlCommand::StepInto,
            6 => ControlCommand::StepOut,
            7 => ControlCommand::Terminate,
            _ => return None,
        };
        Some(command)
    }

    /// Whether consuming this command lets a suspended worker run again.
    pub fn resumes(&self) -> bool {
        matches!(
            self,
            ControlCommand::Continue
                | ControlCommand::StepOver
                | ControlCommand::StepInto
                | ControlCommand::StepOut
        )
    }
}

pub struct SharedControlBlock {
    slots: [AtomicI32; CONTROL_SLOTS],
    lock: Mutex<()>,
    signal: Condvar,
}

impl SharedControlBlock {
    pub fn new() -> Self {
        Self {
            slots: [AtomicI32::new(IDLE), AtomicI32::new(0), AtomicI32::new(0)],
            lock: Mutex::new(()),
            signal: Condvar::new(),
        }
    }

    /// Controller side: write the command and wake the worker. No
    /// acknowledgement; an unconsumed earlier command is overwritten.
    pub fn post(&self, command: ControlCommand) {
        let _guard = self.lock.lock();
        if self.slots[SLOT_PENDING].load(Ordering::Acquire) == PENDING {
            warn!(
                overwritten = self.slots[SLOT_CODE].load(Ordering::Relaxed),
                code = command.code(),
                "control command posted before the previous one was consumed"
            );
        }
        self.slots[SLOT_ARG].store(command.arg(), Ordering::Relaxed);
        self.slots[SLOT_CODE].store(command.code(), Ordering::Relaxed);
        self.slots[SLOT_PENDING].store(PENDING, Ordering::Release);
        self.signal.notify_all();
        trace!(?command, "control command posted");
    }

    /// Worker side: block until a command is posted, then consume it.
    pub fn wait(&self) -> ControlCommand {
        let mut guard = self.lock.lock();
        loop {
            while self.slots[SLOT_PENDING].load(Ordering::Acquire) != PENDING {
                self.signal.wait(&mut guard);
            }
            if let Some(command) = self.consume_locked() {
                return command;
            }
        }
    }

    /// Worker side: consume a pending command without blocking.
    pub fn try_take(&self) -> Option<ControlCommand> {
        if self.slots[SLOT_PENDING].load(Ordering::Acquire) != PENDING {
            return None;
        }
        let _guard = self.lock.lock();
        if self.slots[SLOT_PENDING].load(Ordering::Acquire) != PENDING {
            return None;
        }
        self.consume_locked()
    }

    /// Controller side: wait until the worker has consumed the outstanding
    /// command. Returns `false` if it is still pending after `timeout`.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        while self.slots[SLOT_PENDING].load(Ordering::Acquire) == PENDING {
            if self.signal.wait_until(&mut guard, deadline).timed_out() {
                return self.slots[SLOT_PENDING].load(Ordering::Acquire) != PENDING;
            }
        }
        true
    }

    pub fn is_pending(&self) -> bool {
        self.slots[SLOT_PENDING].load(Ordering::Acquire) == PENDING
    }

    /// Drop any outstanding command.
    pub fn reset(&self) {
        let _guard = self.lock.lock();
        for slot in &self.slots {
            slot.store(0, Ordering::Relaxed);
        }
        self.signal.notify_all();
    }

    /// Snapshot of the raw slots, in slot order.
    pub fn slots(&self) -> [i32; CONTROL_SLOTS] {
        let _guard = self.lock.lock();
        [
            self.slots[SLOT_PENDING].load(Ordering::Acquire),
            self.slots[SLOT_CODE].load(Ordering::Relaxed),
            self.slots[SLOT_ARG].load(Ordering::Relaxed),
        ]
    }

    // Caller holds `lock` and has seen the pending flag set.
    fn consume_locked(&self) -> Option<ControlCommand> {
        let code = self.slots[SLOT_CODE].swap(0, Ordering::Relaxed);
        let arg = self.slots[SLOT_ARG].swap(0, Ordering::Relaxed);
        self.slots[SLOT_PENDING].store(IDLE, Ordering::Release);
        self.signal.notify_all();

        let command = ControlCommand::decode(code, arg);
        if command.is_none() {
            warn!(code, arg, "discarding unknown control command");
        }
        command
    }
}

impl Default for SharedControlBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedControlBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedControlBlock")
            .field("slots", &self.slots())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn post_fills_slots_in_order() {
        let block = SharedControlBlock::new();
        block.post(ControlCommand::SetBreakpoint(12));
        assert_eq!(block.slots(), [1, 2, 12]);
    }

    #[test]
    fn take_resets_the_pending_flag() {
        let block = SharedControlBlock::new();
        block.post(ControlCommand::StepOut);
        assert_eq!(block.try_take(), Some(ControlCommand::StepOut));
        assert_eq!(block.slots(), [0, 0, 0]);
        assert_eq!(block.try_take(), None);
    }

    #[test]
    fn second_post_overwrites_unconsumed_command() {
        let block = SharedControlBlock::new();
        block.post(ControlCommand::SetBreakpoint(3));
        block.post(ControlCommand::SetBreakpoint(9));
        assert_eq!(block.try_take(), Some(ControlCommand::SetBreakpoint(9)));
        assert_eq!(block.try_take(), None);
    }

    #[test]
    fn codes_round_trip_through_decode() {
        for command in [
            ControlCommand::ClearBreakpoints,
            ControlCommand::SetBreakpoint(7),
            ControlCommand::Continue,
            ControlCommand::StepOver,
            ControlCommand::StepInto,
            ControlCommand::StepOut,
            ControlCommand::Terminate,
        ] {
            assert_eq!(ControlCommand::decode(command.code(), command.arg()), Some(command));
        }
        assert_eq!(ControlCommand::decode(42, 0), None);
        assert_eq!(ControlCommand::decode(2, -1), None);
    }

    #[test]
    fn wait_blocks_until_posted() {
        let block = Arc::new(SharedControlBlock::new());
        let waiter = {
            let block = Arc::clone(&block);
            thread::spawn(move || block.wait())
        };
        thread::sleep(Duration::from_millis(20));
        block.post(ControlCommand::Continue);
        assert_eq!(waiter.join().unwrap(), ControlCommand::Continue);
        assert!(!block.is_pending());
    }

    #[test]
    fn wait_idle_times_out_without_a_consumer() {
        let block = SharedControlBlock::new();
        block.post(ControlCommand::ClearBreakpoints);
        assert!(!block.wait_idle(Duration::from_millis(10)));
        block.reset();
        assert!(block.wait_idle(Duration::from_millis(10)));
    }
}
