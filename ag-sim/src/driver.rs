//! The grading driver's side of the ag protocol.
//!
//! The driver owns the parameter slots and the semaphores, collects
//! checkpoints and the test outcome, and watches how many simulated processes
//! are still alive.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use ag::Slot;
use derive_more::Display;

use crate::Pid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Outcome {
    #[display(fmt = "done")]
    Done,
    #[display(fmt = "fail")]
    Fail,
}

/// 机器已停机，调用者应当终止
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halted;

#[derive(Debug, Default)]
struct DriverState {
    slots: HashMap<i32, i32>,
    semaphores: HashMap<i32, u32>,
    outcome: Option<(Outcome, Pid)>,
    checkpoints: Vec<i32>,
    live: usize,
}

#[derive(Debug, Default)]
pub struct Driver {
    state: Mutex<DriverState>,
    changed: Condvar,
    halted: AtomicBool,
}

impl Driver {
    fn lock(&self) -> MutexGuard<'_, DriverState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Stops the machine and wakes every blocked P.
    pub fn halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
        let _state = self.lock();
        self.changed.notify_all();
    }

    pub fn load(&self, index: i32) -> i32 {
        self.lock().slots.get(&index).copied().unwrap_or(0)
    }

    pub fn store(&self, index: i32, value: i32) {
        self.lock().slots.insert(index, value);
    }

    pub fn slot(&self, slot: Slot) -> i32 {
        self.load(slot.index())
    }

    pub fn set_slot(&self, slot: Slot, value: i32) {
        self.store(slot.index(), value);
    }

    /// Packs `s` into `words` slots starting at `slot`.
    ///
    /// Returns `false` if `s` does not fit with its terminating NUL.
    pub fn set_string(&self, slot: Slot, s: &str, words: usize) -> bool {
        let Some(packed) = ag::words::pack(s.as_bytes(), words) else {
            return false;
        };

        let mut state = self.lock();
        for (index, word) in (slot.index()..).zip(packed) {
            state.slots.insert(index, word);
        }
        true
    }

    /// Decodes the string held in `words` slots starting at `index`.
    pub fn string(&self, index: i32, words: usize) -> String {
        let mut buf = vec![0; words * ag::words::WORD_BYTES];
        let state = self.lock();
        let packed = (index..)
            .take(words)
            .map(|i| state.slots.get(&i).copied().unwrap_or(0));
        ag::words::unpack_into(packed, &mut buf);

        String::from_utf8_lossy(ag::words::c_str(&buf)).into_owned()
    }

    pub fn set_permits(&self, semaphore: ag::Semaphore, permits: u32) {
        self.lock().semaphores.insert(semaphore.id(), permits);
    }

    pub fn p(&self, id: i32) -> Result<(), Halted> {
        let mut state = self.lock();
        loop {
            if self.is_halted() {
                return Err(Halted);
            }

            let permits = state.semaphores.entry(id).or_insert(0);
            if *permits > 0 {
                *permits -= 1;
                return Ok(());
            }

            state = self.changed.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }

    pub fn v(&self, id: i32) {
        *self.lock().semaphores.entry(id).or_insert(0) += 1;
        self.changed.notify_all();
    }

    pub fn checkpoint(&self, value: i32) {
        self.lock().checkpoints.push(value);
    }

    pub fn checkpoints(&self) -> Vec<i32> {
        self.lock().checkpoints.clone()
    }

    /// Records the test outcome. Only the first report counts.
    ///
    /// Returns `false` for a late report.
    pub fn report(&self, outcome: Outcome, pid: Pid) -> bool {
        let mut state = self.lock();
        if let Some((first, by)) = state.outcome {
            log::warn!("pid={pid} reported {outcome} after pid={by} reported {first}");
            return false;
        }
        state.outcome = Some((outcome, pid));
        self.changed.notify_all();

        log::info!("pid={pid} reported {outcome}");
        true
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.lock().outcome.map(|(outcome, _)| outcome)
    }

    pub fn process_started(&self) {
        self.lock().live += 1;
    }

    pub fn process_ended(&self) {
        let mut state = self.lock();
        state.live = state.live.saturating_sub(1);
        self.changed.notify_all();
    }

    /// Blocks until every process has ended or `timeout` elapses.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .changed
            .wait_timeout_while(state, timeout, |state| state.live > 0)
            .unwrap_or_else(|e| e.into_inner());
        state.live == 0
    }

    /// Blocks until an outcome is reported, every process has ended, or
    /// `timeout` elapses.
    ///
    /// Returns `false` on timeout.
    pub fn wait_settled(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if state.outcome.is_some() || state.live == 0 {
                return true;
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }

            state = self
                .changed
                .wait_timeout(state, deadline - now)
                .map(|(state, _)| state)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }
}
