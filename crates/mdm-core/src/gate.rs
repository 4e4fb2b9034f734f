//! Process-wide transfer gate.
//!
//! Every transfer holds one slot while its connection is open, so the number
//! of bytes-moving transfers stays under `capacity` no matter how many movies
//! or parts are nominally in progress. Capacity can change at runtime.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct GateState {
    in_use: usize,
    capacity: usize,
}

/// Counting semaphore with resizable capacity.
#[derive(Debug)]
pub struct ConcurrencyGate {
    state: Mutex<GateState>,
    freed: Condvar,
}

/// Slot held by one transfer; released on drop.
#[derive(Debug)]
pub struct GatePermit<'a> {
    gate: &'a ConcurrencyGate,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

impl ConcurrencyGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(GateState {
                in_use: 0,
                capacity: capacity.max(1),
            }),
            freed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until a slot is free, then takes it.
    pub fn acquire(&self) -> GatePermit<'_> {
        let mut state = self.lock();
        while state.in_use >= state.capacity {
            state = self
                .freed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.in_use += 1;
        GatePermit { gate: self }
    }

    /// Takes a slot only if one is free right now.
    pub fn try_acquire(&self) -> Option<GatePermit<'_>> {
        let mut state = self.lock();
        if state.in_use >= state.capacity {
            return None;
        }
        state.in_use += 1;
        Some(GatePermit { gate: self })
    }

    fn release(&self) {
        let mut state = self.lock();
        state.in_use = state.in_use.saturating_sub(1);
        drop(state);
        self.freed.notify_one();
    }

    /// Changes capacity (clamped to at least 1). Raising it wakes blocked
    /// acquirers; lowering it never preempts current holders.
    pub fn set_capacity(&self, capacity: usize) {
        let mut state = self.lock();
        state.capacity = capacity.max(1);
        drop(state);
        self.freed.notify_all();
    }

    pub fn in_use(&self) -> usize {
        self.lock().in_use
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }
}
