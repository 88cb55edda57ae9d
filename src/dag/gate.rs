// src/dag/gate.rs

use std::pin::pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, MutexGuard, Notify};

/// Run-wide mutual exclusion for `exclusive` commands.
///
/// Contract:
/// - While an exclusive command runs, no other command runs.
/// - An exclusive command acquires the mutex, waits for every running
///   non-exclusive command to drain, then runs alone while still holding
///   the mutex.
/// - A non-exclusive command acquires the mutex only long enough to bump
///   the running counter, so a pending exclusive acquisition blocks new
///   non-exclusive entries.
///
/// One gate is created per top-level execution and discarded with it.
#[derive(Debug, Default)]
pub struct ExclusivityGate {
    lock: Mutex<()>,
    running: AtomicUsize,
    drained: Notify,
}

/// Permission to run, returned by [`ExclusivityGate::enter`]. Dropping the
/// pass releases the command's claim on the gate.
#[derive(Debug)]
pub struct GatePass<'a> {
    gate: &'a ExclusivityGate,
    /// Held for the whole run of an exclusive command, `None` for a
    /// non-exclusive one.
    exclusive_guard: Option<MutexGuard<'a, ()>>,
}

impl ExclusivityGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until the calling command is allowed to run, then return a pass
    /// that must be held for the duration of the command.
    pub async fn enter(&self, exclusive: bool) -> GatePass<'_> {
        let guard = self.lock.lock().await;

        if exclusive {
            loop {
                let mut drained = pin!(self.drained.notified());
                // Register interest before checking the counter so a
                // concurrent decrement cannot slip between check and await.
                drained.as_mut().enable();
                if self.running.load(Ordering::Acquire) == 0 {
                    break;
                }
                drained.await;
            }

            GatePass {
                gate: self,
                exclusive_guard: Some(guard),
            }
        } else {
            self.running.fetch_add(1, Ordering::AcqRel);
            drop(guard);

            GatePass {
                gate: self,
                exclusive_guard: None,
            }
        }
    }

    /// Number of non-exclusive commands currently holding a pass.
    pub fn running_shared(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for GatePass<'_> {
    fn drop(&mut self) {
        if self.exclusive_guard.is_none()
            && self.gate.running.fetch_sub(1, Ordering::AcqRel) == 1
        {
            self.gate.drained.notify_waiters();
        }
    }
}
