//! Thread-owned exclusive gate around the shared render target.
//!
//! Unlike a plain `Mutex`, the gate remembers *which* thread holds it so
//! the owner can ask "do I hold this?" and a second `acquire` from the
//! owner reports [`Acquire::AlreadyOwned`] instead of deadlocking.
//!
//! ```text
//!  producer thread                    gate
//!  ───────────────                    ────
//!  acquire() ───────────────────────► locked, owner = producer
//!  draw into framebuffers
//!  submit() → release() ────────────► unlocked, one waiter woken
//! ```

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use tracing::{error, trace};

use crate::error::StereoError;

/// Outcome of an acquisition attempt.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// The calling thread now owns the gate.
    Ok,
    /// The calling thread already owned the gate; nothing changed.
    AlreadyOwned,
    /// The gate is held elsewhere (or the bound elapsed); nothing changed.
    TryFailed,
}

impl Acquire {
    /// `true` only when this call transferred ownership to the caller.
    pub fn is_acquired(self) -> bool {
        matches!(self, Acquire::Ok)
    }
}

#[derive(Debug, Default)]
struct GateState {
    locked: bool,
    owner: Option<ThreadId>,
}

/// Exclusive, owner-aware lock over the render target.
#[derive(Debug, Default)]
pub struct OwnershipGate {
    state: Mutex<GateState>,
    freed: Condvar,
}

impl OwnershipGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(state: &mut GateState, me: ThreadId) -> Acquire {
        state.locked = true;
        state.owner = Some(me);
        trace!(owner = ?me, "ownership gate acquired");
        Acquire::Ok
    }

    /// Block until the gate is free, then take it.
    pub fn acquire(&self) -> Acquire {
        let me = thread::current().id();
        let mut state = self.lock_state();
        if state.owner == Some(me) {
            return Acquire::AlreadyOwned;
        }
        while state.locked {
            state = self
                .freed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        Self::take(&mut state, me)
    }

    /// Take the gate only if nobody, the caller included, holds it.
    pub fn try_acquire(&self) -> Acquire {
        let me = thread::current().id();
        let mut state = match self.state.try_lock() {
            Ok(state) => state,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Acquire::TryFailed,
        };
        if state.locked {
            return Acquire::TryFailed;
        }
        Self::take(&mut state, me)
    }

    /// Like [`acquire`](Self::acquire), giving up with
    /// [`Acquire::TryFailed`] once `timeout` has elapsed.
    pub fn try_acquire_for(&self, timeout: Duration) -> Acquire {
        let me = thread::current().id();
        let deadline = Instant::now() + timeout;
        let mut state = self.lock_state();
        if state.owner == Some(me) {
            return Acquire::AlreadyOwned;
        }
        while state.locked {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Acquire::TryFailed;
            }
            let (next, _) = self
                .freed
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            state = next;
        }
        Self::take(&mut state, me)
    }

    /// Give the gate up. Only the owning thread may do this.
    ///
    /// A release from any other thread (or of an unowned gate) is a caller
    /// bug: it is logged, reported as [`StereoError::NotOwner`] and leaves
    /// the gate untouched.
    pub fn release(&self) -> Result<(), StereoError> {
        let me = thread::current().id();
        let mut state = self.lock_state();
        if !state.locked || state.owner != Some(me) {
            error!(
                caller = ?me,
                owner = ?state.owner,
                "ownership gate released by a thread that does not own it"
            );
            return Err(StereoError::NotOwner);
        }
        state.locked = false;
        state.owner = None;
        drop(state);
        self.freed.notify_one();
        trace!(owner = ?me, "ownership gate released");
        Ok(())
    }

    /// Whether the calling thread currently holds the gate.
    ///
    /// Probes the state lock without blocking first. If another thread is
    /// mid-acquire the probe falls back to a short wait on the state lock
    /// itself, never on gate ownership.
    pub fn owned_by_calling_thread(&self) -> bool {
        let me = thread::current().id();
        let state = match self.state.try_lock() {
            Ok(state) => state,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => self.lock_state(),
        };
        state.locked && state.owner == Some(me)
    }

    /// Whether any thread holds the gate.
    pub fn is_locked(&self) -> bool {
        self.lock_state().locked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::mpsc;

    #[test]
    fn acquire_then_release() {
        let gate = OwnershipGate::new();
        assert!(gate.acquire().is_acquired());
        assert!(gate.owned_by_calling_thread());
        gate.release().unwrap();
        assert!(!gate.is_locked());
        assert!(!gate.owned_by_calling_thread());
    }

    #[test]
    fn second_acquire_reports_already_owned() {
        let gate = OwnershipGate::new();
        assert_eq!(gate.acquire(), Acquire::Ok);
        assert_eq!(gate.acquire(), Acquire::AlreadyOwned);
        assert!(!Acquire::AlreadyOwned.is_acquired());
        // A single release frees it: re-entry is not counted.
        gate.release().unwrap();
        assert!(!gate.is_locked());
    }

    #[test]
    fn try_acquire_fails_for_owner_too() {
        let gate = OwnershipGate::new();
        assert_eq!(gate.try_acquire(), Acquire::Ok);
        assert_eq!(gate.try_acquire(), Acquire::TryFailed);
        gate.release().unwrap();
    }

    #[test]
    fn zero_timeout_on_locked_gate_fails_immediately() {
        let gate = Arc::new(OwnershipGate::new());
        let holder = Arc::clone(&gate);
        let (locked_tx, locked_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            assert!(holder.acquire().is_acquired());
            locked_tx.send(()).unwrap();
            done_rx.recv().unwrap();
            holder.release().unwrap();
        });
        locked_rx.recv().unwrap();

        let start = Instant::now();
        assert_eq!(gate.try_acquire_for(Duration::ZERO), Acquire::TryFailed);
        assert!(start.elapsed() < Duration::from_millis(500));

        done_tx.send(()).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn timed_acquire_wakes_on_release() {
        let gate = Arc::new(OwnershipGate::new());
        assert!(gate.acquire().is_acquired());

        let waiter = Arc::clone(&gate);
        let handle = thread::spawn(move || {
            let outcome = waiter.try_acquire_for(Duration::from_secs(10));
            let owned = waiter.owned_by_calling_thread();
            waiter.release().unwrap();
            (outcome, owned)
        });

        thread::sleep(Duration::from_millis(20));
        gate.release().unwrap();
        let (outcome, owned) = handle.join().unwrap();
        assert_eq!(outcome, Acquire::Ok);
        assert!(owned);
    }

    #[test]
    fn timed_acquire_gives_up() {
        let gate = Arc::new(OwnershipGate::new());
        assert!(gate.acquire().is_acquired());
        let other = Arc::clone(&gate);
        let outcome = thread::spawn(move || other.try_acquire_for(Duration::from_millis(30)))
            .join()
            .unwrap();
        assert_eq!(outcome, Acquire::TryFailed);
        gate.release().unwrap();
    }

    #[test]
    fn release_by_non_owner_is_rejected() {
        let gate = Arc::new(OwnershipGate::new());
        assert!(gate.acquire().is_acquired());
        let other = Arc::clone(&gate);
        let result = thread::spawn(move || other.release()).join().unwrap();
        assert!(matches!(result, Err(StereoError::NotOwner)));
        // Still held by this thread.
        assert!(gate.owned_by_calling_thread());
        gate.release().unwrap();
    }

    #[test]
    fn release_of_unowned_gate_is_rejected() {
        let gate = OwnershipGate::new();
        assert!(matches!(gate.release(), Err(StereoError::NotOwner)));
    }

    #[test]
    fn ownership_is_per_thread() {
        let gate = Arc::new(OwnershipGate::new());
        assert!(gate.acquire().is_acquired());
        let other = Arc::clone(&gate);
        let seen = thread::spawn(move || other.owned_by_calling_thread())
            .join()
            .unwrap();
        assert!(!seen);
        gate.release().unwrap();
    }
}
