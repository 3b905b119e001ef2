//! Tracks the one backend call a session may have in flight.
//!
//! A call is either drafting, refining, or synthesizing speech. Starting a
//! second call while one is running is rejected, not queued. Clones share
//! state, so a loading indicator can show which call is running.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Kind of backend call in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Drafting,
    Refining,
    Synthesizing,
}

impl Task {
    /// Loading text shown while the call runs.
    pub fn label(self) -> &'static str {
        match self {
            Task::Drafting => "Drafting your message...",
            Task::Refining => "Refining...",
            Task::Synthesizing => "Generating audio...",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone)]
pub struct InFlightGate {
    semaphore: Arc<Semaphore>,
    current: Arc<Mutex<Option<Task>>>,
}

/// Held for the duration of one call; releases the gate on drop.
pub struct InFlight {
    current: Arc<Mutex<Option<Task>>>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = current.take() {
            debug!(?task, "call finished");
        }
    }
}

impl InFlightGate {
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Mark `task` as running. `None` while another call is in flight.
    pub fn begin(&self, task: Task) -> Option<InFlight> {
        let permit = self.semaphore.clone().try_acquire_owned().ok()?;
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        Some(InFlight {
            current: Arc::clone(&self.current),
            _permit: permit,
        })
    }

    /// The call currently running, if any.
    pub fn current(&self) -> Option<Task> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_busy(&self) -> bool {
        self.semaphore.available_permits() == 0
    }
}

impl Default for InFlightGate {
    fn default() -> Self {
        Self::new()
    }
}
