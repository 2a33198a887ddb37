//! Process-wide service state: the activation flag and the debug level.
//!
//! A `ProcessState` is cheap to clone; every clone observes the same flag.
//! Signal handlers capture a clone, so the flag must only ever be touched
//! through atomics.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Debug level used until the command line says otherwise
pub const DEFAULT_DEBUG_LEVEL: u32 = 4;

#[derive(Debug)]
struct StateInner {
    active: AtomicBool,
    debug_level: AtomicU32,
}

/// Shared activation flag and verbosity
#[derive(Debug, Clone)]
pub struct ProcessState {
    inner: Arc<StateInner>,
}

impl ProcessState {
    /// Inactive state with the default debug level
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StateInner {
                active: AtomicBool::new(false),
                debug_level: AtomicU32::new(DEFAULT_DEBUG_LEVEL),
            }),
        }
    }

    /// True while the service should keep accepting connections
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Relaxed)
    }

    /// Mark the service as running
    pub fn activate(&self) {
        self.inner.active.store(true, Ordering::SeqCst);
    }

    /// Ask the accept loop to stop. Async-signal-safe.
    pub fn deactivate(&self) {
        self.inner.active.store(false, Ordering::SeqCst);
    }

    /// Current debug verbosity
    pub fn debug_level(&self) -> u32 {
        self.inner.debug_level.load(Ordering::Relaxed)
    }

    /// Set the debug verbosity; negative levels clamp to zero
    pub fn set_debug_level(&self, level: i64) {
        let level = level.clamp(0, i64::from(u32::MAX)) as u32;
        self.inner.debug_level.store(level, Ordering::Relaxed);
    }
}

impl Default for ProcessState {
    fn default() -> Self {
        Self::new()
    }
}
