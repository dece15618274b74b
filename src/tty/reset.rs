//! Process-wide terminal reset guard
//!
//! Every live [`TtyHandle`](super::TtyHandle) holds a lease on the one
//! [`ResetGuard`] of its registry. The guard is created by the first lease and
//! restores the default terminal mode when the last lease is released:
//!
//! ```text
//! NoInstance ──acquire──► Live(1) ──acquire──► Live(n+1)
//!     ▲                      │                    │
//!     └──release (reset)────┘ ◄──release──────────┘
//! ```
//!
//! Leases are taken and released under the registry lock, so the last-holder
//! check and the reset cannot interleave with a new acquisition.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info, warn};

use super::driver::TtyDriver;

/// Restores the terminal mode when dropped.
///
/// Holds no reference back to any handle. Never constructed directly; see
/// [`GuardRegistry`].
#[derive(Debug)]
pub struct ResetGuard {
    driver: Arc<dyn TtyDriver>,
}

impl Drop for ResetGuard {
    fn drop(&mut self) {
        info!("Last tty handle released, resetting terminal mode");
        if let Err(e) = self.driver.reset_mode() {
            warn!("Terminal mode reset failed: {}", e);
        }
    }
}

/// Owner of the weak slot pointing at the live [`ResetGuard`], if any
#[derive(Debug)]
pub struct GuardRegistry {
    live: Mutex<Weak<ResetGuard>>,
    lifecycles: AtomicUsize,
}

impl Default for GuardRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardRegistry {
    pub const fn new() -> Self {
        Self {
            live: Mutex::new(Weak::new()),
            lifecycles: AtomicUsize::new(0),
        }
    }

    /// The registry shared by every handle in the process
    pub fn global() -> &'static GuardRegistry {
        static GLOBAL: GuardRegistry = GuardRegistry::new();
        &GLOBAL
    }

    fn slot(&self) -> MutexGuard<'_, Weak<ResetGuard>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach to the live guard, creating it if none exists.
    pub(crate) fn acquire(&'static self, driver: &Arc<dyn TtyDriver>) -> GuardLease {
        let mut slot = self.slot();
        let guard = match slot.upgrade() {
            Some(guard) => guard,
            None => {
                let guard = Arc::new(ResetGuard {
                    driver: Arc::clone(driver),
                });
                *slot = Arc::downgrade(&guard);
                self.lifecycles.fetch_add(1, Ordering::SeqCst);
                debug!("Created terminal reset guard");
                guard
            }
        };
        debug!("Reset guard acquired ({} holders)", Arc::strong_count(&guard));

        GuardLease {
            registry: self,
            guard: Some(guard),
        }
    }

    /// Number of live leases on the current guard
    pub fn holders(&self) -> usize {
        self.slot().strong_count()
    }

    pub fn is_live(&self) -> bool {
        self.holders() > 0
    }

    /// How many guards this registry has created so far
    pub fn lifecycles(&self) -> usize {
        self.lifecycles.load(Ordering::SeqCst)
    }
}

/// A handle's share of the [`ResetGuard`]
#[derive(Debug)]
pub(crate) struct GuardLease {
    registry: &'static GuardRegistry,
    guard: Option<Arc<ResetGuard>>,
}

impl Drop for GuardLease {
    fn drop(&mut self) {
        let _slot = self.registry.slot();
        // The guard's own Drop runs here, inside the lock, if this was the last lease
        drop(self.guard.take());
    }
}
