//! Local Window Store
//!
//! In-process fixed-window counters used when the fast tier cannot be
//! reached. Counts are per process; several instances each keep their own
//! window for the same key.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::clock::SharedClock;

/// Count and end of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    pub count: u64,
    /// Window end (Unix milliseconds)
    pub reset_at_ms: u64,
}

// == Local Window Store ==
#[derive(Debug)]
pub struct LocalWindowStore {
    windows: DashMap<String, WindowCount>,
    clock: SharedClock,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl LocalWindowStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            windows: DashMap::new(),
            clock,
            sweeper: Mutex::new(None),
        }
    }

    // == Increment ==
    /// Counts one request against `key`, opening a fresh window of `window`
    /// length when none is open.
    ///
    /// The map entry stays locked for the whole read-modify-write, so
    /// concurrent increments of one key never lose updates.
    pub fn increment_and_get(&self, key: &str, window: Duration) -> WindowCount {
        let now = self.clock.now_ms();
        let fresh = WindowCount {
            count: 0,
            reset_at_ms: now.saturating_add(window.as_millis() as u64),
        };

        let mut entry = self.windows.entry(key.to_string()).or_insert(fresh);
        if entry.reset_at_ms <= now {
            *entry = fresh;
        }
        entry.count += 1;
        *entry
    }

    // == Sweep ==
    /// Drops every window that has ended, returning how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.windows.len();
        self.windows.retain(|_, window| window.reset_at_ms > now);
        before.saturating_sub(self.windows.len())
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    // == Lifecycle ==
    /// Starts sweeping every `every`. A running sweep is replaced.
    ///
    /// The task holds only a weak reference and ends on its own once the
    /// store is dropped.
    pub fn start(self: &Arc<Self>, every: Duration) {
        let store: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            info!("Starting rate window sweep with interval of {:?}", every);

            loop {
                tokio::time::sleep(every).await;

                let Some(live) = store.upgrade() else {
                    break;
                };
                let removed = live.sweep();
                if removed > 0 {
                    info!("Rate window sweep: removed {} ended windows", removed);
                } else {
                    debug!("Rate window sweep: no ended windows");
                }
            }
        });

        if let Some(previous) = self.lock_sweeper().replace(handle) {
            previous.abort();
        }
    }

    /// Stops the sweep task if one is running.
    pub fn stop(&self) {
        if let Some(handle) = self.lock_sweeper().take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_sweeper()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn lock_sweeper(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.sweeper
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for LocalWindowStore {
    fn drop(&mut self) {
        self.stop();
    }
}
