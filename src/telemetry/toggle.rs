use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

/// On/off switch gating emission. Read on every emission, written rarely.
#[derive(Debug)]
pub struct Toggle {
    enabled: AtomicBool,
}

impl Toggle {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        let previous = self.enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            debug!(enabled, "profiling toggled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl Default for Toggle {
    fn default() -> Self {
        Self::new(false)
    }
}
