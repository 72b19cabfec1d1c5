//! Shared online/offline flag.

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether the device currently believes it has network access.
///
/// Set by whoever observes connectivity (the platform, the CLI's
/// `--offline` switch) and read by the resolver on each lookup.
#[derive(Debug)]
pub struct Connectivity {
    online: AtomicBool,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    /// Update the flag, logging transitions.
    pub fn set_online(&self, online: bool) {
        let was = self.online.swap(online, Ordering::Relaxed);
        if was != online {
            if online {
                tracing::info!("Network available");
            } else {
                tracing::warn!("Network unavailable, using cached limits");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let c = Connectivity::default();
        assert!(c.is_online());
        c.set_online(false);
        assert!(!c.is_online());
        c.set_online(true);
        assert!(c.is_online());
    }
}
