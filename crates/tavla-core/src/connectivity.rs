//! Connectivity gate for remote-mutating operations

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Reports whether the device currently has network reachability.
///
/// Implementations must answer from already-known state: the check runs
/// before every remote mutation and must never block or perform I/O itself.
pub trait Connectivity: Send + Sync {
    /// Current reachability
    fn is_online(&self) -> bool;

    /// Fail with [`Error::Offline`] when there is no connection
    fn ensure_online(&self) -> Result<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(Error::Offline)
        }
    }
}

/// Shared connectivity flag maintained by the embedding application.
///
/// The app flips it from whatever reachability signal its platform provides
/// (or a user-facing offline switch); the sync layer only ever reads it.
#[derive(Debug, Clone)]
pub struct NetworkStatus {
    online: Arc<AtomicBool>,
}

impl NetworkStatus {
    /// Create a status flag with the given initial reachability
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    /// Record a reachability change
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for NetworkStatus {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_online_passes_when_connected() {
        let status = NetworkStatus::new(true);
        assert!(status.ensure_online().is_ok());
    }

    #[test]
    fn ensure_online_raises_typed_error_when_disconnected() {
        let status = NetworkStatus::new(false);
        assert!(matches!(status.ensure_online(), Err(Error::Offline)));

        status.set_online(true);
        assert!(status.ensure_online().is_ok());
    }
}
