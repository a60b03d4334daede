use parking_lot::Mutex;
use tokio::sync::watch;

/// State container shared between the action side and the push side.
///
/// Every update runs to completion under a short lock that is never held
/// across an await point, and bumps a version observers can wait on.
#[derive(Debug)]
pub struct SharedState<S> {
    inner: Mutex<S>,
    version: watch::Sender<u64>,
}

impl<S> SharedState<S> {
    pub fn new(state: S) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Mutex::new(state),
            version,
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.lock())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let result = f(&mut self.inner.lock());
        self.version.send_modify(|v| *v = v.wrapping_add(1));
        result
    }

    /// Returns a receiver that observes every update.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_bumps_version() {
        let shared = SharedState::new(0_u32);
        let changes = shared.changes();

        shared.update(|n| *n += 2);
        assert_eq!(shared.read(|n| *n), 2);
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow(), 1);
    }
}
