use tokio::task::JoinHandle;

/// Slot holding the single pending auto-play timer of a view
///
/// The timer task records the presentation epoch it was armed for. When it
/// fires it releases itself from the slot before advancing, so a later
/// `cancel` never aborts an advance that is already under way.
#[derive(Debug, Default)]
pub(crate) struct AutoPlayTimer {
    pending: Option<(u64, JoinHandle<()>)>,
}

impl AutoPlayTimer {
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Replace any pending timer with `handle`
    pub fn arm(&mut self, epoch: u64, handle: JoinHandle<()>) {
        self.cancel();
        self.pending = Some((epoch, handle));
    }

    /// Abort the pending timer; returns true if one was pending
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Detach the pending timer if it was armed for `epoch`
    pub fn release(&mut self, epoch: u64) -> bool {
        match &self.pending {
            Some((armed, _)) if *armed == epoch => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}

impl Drop for AutoPlayTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_rearm_aborts_previous() {
        let fired = Arc::new(AtomicBool::new(false));
        let mut timer = AutoPlayTimer::default();

        let flag = Arc::clone(&fired);
        timer.arm(
            1,
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                flag.store(true, Ordering::SeqCst);
            }),
        );
        timer.arm(2, tokio::spawn(async {}));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert!(timer.is_armed());
    }

    #[tokio::test]
    async fn test_release_only_matching_epoch() {
        let mut timer = AutoPlayTimer::default();
        timer.arm(3, tokio::spawn(async {}));

        assert!(!timer.release(2));
        assert!(timer.is_armed());
        assert!(timer.release(3));
        assert!(!timer.is_armed());
        assert!(!timer.cancel());
    }
}
