use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A shutdown signal shared between the render loop and the refresher threads.
///
/// Cloning the token hands out another reference to the same signal. Waiting on it is a
/// timed wait that returns early the moment any clone calls [`cancel`](Self::cancel).
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        *cancelled = true;
        self.inner.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Block for at most `timeout`. Returns `true` if the token is cancelled, either before
    /// the call or while waiting.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut cancelled = self.inner.cancelled.lock();
        if !*cancelled {
            self.inner
                .condvar
                .wait_while_for(&mut cancelled, |cancelled| !*cancelled, timeout);
        }
        *cancelled
    }
}
