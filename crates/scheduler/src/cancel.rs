//! Cancellation token for scheduling runs
//!
//! Workers check the token between tiles and stop requesting work once it is
//! set. A tile already in progress always runs to completion.

use std::io;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Shared cancellation flag
///
/// Clones share the same underlying state. Once cancelled, a token stays
/// cancelled; there is no way to reset it.
///
/// # Example
///
/// ```
/// use raster_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let controller = token.clone();
///
/// controller.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token in the non-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    ///
    /// Visible to every clone. Calling it more than once has no further effect.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` if `cancel()` has been called on this token or any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Cancel this token once `timeout` elapses, unless the returned
    /// [`Watchdog`] is disarmed or dropped first.
    ///
    /// # Errors
    ///
    /// Fails if the watchdog thread cannot be spawned.
    pub fn cancel_after(&self, timeout: Duration) -> io::Result<Watchdog> {
        let (disarm, armed) = mpsc::channel::<()>();
        let token = self.clone();
        let thread = thread::Builder::new()
            .name("raster-watchdog".to_string())
            .spawn(move || {
                if let Err(mpsc::RecvTimeoutError::Timeout) = armed.recv_timeout(timeout) {
                    log::debug!("deadline of {:?} reached, cancelling", timeout);
                    token.cancel();
                }
            })?;

        Ok(Watchdog {
            disarm: Some(disarm),
            thread: Some(thread),
        })
    }
}

/// Deadline timer created by [`CancellationToken::cancel_after`].
#[derive(Debug)]
pub struct Watchdog {
    disarm: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Stop the timer without cancelling the token.
    pub fn disarm(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Dropping the sender wakes the timer thread early.
        self.disarm.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}
