//! Polling
//!
//! Cancellable fixed-delay polling against the operator service. The
//! `Poller` owns the loop lifecycle (an atomic running flag plus an
//! abortable task handle) so callers can stop in-flight polling
//! deterministically instead of leaking timers.

pub mod activation;
pub mod stop_all;

pub use activation::{ActivationSession, ActivationView};
pub use stop_all::{stop_all_and_wait, wait_for_all_stopped};

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

/// What a poll tick decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Stop,
}

/// Cancellable fixed-delay poll loop.
pub struct Poller {
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the loop: wait `initial_delay`, then run `tick` every
    /// `interval` until it returns [`Tick::Stop`] or [`cancel`] is
    /// called. Starting while already running is a no-op.
    ///
    /// [`cancel`]: Poller::cancel
    pub fn start<F, Fut>(&self, initial_delay: Duration, interval: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Tick> + Send,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let running = Arc::clone(&self.running);
        let handle = tokio::spawn(async move {
            sleep(initial_delay).await;
            loop {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                if tick().await == Tick::Stop {
                    running.store(false, Ordering::SeqCst);
                    break;
                }
                sleep(interval).await;
            }
        });

        *self.handle.lock().unwrap() = Some(handle);
    }

    /// Stop the loop. Safe to call at any time, from any task.
    pub fn cancel(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test(start_paused = true)]
    async fn test_poller_runs_until_stop() {
        let poller = Poller::new();
        let ticks = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&ticks);
        poller.start(
            Duration::from_secs(1),
            Duration::from_secs(2),
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n >= 3 {
                        Tick::Stop
                    } else {
                        Tick::Continue
                    }
                }
            },
        );

        // 1s initial delay + two 2s intervals, plus slack.
        sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(!poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_the_loop() {
        let poller = Poller::new();
        let ticks = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&ticks);
        poller.start(Duration::ZERO, Duration::from_secs(1), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Tick::Continue
            }
        });

        sleep(Duration::from_secs(3)).await;
        poller.cancel();
        let after_cancel = ticks.load(Ordering::SeqCst);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_cancel);
        assert!(!poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_running_is_a_noop() {
        let poller = Poller::new();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&first);
        poller.start(Duration::ZERO, Duration::from_secs(1), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Tick::Continue
            }
        });

        let counter = Arc::clone(&second);
        poller.start(Duration::ZERO, Duration::from_secs(1), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Tick::Continue
            }
        });

        sleep(Duration::from_secs(3)).await;
        poller.cancel();
        assert!(first.load(Ordering::SeqCst) > 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }
}
