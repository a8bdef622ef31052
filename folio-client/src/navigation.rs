//! Navigation side effects and the post-logout countdown

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

/// Something that can move the user to another route
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Navigator that only records the transition in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, path: &str) {
        info!("Navigating to {}", path);
    }
}

/// Countdown shown on the waiting page after logout.
///
/// Starts at `seconds`, decrements once per second and navigates to the home
/// route when it reaches zero. Cancelling or dropping the countdown aborts the
/// timer, so a redirect never fires after the page is gone.
#[derive(Debug)]
pub struct LogoutCountdown {
    remaining: watch::Receiver<u32>,
    task: JoinHandle<()>,
}

impl LogoutCountdown {
    /// Must be called from within a tokio runtime
    pub fn start(seconds: u32, home_path: impl Into<String>, navigator: Arc<dyn Navigator>) -> Self {
        let home_path = home_path.into();
        let (tx, remaining) = watch::channel(seconds);

        let task = tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut ticker = interval_at(Instant::now() + period, period);
            let mut count = seconds;

            while count > 0 {
                ticker.tick().await;
                count -= 1;
                tx.send_replace(count);
                debug!("Logout redirect in {}s", count);
            }

            navigator.navigate(&home_path);
        });

        Self { remaining, task }
    }

    /// Seconds left before the redirect
    pub fn remaining(&self) -> u32 {
        *self.remaining.borrow()
    }

    /// Receiver for rendering the countdown as it changes
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.remaining.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the redirect has happened
    pub async fn wait(mut self) {
        // The task only ends by finishing or by abort, and abort only happens
        // through cancel/drop which consume or outlive `self`.
        let _ = (&mut self.task).await;
    }

    pub fn cancel(self) {
        // Drop does the abort
    }
}

impl Drop for LogoutCountdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}
