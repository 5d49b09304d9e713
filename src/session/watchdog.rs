use std::time::Duration;
use tokio::time::Instant;

/// Resettable inactivity deadline
///
/// Holds at most one pending deadline; reset replaces it, so a session
/// with server activity arriving faster than the timeout never fires.
/// `expired` pends forever while disarmed.
#[derive(Debug)]
pub struct InactivityWatchdog {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl InactivityWatchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    /// Start the countdown
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.timeout);
    }

    /// Push the deadline out again; no-op unless armed
    pub fn reset(&mut self) {
        if self.deadline.is_some() {
            self.arm();
        }
    }

    /// Cancel any pending firing
    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolves when the deadline passes; pends forever while disarmed
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => futures::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fired_now(watchdog: &InactivityWatchdog) -> bool {
        // Probes without waiting: expired() wins only if already resolved
        futures::FutureExt::now_or_never(watchdog.expired()).is_some()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_timeout() {
        let mut watchdog = InactivityWatchdog::new(Duration::from_secs(60));
        watchdog.arm();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!fired_now(&watchdog));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(fired_now(&watchdog));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_replaces_pending_deadline() {
        let mut watchdog = InactivityWatchdog::new(Duration::from_secs(60));
        watchdog.arm();

        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(45)).await;
            watchdog.reset();
        }

        // 225s of continuous activity, yet never past a 60s gap
        assert!(!fired_now(&watchdog));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(fired_now(&watchdog));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_never_fires() {
        let watchdog = InactivityWatchdog::new(Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(!fired_now(&watchdog));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_before_arm_is_noop() {
        let mut watchdog = InactivityWatchdog::new(Duration::from_secs(1));
        watchdog.reset();

        assert!(!watchdog.is_armed());
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!fired_now(&watchdog));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_cancels_pending_firing() {
        let mut watchdog = InactivityWatchdog::new(Duration::from_secs(60));
        watchdog.arm();
        watchdog.disarm();

        tokio::time::advance(Duration::from_secs(120)).await;
        assert!(!fired_now(&watchdog));
    }
}
