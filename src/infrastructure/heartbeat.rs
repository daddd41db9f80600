use crate::types::constants::HEARTBEAT_INTERVAL;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Result of a single heartbeat tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatStatus {
    /// Heartbeat queued, keep going
    Sent,
    /// Previous heartbeat was never answered
    TimedOut,
    /// Connection went away, stop ticking
    Stopped,
}

/// Tracks the ref of the last heartbeat awaiting a reply
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingHeartbeat(Option<String>);

impl PendingHeartbeat {
    /// Records a new outgoing heartbeat. Returns `false` without recording
    /// if the previous one is still unanswered.
    pub fn begin(&mut self, r#ref: String) -> bool {
        if self.0.is_some() {
            return false;
        }
        self.0 = Some(r#ref);
        true
    }

    /// Clears the pending ref if `r#ref` answers it
    pub fn acknowledge(&mut self, r#ref: &str) -> bool {
        if self.0.as_deref() == Some(r#ref) {
            self.0 = None;
            return true;
        }
        false
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn is_pending(&self) -> bool {
        self.0.is_some()
    }
}

/// Drives periodic keepalives for one live connection
pub struct HeartbeatManager {
    interval: Duration,
}

impl HeartbeatManager {
    pub fn new() -> Self {
        Self {
            interval: Duration::from_millis(HEARTBEAT_INTERVAL),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Calls `beat` once per interval until it reports anything but `Sent`.
    /// The first beat fires one full interval after start.
    pub async fn run<F>(self, mut beat: F) -> HeartbeatStatus
    where
        F: FnMut() -> HeartbeatStatus,
    {
        let mut interval_timer = time::interval_at(Instant::now() + self.interval, self.interval);
        interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval_timer.tick().await;
            match beat() {
                HeartbeatStatus::Sent => continue,
                status => {
                    tracing::debug!("Heartbeat loop finished: {:?}", status);
                    return status;
                }
            }
        }
    }
}

impl Default for HeartbeatManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_heartbeat_detects_missed_reply() {
        let mut pending = PendingHeartbeat::default();
        assert!(pending.begin("1".into()));
        assert!(!pending.begin("2".into()));

        assert!(!pending.acknowledge("2"));
        assert!(pending.acknowledge("1"));
        assert!(!pending.is_pending());
        assert!(pending.begin("3".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_timeout() {
        let started = Instant::now();
        let mut ticks = 0;
        let status = HeartbeatManager::new()
            .with_interval(Duration::from_secs(10))
            .run(|| {
                ticks += 1;
                if ticks < 3 {
                    HeartbeatStatus::Sent
                } else {
                    HeartbeatStatus::TimedOut
                }
            })
            .await;

        assert_eq!(status, HeartbeatStatus::TimedOut);
        assert_eq!(ticks, 3);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }
}
