//! Presentation deadline monitoring.
//!
//! A marker is armed with a name and a timeout just before the
//! presentation calls go out and reset once they have been flushed.
//! `reset()` reports whether the deadline passed in between. Nothing is
//! aborted: a miss surfaces after the fact in the submit result.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Arms and checks a named deadline.
pub trait DeadlineMarker: Send {
    /// Start timing `name`, replacing any marker already armed.
    fn arm(&mut self, name: &str, timeout: Duration);

    /// Disarm and return whether the armed marker (if any) had expired.
    fn reset(&mut self) -> bool;
}

#[derive(Debug, Clone)]
struct Armed {
    name: String,
    at: Instant,
    timeout: Duration,
}

impl Armed {
    fn expired(&self) -> bool {
        self.at.elapsed() > self.timeout
    }
}

/// Wall-clock [`DeadlineMarker`] backed by [`Instant`].
#[derive(Debug, Default)]
pub struct InstantDeadline {
    armed: Option<Armed>,
    /// An armed marker was replaced by `arm` after it had already expired.
    carried_miss: bool,
    misses: u64,
    last_elapsed: Option<Duration>,
}

impl InstantDeadline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of misses reported by `reset` so far.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Time between the last `arm` and the `reset` that followed it.
    pub fn last_elapsed(&self) -> Option<Duration> {
        self.last_elapsed
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}

impl DeadlineMarker for InstantDeadline {
    fn arm(&mut self, name: &str, timeout: Duration) {
        if let Some(previous) = self.armed.take() {
            if previous.expired() {
                warn!(marker = %previous.name, "deadline marker re-armed after expiring");
                self.carried_miss = true;
            }
        }
        self.armed = Some(Armed {
            name: name.to_owned(),
            at: Instant::now(),
            timeout,
        });
    }

    fn reset(&mut self) -> bool {
        let carried = std::mem::take(&mut self.carried_miss);
        let Some(armed) = self.armed.take() else {
            return carried;
        };

        let elapsed = armed.at.elapsed();
        self.last_elapsed = Some(elapsed);
        let missed = carried || elapsed > armed.timeout;
        if missed {
            self.misses += 1;
            warn!(
                marker = %armed.name,
                elapsed_us = elapsed.as_micros() as u64,
                deadline_us = armed.timeout.as_micros() as u64,
                "presentation deadline missed"
            );
        } else {
            debug!(marker = %armed.name, elapsed_us = elapsed.as_micros() as u64, "deadline met");
        }
        missed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn reset_without_arm_reports_nothing() {
        let mut marker = InstantDeadline::new();
        assert!(!marker.reset());
        assert_eq!(marker.misses(), 0);
        assert!(marker.last_elapsed().is_none());
    }

    #[test]
    fn met_deadline() {
        let mut marker = InstantDeadline::new();
        marker.arm("frame", Duration::from_secs(5));
        assert!(marker.is_armed());
        assert!(!marker.reset());
        assert!(!marker.is_armed());
        assert!(marker.last_elapsed().is_some());
    }

    #[test]
    fn missed_deadline_is_counted() {
        let mut marker = InstantDeadline::new();
        marker.arm("frame", Duration::from_millis(1));
        thread::sleep(Duration::from_millis(10));
        assert!(marker.reset());
        assert_eq!(marker.misses(), 1);
        // Disarmed: a second reset has nothing to report.
        assert!(!marker.reset());
    }

    #[test]
    fn rearming_an_expired_marker_carries_the_miss() {
        let mut marker = InstantDeadline::new();
        marker.arm("first", Duration::from_millis(1));
        thread::sleep(Duration::from_millis(10));
        marker.arm("second", Duration::from_secs(5));
        assert!(marker.reset());
        assert_eq!(marker.misses(), 1);
    }
}
