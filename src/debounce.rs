use std::time::{Duration, Instant};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Holds at most one delayed action until its quiet period has passed.
///
/// Nothing runs on its own: the owner polls [`DebounceScheduler::take_due`]
/// from its event loop. Scheduling again replaces whatever was pending.
#[derive(Debug)]
pub struct DebounceScheduler<A> {
    interval: Duration,
    pending: Option<(A, Instant)>,
}

impl<A> DebounceScheduler<A> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn schedule(&mut self, action: A) {
        self.schedule_after(self.interval, action);
    }

    pub fn schedule_after(&mut self, delay: Duration, action: A) {
        self.schedule_at(Instant::now(), delay, action);
    }

    pub fn schedule_at(&mut self, now: Instant, delay: Duration, action: A) {
        self.pending = Some((action, now + delay));
    }

    pub fn cancel_pending(&mut self) -> Option<A> {
        self.pending.take().map(|(action, _)| action)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Hands back the pending action once `now` reaches its deadline.
    pub fn take_due(&mut self, now: Instant) -> Option<A> {
        let (_, deadline) = self.pending.as_ref()?;
        if now < *deadline {
            return None;
        }
        self.pending.take().map(|(action, _)| action)
    }
}

impl<A> Default for DebounceScheduler<A> {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_for_quiet_period() {
        let start = Instant::now();
        let mut debounce = DebounceScheduler::new(Duration::from_millis(100));
        debounce.schedule_at(start, debounce.interval(), "cats");

        assert!(debounce.take_due(start + Duration::from_millis(50)).is_none());
        assert_eq!(
            debounce.take_due(start + Duration::from_millis(100)),
            Some("cats")
        );
        assert!(!debounce.is_pending());
    }

    #[test]
    fn rescheduling_replaces_pending_action() {
        let start = Instant::now();
        let mut debounce = DebounceScheduler::new(Duration::from_millis(100));
        debounce.schedule_at(start, debounce.interval(), "c");
        debounce.schedule_at(start + Duration::from_millis(20), debounce.interval(), "ca");

        assert!(debounce.take_due(start + Duration::from_millis(110)).is_none());
        assert_eq!(
            debounce.take_due(start + Duration::from_millis(120)),
            Some("ca")
        );
        assert!(debounce.take_due(start + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn cancel_drops_pending_action() {
        let start = Instant::now();
        let mut debounce = DebounceScheduler::default();
        debounce.schedule_at(start, Duration::ZERO, 7);
        assert_eq!(debounce.cancel_pending(), Some(7));
        assert!(debounce.take_due(start + Duration::from_secs(1)).is_none());
        assert_eq!(debounce.deadline(), None);
    }
}
