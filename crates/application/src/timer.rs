use std::time::Instant;

/// Identifies one scheduled callback so it can be cancelled before it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Pending<T> {
    handle: TimerHandle,
    due: Instant,
    payload: T,
}

/// Deadline queue polled by the host event loop. Nothing fires on its own:
/// the owner calls [`Timers::pop_due`] with the current time.
#[derive(Debug)]
pub struct Timers<T> {
    next_id: u64,
    pending: Vec<Pending<T>>,
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
        }
    }
}

impl<T> Timers<T> {
    pub fn schedule(&mut self, due: Instant, payload: T) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            handle,
            due,
            payload,
        });
        handle
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.handle != handle);
        self.pending.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|p| p.due).min()
    }

    /// Removes and returns the earliest timer due at or before `now`.
    /// Timers with equal deadlines fire in scheduling order.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerHandle, T)> {
        let pos = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= now)
            .min_by_key(|(_, p)| (p.due, p.handle))
            .map(|(pos, _)| pos)?;
        let pending = self.pending.remove(pos);
        Some((pending.handle, pending.payload))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn pops_in_deadline_order() {
        let t0 = Instant::now();
        let mut timers = Timers::default();
        timers.schedule(t0 + Duration::from_millis(900), "settle");
        timers.schedule(t0 + Duration::from_millis(450), "commit");

        assert_eq!(timers.next_deadline(), Some(t0 + Duration::from_millis(450)));
        assert!(timers.pop_due(t0).is_none());

        let later = t0 + Duration::from_secs(1);
        assert_eq!(timers.pop_due(later).map(|(_, p)| p), Some("commit"));
        assert_eq!(timers.pop_due(later).map(|(_, p)| p), Some("settle"));
        assert!(timers.is_empty());
    }

    #[test]
    fn equal_deadlines_keep_schedule_order() {
        let t0 = Instant::now();
        let mut timers = Timers::default();
        timers.schedule(t0, 1);
        timers.schedule(t0, 2);
        assert_eq!(timers.pop_due(t0).map(|(_, p)| p), Some(1));
        assert_eq!(timers.pop_due(t0).map(|(_, p)| p), Some(2));
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let t0 = Instant::now();
        let mut timers = Timers::default();
        let a = timers.schedule(t0, 'a');
        timers.schedule(t0, 'b');
        assert!(timers.cancel(a));
        assert!(!timers.cancel(a));
        assert_eq!(timers.pop_due(t0).map(|(_, p)| p), Some('b'));

        let c = timers.schedule(t0, 'c');
        assert!(timers.cancel(c));
        assert!(timers.pop_due(t0).is_none());
        assert_eq!(timers.next_deadline(), None);
    }
}
