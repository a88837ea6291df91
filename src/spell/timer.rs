//! Deterministic deferred actions.
//!
//! The game never touches wall-clock timers directly. Anything that should happen "later"
//! (clearing a shake, revealing the next letter, emitting a word's result) is scheduled on a
//! [`Timeline`], and the host moves time forward explicitly. Tests advance by exact amounts;
//! the terminal host advances by measured elapsed time.

/// Handle for cancelling a scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Scheduled<E> {
    id: TimerId,
    due_ms: u64,
    event: E,
}

/// Virtual clock plus the events waiting on it.
#[derive(Debug)]
pub struct Timeline<E> {
    now_ms: u64,
    next_id: u64,
    pending: Vec<Scheduled<E>>,
}

impl<E> Default for Timeline<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Timeline<E> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_id: 0,
            pending: Vec::new(),
        }
    }

    /// Milliseconds elapsed since the timeline was created.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Fire `event` once `delay_ms` has elapsed from now.
    pub fn schedule(&mut self, delay_ms: u64, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(Scheduled {
            id,
            due_ms: self.now_ms.saturating_add(delay_ms),
            event,
        });
        id
    }

    /// Drop a pending event. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|s| s.id != id);
        self.pending.len() != before
    }

    /// Drop every pending event.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Milliseconds until the earliest pending event, if any.
    pub fn until_next(&self) -> Option<u64> {
        self.pending
            .iter()
            .map(|s| s.due_ms.saturating_sub(self.now_ms))
            .min()
    }

    /// Pop the earliest event due at or before `deadline_ms`, moving the clock to its due
    /// time. Events due at the same instant fire in scheduling order.
    pub fn pop_due(&mut self, deadline_ms: u64) -> Option<E> {
        let (index, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, s)| s.due_ms <= deadline_ms)
            .min_by_key(|(_, s)| (s.due_ms, s.id.0))?;
        let scheduled = self.pending.remove(index);
        self.now_ms = self.now_ms.max(scheduled.due_ms);
        Some(scheduled.event)
    }

    /// Move the clock to `deadline_ms` once nothing else is due before it.
    pub fn settle_at(&mut self, deadline_ms: u64) {
        self.now_ms = self.now_ms.max(deadline_ms);
    }

    /// Advance by `ms`, returning every event that came due, in firing order.
    pub fn advance(&mut self, ms: u64) -> Vec<E> {
        let deadline = self.now_ms.saturating_add(ms);
        let mut fired = Vec::new();
        while let Some(event) = self.pop_due(deadline) {
            fired.push(event);
        }
        self.settle_at(deadline);
        fired
    }
}
