//! Timer queue for the reconciliation loop
//!
//! All waits in the loop - bounded element waits, settle delays, the
//! refresh debounce window, reinitialization back-off - are entries here,
//! keyed by cancellable ids the engine keeps in its context. Scheduling a
//! replacement cancels the prior handle (last-write-wins), which is how
//! the debounce window collapses bursts.

/// Handle for a scheduled action
pub type TimerId = u64;

/// What runs when the overlay fade-out completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterFade {
    /// Detach and rebuild immediately (title refresh path)
    Rebuild,
    /// Detach, then wait out the navigation settle before re-rendering
    SettleNavigation,
}

/// Deferred engine actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Bounded wait for the current initialization stage expired
    InitDeadline,
    /// Post-video settle delay elapsed; finish initialization
    InitSettled,
    /// Back-off elapsed; re-run initialization
    Reinitialize,
    /// Debounce window closed; refresh the overlay
    Refresh,
    /// Reveal the freshly inserted overlay
    FadeIn,
    /// Fade-out finished
    FadeOutDone(AfterFade),
    /// New page content had time to mount; re-render
    NavigationSettled,
}

#[derive(Debug, Clone)]
struct TimerEntry {
    id: TimerId,
    deadline: u64,
    action: TimerAction,
}

/// Deadline-ordered action queue driven by an external clock
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: TimerId,
    entries: Vec<TimerEntry>,
}

impl TimerQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an action `delay` milliseconds after `now`
    pub fn schedule(&mut self, now: u64, delay: u64, action: TimerAction) -> TimerId {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.push(TimerEntry {
            id,
            deadline: now.saturating_add(delay),
            action,
        });
        id
    }

    /// Schedule an action, cancelling the handle it replaces
    pub fn schedule_replacing(
        &mut self,
        now: u64,
        delay: u64,
        action: TimerAction,
        handle: &mut Option<TimerId>,
    ) -> TimerId {
        if let Some(prior) = handle.take() {
            self.cancel(prior);
        }
        let id = self.schedule(now, delay, action);
        *handle = Some(id);
        id
    }

    /// Cancel a scheduled action
    pub fn cancel(&mut self, id: TimerId) {
        self.entries.retain(|e| e.id != id);
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<u64> {
        self.entries.iter().map(|e| e.deadline).min()
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return every action due at `now`, in deadline order
    pub fn pop_due(&mut self, now: u64) -> Vec<(TimerId, TimerAction)> {
        let mut due: Vec<TimerEntry> = Vec::new();
        self.entries.retain(|e| {
            if e.deadline <= now {
                due.push(e.clone());
                false
            } else {
                true
            }
        });
        due.sort_by_key(|e| (e.deadline, e.id));
        due.into_iter().map(|e| (e.id, e.action)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_and_pop_in_deadline_order() {
        let mut queue = TimerQueue::new();
        queue.schedule(0, 800, TimerAction::Refresh);
        queue.schedule(0, 300, TimerAction::NavigationSettled);
        queue.schedule(0, 1000, TimerAction::Reinitialize);

        assert_eq!(queue.next_deadline(), Some(300));
        let due = queue.pop_due(900);
        let actions: Vec<_> = due.iter().map(|(_, a)| *a).collect();
        assert_eq!(actions, vec![TimerAction::NavigationSettled, TimerAction::Refresh]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_pop_due_ignores_future_entries() {
        let mut queue = TimerQueue::new();
        queue.schedule(100, 500, TimerAction::FadeIn);
        assert!(queue.pop_due(599).is_empty());
        assert_eq!(queue.pop_due(600).len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cancel_removes_entry() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule(0, 800, TimerAction::Refresh);
        queue.cancel(id);
        assert!(queue.pop_due(u64::MAX).is_empty());
    }

    #[test]
    fn test_schedule_replacing_cancels_prior() {
        let mut queue = TimerQueue::new();
        let mut handle = None;
        queue.schedule_replacing(0, 800, TimerAction::Refresh, &mut handle);
        queue.schedule_replacing(500, 800, TimerAction::Refresh, &mut handle);

        // Only the second survives; it fires at 1300, not 800
        assert!(queue.pop_due(800).is_empty());
        let due = queue.pop_due(1300);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].1, TimerAction::Refresh);
        assert_eq!(Some(due[0].0), handle);
    }

    #[test]
    fn test_same_deadline_keeps_schedule_order() {
        let mut queue = TimerQueue::new();
        queue.schedule(0, 100, TimerAction::FadeIn);
        queue.schedule(0, 100, TimerAction::Refresh);
        let due = queue.pop_due(100);
        assert_eq!(due[0].1, TimerAction::FadeIn);
        assert_eq!(due[1].1, TimerAction::Refresh);
    }
}
