//! Delayed update queue for redstone components.
//!
//! Delays are counted in redstone ticks (one world-logic tick, ~100 ms).
//! Every call to [`UpdateScheduler::advance`] subtracts the elapsed ticks from
//! every pending entry and hands back the positions whose delay ran out.

use serde::{Deserialize, Serialize};

use crate::position::BlockPos;

/// A pending update for the component at `pos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpdate {
    pub pos: BlockPos,
    /// Ticks left before the update fires.
    pub remaining: u64,
}

/// FIFO list of pending updates.
#[derive(Debug, Clone, Default)]
pub struct UpdateScheduler {
    queue: Vec<PendingUpdate>,
}

impl UpdateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an update at `pos` to fire after `delay` ticks.
    ///
    /// A zero delay fires on the next [`advance`](Self::advance), even one of
    /// zero elapsed ticks. Duplicate positions are kept.
    pub fn schedule(&mut self, pos: BlockPos, delay: u64) {
        self.queue.push(PendingUpdate {
            pos,
            remaining: delay,
        });
    }

    /// Count down every entry by `elapsed` and return the ones that fired,
    /// in the order they were scheduled. The rest stay queued.
    pub fn advance(&mut self, elapsed: u64) -> Vec<BlockPos> {
        let mut fired = Vec::new();
        self.queue.retain_mut(|update| {
            update.remaining = update.remaining.saturating_sub(elapsed);
            if update.remaining == 0 {
                fired.push(update.pos);
                false
            } else {
                true
            }
        });
        fired
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: i32) -> BlockPos {
        BlockPos::new(x, 0, 0)
    }

    #[test]
    fn scheduler_basic() {
        let mut s = UpdateScheduler::new();
        s.schedule(pos(0), 5);
        s.schedule(pos(1), 10);
        assert_eq!(s.len(), 2);

        // 4 ticks in: nothing ready
        assert!(s.advance(4).is_empty());

        // 5 ticks in: first ready
        assert_eq!(s.advance(1), vec![pos(0)]);

        // 10 ticks in: second ready
        assert_eq!(s.advance(5), vec![pos(1)]);
        assert!(s.is_empty());
    }

    #[test]
    fn zero_delay_fires_immediately() {
        let mut s = UpdateScheduler::new();
        s.schedule(pos(3), 0);
        assert_eq!(s.advance(0), vec![pos(3)]);
        assert!(s.is_empty());
    }

    #[test]
    fn overshoot_fires() {
        let mut s = UpdateScheduler::new();
        s.schedule(pos(0), 2);
        assert_eq!(s.advance(7), vec![pos(0)]);
    }

    #[test]
    fn fired_in_schedule_order() {
        let mut s = UpdateScheduler::new();
        s.schedule(pos(2), 3);
        s.schedule(pos(1), 1);
        s.schedule(pos(0), 2);
        assert_eq!(s.advance(3), vec![pos(2), pos(1), pos(0)]);
    }

    #[test]
    fn duplicates_are_kept() {
        let mut s = UpdateScheduler::new();
        s.schedule(pos(5), 1);
        s.schedule(pos(5), 2);
        assert_eq!(s.len(), 2);
        assert_eq!(s.advance(1), vec![pos(5)]);
        assert_eq!(s.len(), 1);
        assert_eq!(s.advance(1), vec![pos(5)]);
        assert!(s.is_empty());
    }
}
