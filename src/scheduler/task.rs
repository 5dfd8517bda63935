use crate::entities::creature::CreatureId;
use crate::entities::item::ItemId;
use crate::world::position::Position;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A deferred world action. Targets are referenced by id and re-resolved when
/// the task fires; a target that no longer exists turns the task into a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameTask {
    /// Heartbeat: regeneration, progression, timers and conditions. The
    /// second field is the placement it was armed for.
    CheckCreature(CreatureId, u32),
    /// Re-runs the creature's current attack; placement as above.
    CheckAttack(CreatureId, u32),
    DecayItem { position: Position, item: ItemId },
    DecaySplash { position: Position, item: ItemId },
    ChangeOutfit { creature: CreatureId, look_type: u16 },
}

impl GameTask {
    pub fn kind(&self) -> &'static str {
        match self {
            GameTask::CheckCreature(..) => "check_creature",
            GameTask::CheckAttack(..) => "check_attack",
            GameTask::DecayItem { .. } => "decay_item",
            GameTask::DecaySplash { .. } => "decay_splash",
            GameTask::ChangeOutfit { .. } => "change_outfit",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScheduledTask {
    pub due_ms: u64,
    pub seq: u64,
    pub task: GameTask,
}

/// Min-heap by due time, then by insertion order.
impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest entry is on top.
        other
            .due_ms
            .cmp(&self.due_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.due_ms == other.due_ms && self.seq == other.seq
    }
}

impl Eq for ScheduledTask {}

/// Pending tasks ordered by due time with stable FIFO ties.
#[derive(Debug, Default)]
pub struct TaskQueue {
    heap: BinaryHeap<ScheduledTask>,
    next_seq: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `task`; true when it became the earliest entry.
    pub fn push(&mut self, due_ms: u64, task: GameTask) -> bool {
        let seq = self.next_seq;
        self.next_seq += 1;
        let earliest = self
            .heap
            .peek()
            .map(|top| due_ms < top.due_ms)
            .unwrap_or(true);
        self.heap.push(ScheduledTask { due_ms, seq, task });
        earliest
    }

    pub fn next_due(&self) -> Option<u64> {
        self.heap.peek().map(|entry| entry.due_ms)
    }

    pub fn pop_due(&mut self, now_ms: u64) -> Option<ScheduledTask> {
        if self.next_due()? <= now_ms {
            self.heap.pop()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Pending tasks in firing order.
    pub fn snapshot(&self) -> Vec<ScheduledTask> {
        let mut entries: Vec<ScheduledTask> = self.heap.iter().copied().collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(id: u32) -> GameTask {
        GameTask::CheckCreature(CreatureId(id), 1)
    }

    #[test]
    fn earliest_due_pops_first() {
        let mut queue = TaskQueue::new();
        queue.push(1010, check(1));
        queue.push(1005, check(2));

        assert!(queue.pop_due(1004).is_none());
        assert_eq!(queue.pop_due(1005).map(|entry| entry.task), Some(check(2)));
        assert!(queue.pop_due(1009).is_none());
        assert_eq!(queue.pop_due(1010).map(|entry| entry.task), Some(check(1)));
        assert!(queue.is_empty());
    }

    #[test]
    fn equal_due_times_keep_insertion_order() {
        let mut queue = TaskQueue::new();
        for id in 1..=5 {
            queue.push(1005, check(id));
        }
        let mut fired = Vec::new();
        while let Some(entry) = queue.pop_due(1005) {
            fired.push(entry.task);
        }
        assert_eq!(fired, (1..=5).map(check).collect::<Vec<_>>());
    }

    #[test]
    fn push_reports_new_earliest() {
        let mut queue = TaskQueue::new();
        assert!(queue.push(100, check(1)));
        assert!(!queue.push(200, check(2)));
        assert!(!queue.push(100, check(3)));
        assert!(queue.push(50, check(4)));
        let order: Vec<u64> = queue.snapshot().iter().map(|entry| entry.due_ms).collect();
        assert_eq!(order, vec![50, 100, 100, 200]);
    }
}
