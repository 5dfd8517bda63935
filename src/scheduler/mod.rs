pub mod clock;
pub mod task;

use crate::error::GameError;
use clock::Clock;
use parking_lot::{Condvar, Mutex};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use task::{GameTask, ScheduledTask, TaskQueue};

pub use clock::{ManualClock, MonotonicClock};

#[derive(Debug, Default)]
struct SchedulerState {
    queue: TaskQueue,
    shutdown: bool,
}

/// Deferred-task queue drained by a single scheduler thread.
///
/// The internal lock guards only the queue; tasks run after it is released so
/// that scheduling never waits on a running task.
pub struct Scheduler {
    state: Mutex<SchedulerState>,
    wakeup: Condvar,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(SchedulerState::default()),
            wakeup: Condvar::new(),
            clock,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Queues `task` to fire `delay_ms` from now.
    pub fn schedule(&self, delay_ms: u64, task: GameTask) {
        let due_ms = self.clock.now_ms().saturating_add(delay_ms);
        let earliest = self.state.lock().queue.push(due_ms, task);
        if earliest {
            self.wakeup.notify_one();
        }
    }

    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn pending_tasks(&self) -> Vec<ScheduledTask> {
        self.state.lock().queue.snapshot()
    }

    /// Next task whose due time has passed, without waiting.
    pub fn pop_due(&self) -> Option<ScheduledTask> {
        let now = self.clock.now_ms();
        self.state.lock().queue.pop_due(now)
    }

    pub fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.wakeup.notify_all();
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Blocks until a task is due or the scheduler shuts down.
    fn next_task(&self) -> Option<ScheduledTask> {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                return None;
            }
            let Some(due_ms) = state.queue.next_due() else {
                self.wakeup.wait(&mut state);
                continue;
            };
            let now = self.clock.now_ms();
            if due_ms <= now {
                return state.queue.pop_due(now);
            }
            let timeout = Duration::from_millis(due_ms - now);
            let woke = self.wakeup.wait_for(&mut state, timeout);
            if woke.timed_out() {
                // The earliest task may have come due; re-check against the clock.
                continue;
            }
            // Woken by an earlier insertion or a shutdown request.
        }
    }

    /// The scheduler thread loop.
    ///
    /// Each task is handed to `handler` outside the queue lock. Errors and
    /// panics are logged and the task is dropped; the loop keeps going.
    pub fn run<F>(&self, mut handler: F)
    where
        F: FnMut(GameTask) -> Result<(), GameError>,
    {
        tracing::info!("scheduler started");
        while let Some(entry) = self.next_task() {
            let kind = entry.task.kind();
            match catch_unwind(AssertUnwindSafe(|| handler(entry.task))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::error!(task = kind, error = %err, "scheduled task failed");
                }
                Err(_) => {
                    tracing::error!(task = kind, "scheduled task panicked");
                }
            }
        }
        tracing::info!("scheduler stopped");
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::creature::CreatureId;
    use std::sync::mpsc;
    use std::time::Instant;

    #[test]
    fn manual_clock_controls_due_tasks() {
        let clock = Arc::new(ManualClock::new(0));
        let scheduler = Scheduler::new(clock.clone());
        scheduler.schedule(1000, GameTask::CheckCreature(CreatureId(1), 1));
        assert!(scheduler.pop_due().is_none());
        clock.advance(999);
        assert!(scheduler.pop_due().is_none());
        clock.advance(1);
        let entry = scheduler.pop_due().expect("due");
        assert_eq!(entry.due_ms, 1000);
    }

    #[test]
    fn thread_fires_tasks_no_earlier_than_their_delay() {
        let scheduler = Arc::new(Scheduler::new(Arc::new(MonotonicClock::new())));
        let (sender, receiver) = mpsc::channel();
        let worker = {
            let scheduler = scheduler.clone();
            std::thread::spawn(move || {
                scheduler.run(|task| {
                    let _ = sender.send((task, Instant::now()));
                    Ok(())
                })
            })
        };

        let started = Instant::now();
        scheduler.schedule(60, GameTask::CheckCreature(CreatureId(1), 1));
        let (task, fired_at) = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("task fired");
        assert_eq!(task, GameTask::CheckCreature(CreatureId(1), 1));
        assert!(fired_at.duration_since(started) >= Duration::from_millis(60));

        scheduler.shutdown();
        worker.join().expect("scheduler thread");
    }

    #[test]
    fn earlier_insertion_wakes_the_waiting_thread() {
        let scheduler = Arc::new(Scheduler::new(Arc::new(MonotonicClock::new())));
        let (sender, receiver) = mpsc::channel();
        let worker = {
            let scheduler = scheduler.clone();
            std::thread::spawn(move || {
                scheduler.run(|task| {
                    let _ = sender.send(task);
                    Ok(())
                })
            })
        };

        scheduler.schedule(60_000, GameTask::CheckCreature(CreatureId(1), 1));
        std::thread::sleep(Duration::from_millis(20));
        scheduler.schedule(10, GameTask::CheckAttack(CreatureId(2), 1));
        let first = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("early task fired");
        assert_eq!(first, GameTask::CheckAttack(CreatureId(2), 1));
        assert_eq!(scheduler.pending(), 1);

        scheduler.shutdown();
        worker.join().expect("scheduler thread");
    }

    #[test]
    fn failing_and_panicking_tasks_do_not_stop_the_loop() {
        let scheduler = Arc::new(Scheduler::new(Arc::new(MonotonicClock::new())));
        let (sender, receiver) = mpsc::channel();
        scheduler.schedule(0, GameTask::CheckCreature(CreatureId(1), 1));
        scheduler.schedule(0, GameTask::CheckCreature(CreatureId(2), 1));
        scheduler.schedule(0, GameTask::CheckCreature(CreatureId(3), 1));
        let worker = {
            let scheduler = scheduler.clone();
            std::thread::spawn(move || {
                scheduler.run(|task| match task {
                    GameTask::CheckCreature(CreatureId(1), 1) => Err(GameError::NotPossible),
                    GameTask::CheckCreature(CreatureId(2), 1) => panic!("boom"),
                    other => {
                        let _ = sender.send(other);
                        Ok(())
                    }
                })
            })
        };

        let survivor = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("third task fired");
        assert_eq!(survivor, GameTask::CheckCreature(CreatureId(3), 1));
        scheduler.shutdown();
        worker.join().expect("scheduler thread");
    }
}
