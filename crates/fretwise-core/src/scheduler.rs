use std::time::{Duration, Instant};

/// Monotonic time source for the scheduler, as elapsed time since start.
pub trait Clock: Send {
    fn elapsed(&self) -> Duration;
}

pub struct MonotonicClock {
    started_at: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerTask {
    /// One-second step of a timed round.
    Countdown,
    /// Deferred draw of the next target after a solved one.
    NextTarget,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

#[derive(Clone, Copy, Debug)]
struct ScheduledTask {
    id: TaskId,
    due: Duration,
    period: Option<Duration>,
    task: TimerTask,
}

/// Timers on a caller-supplied monotonic clock (elapsed time since start).
/// Nothing fires on its own; `poll` returns whatever has come due.
pub struct Scheduler {
    tasks: Vec<ScheduledTask>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 0,
        }
    }

    pub fn schedule_once(&mut self, now: Duration, delay: Duration, task: TimerTask) -> TaskId {
        self.push(now + delay, None, task)
    }

    pub fn schedule_every(&mut self, now: Duration, period: Duration, task: TimerTask) -> TaskId {
        let period = period.max(Duration::from_millis(1));
        self.push(now + period, Some(period), task)
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn is_pending(&self, task: TimerTask) -> bool {
        self.tasks.iter().any(|scheduled| scheduled.task == task)
    }

    /// Returns every firing due at or before `now`, oldest first. A periodic
    /// task that fell several periods behind fires once per missed period.
    pub fn poll(&mut self, now: Duration) -> Vec<TimerTask> {
        let mut fired: Vec<(Duration, TaskId, TimerTask)> = Vec::new();

        for scheduled in &mut self.tasks {
            while scheduled.due <= now {
                fired.push((scheduled.due, scheduled.id, scheduled.task));
                match scheduled.period {
                    Some(period) => scheduled.due += period,
                    None => break,
                }
            }
        }

        self.tasks
            .retain(|scheduled| scheduled.period.is_some() || scheduled.due > now);

        fired.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1 .0.cmp(&b.1 .0)));
        fired.into_iter().map(|(_, _, task)| task).collect()
    }

    fn push(&mut self, due: Duration, period: Option<Duration>, task: TimerTask) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(ScheduledTask {
            id,
            due,
            period,
            task,
        });
        id
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
