//! FIFO task queue with probe cadence and dispatch spacing.
//!
//! This is the pure scheduling core: given the current timestamp it decides
//! what the hub should do next. Actual dispatching, timers, and device I/O
//! live in the service layer.
//!
//! Scheduling rules, in priority order:
//! 1. Never overlap exchanges (single-flight).
//! 2. Keep a minimum spacing between dispatches; the background timer retries.
//! 3. When the identity-probe cadence is due, the probe preempts the queue.
//! 4. Otherwise dispatch the oldest pending task, FIFO across channels.

use std::collections::VecDeque;

use super::entities::{ChannelId, TaskId, Timestamp};
use super::task::{QueuedTask, TaskKind, TaskState};

/// What the hub should do on this scheduling pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextAction {
    /// An exchange is in flight; do nothing.
    Busy,
    /// Work is due but the inter-dispatch spacing has not elapsed.
    WaitSpacing,
    /// Dispatch the identity probe ahead of the queue.
    Probe,
    /// Dispatch this pending task.
    Dispatch(TaskId),
    /// Nothing to do.
    Idle,
}

/// Ordered task queue plus the pacing state of the run loop.
#[derive(Debug)]
pub struct TaskQueue {
    tasks: VecDeque<QueuedTask>,
    /// Task whose physical exchange is in flight. Survives cancellation of
    /// the task itself: the slot frees only when the device reports back.
    executing: Option<TaskId>,
    next_task_id: TaskId,
    last_probe_at: Option<Timestamp>,
    last_dispatch_at: Option<Timestamp>,
    /// Most recent non-probe dispatch. Probes run on their own cadence and
    /// do not count as consumer activity.
    last_regular_dispatch_at: Option<Timestamp>,
    probe_interval_ms: u64,
    spacing_ms: u64,
}

impl TaskQueue {
    /// Creates an empty queue with the given cadence parameters.
    pub fn new(probe_interval_ms: u64, spacing_ms: u64) -> Self {
        Self {
            tasks: VecDeque::new(),
            executing: None,
            next_task_id: 0,
            last_probe_at: None,
            last_dispatch_at: None,
            last_regular_dispatch_at: None,
            probe_interval_ms,
            spacing_ms,
        }
    }

    /// Appends a pending task, FIFO position. Returns its id.
    pub fn enqueue(&mut self, channel: Option<ChannelId>, kind: TaskKind) -> TaskId {
        let id = self.next_task_id;
        self.next_task_id += 1;
        self.tasks.push_back(QueuedTask::new(id, channel, kind));
        id
    }

    /// Decides the next scheduling step at `now`.
    pub fn next_action(&self, now: Timestamp) -> NextAction {
        if self.executing.is_some() {
            return NextAction::Busy;
        }
        let probe_due = self.probe_due(now);
        let front = self.front_pending();
        if !probe_due && front.is_none() {
            return NextAction::Idle;
        }
        if !self.spacing_elapsed(now) {
            return NextAction::WaitSpacing;
        }
        if probe_due {
            return NextAction::Probe;
        }
        match front {
            Some(id) => NextAction::Dispatch(id),
            None => NextAction::Idle,
        }
    }

    /// True when the probe cadence has elapsed (or no probe ever ran).
    pub fn probe_due(&self, now: Timestamp) -> bool {
        match self.last_probe_at {
            None => true,
            Some(at) => now.saturating_sub(at) >= self.probe_interval_ms,
        }
    }

    fn spacing_elapsed(&self, now: Timestamp) -> bool {
        match self.last_dispatch_at {
            None => true,
            Some(at) => now.saturating_sub(at) >= self.spacing_ms,
        }
    }

    /// Oldest pending task id, FIFO across channels.
    pub fn front_pending(&self) -> Option<TaskId> {
        self.tasks
            .iter()
            .find(|t| t.state == TaskState::Pending)
            .map(|t| t.id)
    }

    /// Starts a queued task: `Pending -> Executing`, records the dispatch
    /// time, and returns the exchange to perform.
    pub fn start(&mut self, id: TaskId, now: Timestamp) -> Option<TaskKind> {
        debug_assert!(self.executing.is_none(), "single-flight violated");
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        if !task.start() {
            return None;
        }
        let kind = task.kind.clone();
        self.executing = Some(id);
        self.last_dispatch_at = Some(now);
        self.last_regular_dispatch_at = Some(now);
        Some(kind)
    }

    /// Injects the identity probe directly in the `Executing` state, ahead of
    /// every queued task. Returns its id.
    pub fn start_probe(&mut self, now: Timestamp) -> TaskId {
        debug_assert!(self.executing.is_none(), "single-flight violated");
        let id = self.next_task_id;
        self.next_task_id += 1;
        let mut probe = QueuedTask::new(id, None, TaskKind::Probe);
        probe.start();
        self.tasks.push_front(probe);
        self.executing = Some(id);
        self.last_dispatch_at = Some(now);
        id
    }

    /// Settles a task from its device result: `Executing -> Done`, removed
    /// from the queue. Returns `None` when the task was already cancelled,
    /// in which case the late result must be discarded. Always frees the
    /// executing slot for a matching id.
    pub fn settle_from_device(&mut self, id: TaskId) -> Option<QueuedTask> {
        if self.executing == Some(id) {
            self.executing = None;
        }
        let pos = self.tasks.iter().position(|t| t.id == id)?;
        if !self.tasks[pos].settle() {
            return None;
        }
        self.tasks.remove(pos)
    }

    /// Cancels every non-done task owned by `channel` and removes them.
    /// Returns the cancelled ids, oldest first.
    pub fn cancel_channel(&mut self, channel: ChannelId) -> Vec<TaskId> {
        self.cancel_where(|t| t.channel == Some(channel))
    }

    /// Cancels every non-done, non-probe task hub-wide (device identity
    /// change or device loss). Returns the cancelled ids, oldest first.
    pub fn cancel_all_regular(&mut self) -> Vec<TaskId> {
        self.cancel_where(|t| !t.is_probe())
    }

    fn cancel_where(&mut self, matches: impl Fn(&QueuedTask) -> bool) -> Vec<TaskId> {
        let mut cancelled = Vec::new();
        for task in self.tasks.iter_mut() {
            if matches(task) && task.cancel() {
                cancelled.push(task.id);
            }
        }
        // Done tasks leave the queue; a cancelled Executing task keeps the
        // executing slot occupied until the device reports back.
        self.tasks.retain(|t| t.state != TaskState::Done);
        cancelled
    }

    /// Marks the probe cadence satisfied at `now`.
    pub fn probe_completed(&mut self, now: Timestamp) {
        self.last_probe_at = Some(now);
    }

    /// Resets pacing after a device identity change so the next real task is
    /// not penalized by the spacing rule.
    pub fn reset_pacing(&mut self, now: Timestamp) {
        self.last_probe_at = Some(now);
        self.last_dispatch_at = None;
    }

    /// Id of the task whose exchange is in flight, if any.
    pub fn executing(&self) -> Option<TaskId> {
        self.executing
    }

    /// Timestamp of the most recent dispatch, probe or not.
    pub fn last_dispatch_at(&self) -> Option<Timestamp> {
        self.last_dispatch_at
    }

    /// Timestamp of the most recent non-probe dispatch.
    pub fn last_regular_dispatch_at(&self) -> Option<Timestamp> {
        self.last_regular_dispatch_at
    }

    /// Looks up a task by id.
    pub fn task(&self, id: TaskId) -> Option<&QueuedTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Number of tasks currently queued (pending or executing).
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when no tasks are queued.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
