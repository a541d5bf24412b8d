//! Task lifecycle state machine.
//!
//! State machine:
//! ```text
//! [PENDING] ──start──→ [EXECUTING] ──settle──→ [DONE]
//!     │                     │
//!     └───── cancel ────────┴──────── cancel ──→ [DONE]
//! ```
//!
//! `Done` is terminal; a task settles exactly once. Cancellation of an
//! `Executing` task does not abort the physical exchange: the late device
//! result is discarded because settlement requires the `Executing` state.

use super::entities::{AccountSlot, ChannelId, TaskId};

/// Lifecycle state of a queued task. Monotonic; no transition out of `Done`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TaskState {
    /// Queued, not yet dispatched to the device.
    #[default]
    Pending,
    /// Its exchange is in flight on the device.
    Executing,
    /// Settled (result delivered or cancelled). Terminal.
    Done,
}

/// The device exchange a task performs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskKind {
    /// Identity probe: silent public-key read at the reference slot.
    Probe,
    /// Read the public key at a slot; `confirm` shows it on the device and
    /// waits for the human.
    GetPublicKey {
        /// Target account slot.
        slot: AccountSlot,
        /// Whether the device must display the key for confirmation.
        confirm: bool,
    },
    /// Sign a canonical payload with the key at a slot.
    Sign {
        /// Target account slot.
        slot: AccountSlot,
        /// Canonical signable bytes.
        payload: Vec<u8>,
    },
}

impl TaskKind {
    /// True for exchanges that wait on a human confirming on the device and
    /// therefore use the long timeout.
    pub fn requires_confirmation(&self) -> bool {
        matches!(
            self,
            TaskKind::GetPublicKey { confirm: true, .. } | TaskKind::Sign { .. }
        )
    }
}

/// A unit of scheduled work: one device exchange plus lifecycle bookkeeping.
#[derive(Clone, Debug)]
pub struct QueuedTask {
    /// Unique task id.
    pub id: TaskId,
    /// Owning channel; `None` for the identity probe.
    pub channel: Option<ChannelId>,
    /// The exchange to perform.
    pub kind: TaskKind,
    /// Current lifecycle state.
    pub state: TaskState,
}

impl QueuedTask {
    /// Creates a new pending task.
    pub fn new(id: TaskId, channel: Option<ChannelId>, kind: TaskKind) -> Self {
        Self {
            id,
            channel,
            kind,
            state: TaskState::Pending,
        }
    }

    /// True for the identity probe.
    pub fn is_probe(&self) -> bool {
        matches!(self.kind, TaskKind::Probe)
    }

    /// `Pending -> Executing`. Returns false from any other state.
    pub fn start(&mut self) -> bool {
        if self.state == TaskState::Pending {
            self.state = TaskState::Executing;
            true
        } else {
            false
        }
    }

    /// `Executing -> Done`, the device-result path. Returns false when the
    /// task is not `Executing` (already cancelled or never started): the
    /// caller must discard the late result.
    pub fn settle(&mut self) -> bool {
        if self.state == TaskState::Executing {
            self.state = TaskState::Done;
            true
        } else {
            false
        }
    }

    /// `Pending|Executing -> Done`, the cancellation path. Returns false when
    /// already `Done` (cancellation is idempotent).
    pub fn cancel(&mut self) -> bool {
        if self.state == TaskState::Done {
            false
        } else {
            self.state = TaskState::Done;
            true
        }
    }
}
