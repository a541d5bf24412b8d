//! The signing hub actor.
//!
//! One task owns the device connection, the task queue, and the account
//! cache. Consumers talk to it over a command channel; device exchanges run
//! on spawned tasks and report back as commands, so the actor never blocks
//! on the device.
//!
//! Scheduling is delegated to [`TaskQueue`]; this module supplies the clock,
//! the timers, and the I/O.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::{
    AccountCache, AccountInfo, AccountSlot, ChannelId, DeviceFingerprint, NextAction, PublicKey,
    QueuedTask, SignedTransaction, SignerError, TaskId, TaskKind, TaskQueue, Timestamp,
    UnsignedTransaction, REFERENCE_SLOT,
};
use crate::ports::{DeviceReply, DeviceRequest, DeviceTransport, TransactionCodec, TransportError};

use super::channel::SignerChannel;
use super::config::{ConfigError, HubConfig};
use super::events::{DeviceStatus, HubEvent};

type AccountReply = oneshot::Sender<Result<AccountInfo, SignerError>>;
type ConfirmReply = oneshot::Sender<Result<bool, SignerError>>;
type SignReply = oneshot::Sender<Result<Option<SignedTransaction>, SignerError>>;

/// Commands processed by the hub actor.
pub(crate) enum HubCommand {
    OpenChannel {
        reply: oneshot::Sender<ChannelId>,
    },
    CloseChannel {
        channel: ChannelId,
    },
    GetAccount {
        channel: ChannelId,
        slot: AccountSlot,
        show_on_device: bool,
        reply: AccountReply,
    },
    ConfirmAccount {
        channel: ChannelId,
        slot: AccountSlot,
        reply: ConfirmReply,
    },
    SignTransaction {
        channel: ChannelId,
        slot: AccountSlot,
        transaction: UnsignedTransaction,
        reply: SignReply,
    },
    ExchangeFinished {
        task: TaskId,
        result: Result<DeviceReply, TransportError>,
    },
    Shutdown,
}

/// How to deliver a settled task's result back to its caller.
enum TaskCompletion {
    /// The identity probe; its result feeds device tracking, not a caller.
    Probe,
    /// A silent account read.
    Account { slot: AccountSlot, reply: AccountReply },
    /// An on-device account confirmation.
    Confirm { slot: AccountSlot, reply: ConfirmReply },
    /// First phase of a signature: resolve the sender key, then enqueue the
    /// actual sign exchange.
    AccountThenSign {
        channel: ChannelId,
        slot: AccountSlot,
        transaction: UnsignedTransaction,
        reply: SignReply,
    },
    /// The sign exchange itself.
    Signature {
        transaction: UnsignedTransaction,
        reply: SignReply,
    },
}

/// Cloneable front door to a running hub.
#[derive(Clone)]
pub struct HubHandle {
    command_tx: mpsc::Sender<HubCommand>,
    status: watch::Receiver<DeviceStatus>,
    events: broadcast::Sender<HubEvent>,
}

impl HubHandle {
    /// Opens a new consumer channel on the hub.
    pub async fn open_channel(&self) -> Result<SignerChannel, SignerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(HubCommand::OpenChannel { reply: reply_tx })
            .await
            .map_err(|_| SignerError::Cancelled)?;
        let id = reply_rx.await.map_err(|_| SignerError::Cancelled)?;
        Ok(SignerChannel::new(id, self.command_tx.clone()))
    }

    /// Watch channel carrying the hub's current view of the device.
    pub fn status(&self) -> watch::Receiver<DeviceStatus> {
        self.status.clone()
    }

    /// Subscribes to hub events.
    pub fn events(&self) -> broadcast::Receiver<HubEvent> {
        self.events.subscribe()
    }

    /// Asks the hub to stop. Outstanding requests settle as cancelled.
    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(HubCommand::Shutdown).await;
    }
}

/// The hub actor state. Constructed and driven by [`SignerHub::spawn`].
pub struct SignerHub {
    config: HubConfig,
    transport: Arc<dyn DeviceTransport>,
    codec: Arc<dyn TransactionCodec>,
    command_rx: mpsc::Receiver<HubCommand>,
    command_tx: mpsc::Sender<HubCommand>,
    queue: TaskQueue,
    cache: AccountCache,
    completions: HashMap<TaskId, TaskCompletion>,
    open_channels: HashSet<ChannelId>,
    next_channel_id: ChannelId,
    /// True once a probe has positively established that no device is
    /// attached. Unknown-at-startup is not absence.
    device_absent: bool,
    platform_supported: bool,
    status_tx: watch::Sender<DeviceStatus>,
    event_tx: broadcast::Sender<HubEvent>,
    start: Instant,
}

impl SignerHub {
    /// Validates `config`, spawns the hub actor, and returns its handle.
    pub fn spawn(
        transport: Arc<dyn DeviceTransport>,
        codec: Arc<dyn TransactionCodec>,
        config: HubConfig,
    ) -> Result<HubHandle, ConfigError> {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
        let (event_tx, _) = broadcast::channel(config.event_capacity);
        let platform_supported = transport.is_supported();
        let (status_tx, status_rx) = watch::channel(DeviceStatus {
            fingerprint: None,
            platform_supported,
        });

        let queue = TaskQueue::new(
            config.probe_interval.as_millis() as u64,
            config.dispatch_spacing.as_millis() as u64,
        );

        let hub = Self {
            config,
            transport,
            codec,
            command_rx,
            command_tx: command_tx.clone(),
            queue,
            cache: AccountCache::new(),
            completions: HashMap::new(),
            open_channels: HashSet::new(),
            next_channel_id: 0,
            device_absent: false,
            platform_supported,
            status_tx,
            event_tx: event_tx.clone(),
            start: Instant::now(),
        };
        tokio::spawn(hub.run());

        Ok(HubHandle {
            command_tx,
            status: status_rx,
            events: event_tx,
        })
    }

    async fn run(mut self) {
        let mut ticker = time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            platform_supported = self.platform_supported,
            "signer hub started"
        );
        loop {
            let timer_active = self.timer_active();
            tokio::select! {
                maybe_cmd = self.command_rx.recv() => {
                    match maybe_cmd {
                        Some(cmd) => {
                            if !self.handle_command(cmd) {
                                break;
                            }
                        }
                        // Every handle dropped.
                        None => break,
                    }
                }
                _ = ticker.tick(), if timer_active => {
                    let now = self.now();
                    self.emit_countdown(now);
                    self.pump(now);
                }
            }
        }
        self.drain_on_shutdown();
        info!("signer hub stopped");
    }

    /// Milliseconds since the hub started.
    fn now(&self) -> Timestamp {
        self.start.elapsed().as_millis() as u64
    }

    /// The background timer runs while any channel is open, and lingers for
    /// a while after the last consumer dispatch so late work still gets
    /// scheduled. Probe dispatches do not renew the window, otherwise the
    /// probe cadence would keep the hub awake forever.
    fn timer_active(&self) -> bool {
        if !self.open_channels.is_empty() {
            return true;
        }
        match self.queue.last_regular_dispatch_at() {
            Some(at) => {
                self.now().saturating_sub(at) < self.config.idle_linger.as_millis() as u64
            }
            None => false,
        }
    }

    /// Returns false when the hub must stop.
    fn handle_command(&mut self, cmd: HubCommand) -> bool {
        let now = self.now();
        match cmd {
            HubCommand::OpenChannel { reply } => {
                let id = self.next_channel_id;
                self.next_channel_id += 1;
                self.open_channels.insert(id);
                debug!(channel = id, "channel opened");
                let _ = reply.send(id);
                self.pump(now);
            }
            HubCommand::CloseChannel { channel } => self.on_close_channel(channel, now),
            HubCommand::GetAccount {
                channel,
                slot,
                show_on_device,
                reply,
            } => self.on_get_account(channel, slot, show_on_device, reply, now),
            HubCommand::ConfirmAccount {
                channel,
                slot,
                reply,
            } => self.on_confirm_account(channel, slot, reply, now),
            HubCommand::SignTransaction {
                channel,
                slot,
                transaction,
                reply,
            } => self.on_sign_transaction(channel, slot, transaction, reply, now),
            HubCommand::ExchangeFinished { task, result } => {
                self.on_exchange_finished(task, result, now)
            }
            HubCommand::Shutdown => return false,
        }
        true
    }

    fn on_close_channel(&mut self, channel: ChannelId, now: Timestamp) {
        if !self.open_channels.remove(&channel) {
            return;
        }
        let cancelled = self.queue.cancel_channel(channel);
        debug!(
            channel,
            cancelled = cancelled.len(),
            "channel closed"
        );
        for id in cancelled {
            if let Some(completion) = self.completions.remove(&id) {
                Self::settle_error(completion, SignerError::Cancelled);
            }
        }
        self.pump(now);
    }

    /// Fast-fail check shared by every operation.
    fn precheck(&self) -> Option<SignerError> {
        if !self.platform_supported || self.device_absent {
            Some(SignerError::DeviceUnreachable)
        } else {
            None
        }
    }

    fn on_get_account(
        &mut self,
        channel: ChannelId,
        slot: AccountSlot,
        show_on_device: bool,
        reply: AccountReply,
        now: Timestamp,
    ) {
        if !self.open_channels.contains(&channel) {
            let _ = reply.send(Err(SignerError::Cancelled));
            return;
        }
        if let Some(err) = self.precheck() {
            let _ = reply.send(Err(err));
            return;
        }
        if !show_on_device {
            if let Some(info) = self.cache.get(slot) {
                debug!(channel, slot, "account served from cache");
                let _ = reply.send(Ok(info.clone()));
                return;
            }
        }
        let id = self.queue.enqueue(
            Some(channel),
            TaskKind::GetPublicKey {
                slot,
                confirm: show_on_device,
            },
        );
        self.completions
            .insert(id, TaskCompletion::Account { slot, reply });
        self.pump(now);
    }

    fn on_confirm_account(
        &mut self,
        channel: ChannelId,
        slot: AccountSlot,
        reply: ConfirmReply,
        now: Timestamp,
    ) {
        if !self.open_channels.contains(&channel) {
            let _ = reply.send(Err(SignerError::Cancelled));
            return;
        }
        if let Some(err) = self.precheck() {
            let _ = reply.send(Err(err));
            return;
        }
        let id = self.queue.enqueue(
            Some(channel),
            TaskKind::GetPublicKey {
                slot,
                confirm: true,
            },
        );
        self.completions
            .insert(id, TaskCompletion::Confirm { slot, reply });
        self.pump(now);
    }

    fn on_sign_transaction(
        &mut self,
        channel: ChannelId,
        slot: AccountSlot,
        transaction: UnsignedTransaction,
        reply: SignReply,
        now: Timestamp,
    ) {
        if !self.open_channels.contains(&channel) {
            let _ = reply.send(Err(SignerError::Cancelled));
            return;
        }
        if let Some(err) = self.precheck() {
            let _ = reply.send(Err(err));
            return;
        }
        if let Some(info) = self.cache.get(slot) {
            let public_key = info.public_key;
            self.enqueue_sign(channel, slot, public_key, transaction, reply, now);
        } else {
            // Sender key unknown: resolve it first, then sign.
            let id = self.queue.enqueue(
                Some(channel),
                TaskKind::GetPublicKey {
                    slot,
                    confirm: false,
                },
            );
            self.completions.insert(
                id,
                TaskCompletion::AccountThenSign {
                    channel,
                    slot,
                    transaction,
                    reply,
                },
            );
            self.pump(now);
        }
    }

    fn enqueue_sign(
        &mut self,
        channel: ChannelId,
        slot: AccountSlot,
        public_key: PublicKey,
        mut transaction: UnsignedTransaction,
        reply: SignReply,
        now: Timestamp,
    ) {
        transaction.sender_public_key = Some(public_key);
        match self.codec.signable_bytes(&transaction) {
            Ok(payload) => {
                let id = self
                    .queue
                    .enqueue(Some(channel), TaskKind::Sign { slot, payload });
                self.completions
                    .insert(id, TaskCompletion::Signature { transaction, reply });
                self.pump(now);
            }
            Err(err) => {
                warn!(channel, slot, %err, "transaction encoding failed");
                let _ = reply.send(Err(err.into()));
            }
        }
    }

    fn on_exchange_finished(
        &mut self,
        task: TaskId,
        result: Result<DeviceReply, TransportError>,
        now: Timestamp,
    ) {
        let completion = self.completions.remove(&task);
        let settled = self.queue.settle_from_device(task);
        match (settled, completion) {
            (Some(t), Some(c)) => self.complete(t, c, result, now),
            // Cancelled while the exchange was in flight.
            _ => {
                debug!(task, "discarding late device result");
                self.pump(now);
            }
        }
    }

    fn complete(
        &mut self,
        task: QueuedTask,
        completion: TaskCompletion,
        result: Result<DeviceReply, TransportError>,
        now: Timestamp,
    ) {
        if task.is_probe() {
            self.on_probe_result(result, now);
            self.pump(now);
            return;
        }
        match completion {
            TaskCompletion::Probe => {}
            TaskCompletion::Account { slot, reply } => match result {
                Ok(DeviceReply::PublicKey(public_key)) => {
                    let info = AccountInfo::from_public_key(public_key);
                    self.cache.insert(slot, info.clone());
                    let _ = reply.send(Ok(info));
                }
                Ok(reply_kind) => {
                    warn!(task = task.id, ?reply_kind, "unexpected device reply");
                    let _ = reply.send(Err(SignerError::Unknown(
                        "unexpected device reply".to_string(),
                    )));
                }
                Err(err) => {
                    let _ = reply.send(Err(err.into()));
                }
            },
            TaskCompletion::Confirm { slot, reply } => match result {
                Ok(DeviceReply::PublicKey(public_key)) => {
                    self.cache
                        .insert(slot, AccountInfo::from_public_key(public_key));
                    let _ = reply.send(Ok(true));
                }
                Ok(reply_kind) => {
                    warn!(task = task.id, ?reply_kind, "unexpected device reply");
                    let _ = reply.send(Err(SignerError::Unknown(
                        "unexpected device reply".to_string(),
                    )));
                }
                // A decline is an answer, not an error.
                Err(TransportError::Rejected) => {
                    let _ = reply.send(Ok(false));
                }
                Err(err) => {
                    let _ = reply.send(Err(err.into()));
                }
            },
            TaskCompletion::AccountThenSign {
                channel,
                slot,
                transaction,
                reply,
            } => match result {
                Ok(DeviceReply::PublicKey(public_key)) => {
                    self.cache
                        .insert(slot, AccountInfo::from_public_key(public_key));
                    self.enqueue_sign(channel, slot, public_key, transaction, reply, now);
                }
                Ok(reply_kind) => {
                    warn!(task = task.id, ?reply_kind, "unexpected device reply");
                    let _ = reply.send(Err(SignerError::Unknown(
                        "unexpected device reply".to_string(),
                    )));
                }
                Err(err) => {
                    let _ = reply.send(Err(err.into()));
                }
            },
            TaskCompletion::Signature { transaction, reply } => match result {
                Ok(DeviceReply::Signature(signature)) => {
                    let signed = self.codec.attach_signature(transaction, signature);
                    let _ = reply.send(Ok(Some(signed)));
                }
                Ok(reply_kind) => {
                    warn!(task = task.id, ?reply_kind, "unexpected device reply");
                    let _ = reply.send(Err(SignerError::Unknown(
                        "unexpected device reply".to_string(),
                    )));
                }
                Err(TransportError::Rejected) => {
                    let _ = reply.send(Ok(None));
                }
                Err(err) => {
                    let _ = reply.send(Err(err.into()));
                }
            },
        }
        self.pump(now);
    }

    /// Applies a probe outcome to the hub's device tracking.
    ///
    /// On an identity change the new device is installed first, then tasks
    /// aimed at the old device are cancelled, so no cancelled caller can
    /// race a retry against stale identity state.
    fn on_probe_result(&mut self, result: Result<DeviceReply, TransportError>, now: Timestamp) {
        self.queue.probe_completed(now);
        match result {
            Ok(DeviceReply::PublicKey(public_key)) => {
                self.device_absent = false;
                let fingerprint = DeviceFingerprint::from_public_key(&public_key);
                let previous = self.status_tx.borrow().fingerprint;
                if previous == Some(fingerprint) {
                    self.cache
                        .insert(REFERENCE_SLOT, AccountInfo::from_public_key(public_key));
                    return;
                }
                info!(%fingerprint, "device identity observed");
                self.cache.set_device(fingerprint);
                self.cache
                    .insert(REFERENCE_SLOT, AccountInfo::from_public_key(public_key));
                self.publish_status(Some(fingerprint));
                let _ = self.event_tx.send(HubEvent::DeviceChanged { fingerprint });
                if previous.is_some() {
                    // Identity swap: work queued for the old device is void.
                    self.fail_all_regular(SignerError::DeviceUnreachable);
                    self.queue.reset_pacing(now);
                }
            }
            Ok(reply_kind) => {
                warn!(?reply_kind, "unexpected probe reply");
            }
            Err(err) if Self::indicates_absence(&err) => {
                self.device_absent = true;
                if self.status_tx.borrow().fingerprint.is_some() {
                    info!(%err, "device lost");
                    self.cache.clear_device();
                    self.publish_status(None);
                    let _ = self.event_tx.send(HubEvent::DeviceLost);
                    self.fail_all_regular(SignerError::DeviceUnreachable);
                }
            }
            // Locked or busy devices are present; leave tracking untouched.
            Err(err) => {
                debug!(%err, "probe failed transiently");
            }
        }
    }

    /// Probe errors that mean "no device", as opposed to a device that is
    /// present but locked or busy.
    fn indicates_absence(err: &TransportError) -> bool {
        matches!(
            err,
            TransportError::NotFound | TransportError::Disconnected | TransportError::Timeout(_)
        )
    }

    fn fail_all_regular(&mut self, err: SignerError) {
        let cancelled = self.queue.cancel_all_regular();
        for id in cancelled {
            if let Some(completion) = self.completions.remove(&id) {
                Self::settle_error(completion, err.clone());
            }
        }
    }

    fn publish_status(&self, fingerprint: Option<DeviceFingerprint>) {
        self.status_tx.send_replace(DeviceStatus {
            fingerprint,
            platform_supported: self.platform_supported,
        });
    }

    fn settle_error(completion: TaskCompletion, err: SignerError) {
        match completion {
            TaskCompletion::Probe => {}
            TaskCompletion::Account { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            TaskCompletion::Confirm { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            TaskCompletion::AccountThenSign { reply, .. }
            | TaskCompletion::Signature { reply, .. } => {
                let _ = reply.send(Err(err));
            }
        }
    }

    /// Runs one scheduling pass and dispatches at most one exchange.
    fn pump(&mut self, now: Timestamp) {
        if !self.platform_supported {
            return;
        }
        match self.queue.next_action(now) {
            NextAction::Busy | NextAction::WaitSpacing | NextAction::Idle => {}
            NextAction::Probe => {
                let id = self.queue.start_probe(now);
                self.completions.insert(id, TaskCompletion::Probe);
                debug!(task = id, "dispatching identity probe");
                self.spawn_exchange(
                    id,
                    DeviceRequest::GetPublicKey {
                        slot: REFERENCE_SLOT,
                    },
                    self.config.short_timeout,
                );
            }
            NextAction::Dispatch(id) => {
                if let Some(kind) = self.queue.start(id, now) {
                    let timeout = if kind.requires_confirmation() {
                        self.config.long_timeout
                    } else {
                        self.config.short_timeout
                    };
                    debug!(task = id, ?timeout, "dispatching task");
                    self.spawn_exchange(id, Self::request_for(kind), timeout);
                }
            }
        }
    }

    fn request_for(kind: TaskKind) -> DeviceRequest {
        match kind {
            TaskKind::Probe => DeviceRequest::GetPublicKey {
                slot: REFERENCE_SLOT,
            },
            TaskKind::GetPublicKey {
                slot,
                confirm: false,
            } => DeviceRequest::GetPublicKey { slot },
            TaskKind::GetPublicKey {
                slot,
                confirm: true,
            } => DeviceRequest::GetPublicKeyConfirm { slot },
            TaskKind::Sign { slot, payload } => DeviceRequest::SignPayload { slot, payload },
        }
    }

    /// Runs the exchange on its own task and reports back as a command.
    /// The deadline is enforced here as well as in the transport.
    fn spawn_exchange(&self, task: TaskId, request: DeviceRequest, timeout: Duration) {
        let transport = Arc::clone(&self.transport);
        let tx = self.command_tx.clone();
        tokio::spawn(async move {
            let result = match time::timeout(timeout, transport.exchange(request, timeout)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(TransportError::Timeout(timeout)),
            };
            let _ = tx.send(HubCommand::ExchangeFinished { task, result }).await;
        });
    }

    /// Periodic countdown while a confirmation waits on the device.
    fn emit_countdown(&self, now: Timestamp) {
        let Some(id) = self.queue.executing() else {
            return;
        };
        let Some(task) = self.queue.task(id) else {
            return;
        };
        if !task.kind.requires_confirmation() {
            return;
        }
        let Some(started) = self.queue.last_dispatch_at() else {
            return;
        };
        let budget = self.config.long_timeout.as_millis() as u64;
        let remaining_ms = budget.saturating_sub(now.saturating_sub(started));
        let _ = self
            .event_tx
            .send(HubEvent::ConfirmationCountdown { remaining_ms });
    }

    /// Settles everything still outstanding as cancelled.
    fn drain_on_shutdown(&mut self) {
        let cancelled = self.queue.cancel_all_regular();
        for id in cancelled {
            if let Some(completion) = self.completions.remove(&id) {
                Self::settle_error(completion, SignerError::Cancelled);
            }
        }
        for (_, completion) in self.completions.drain() {
            Self::settle_error(completion, SignerError::Cancelled);
        }
    }
}
