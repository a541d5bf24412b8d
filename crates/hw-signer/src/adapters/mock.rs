//! In-process mock device for tests and demos.
//!
//! Behaves like a pluggable signing device: it can be unplugged, swapped for
//! a device with a different seed, locked, or told to decline
//! confirmations. Keys and signatures are deterministic functions of the
//! seed, so assertions can predict them.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time;

use crate::domain::{PublicKey, Signature};
use crate::ports::{DeviceReply, DeviceRequest, DeviceTransport, TransportError};

#[derive(Debug)]
struct MockState {
    plugged: bool,
    locked: bool,
    reject_confirmations: bool,
    seed: u64,
    fail_next: Option<TransportError>,
    log: Vec<DeviceRequest>,
    in_flight: usize,
    max_in_flight: usize,
}

/// Releases the in-flight slot even when the exchange future is dropped
/// mid-await, as happens when the hub's deadline fires first.
struct InFlightGuard {
    state: Arc<Mutex<MockState>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.in_flight -= 1;
    }
}

/// Mock implementation of [`DeviceTransport`].
#[derive(Clone)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
    latency: Duration,
    confirm_latency: Duration,
    supported: bool,
}

impl MockDevice {
    /// A plugged-in, unlocked device with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                plugged: true,
                locked: false,
                reject_confirmations: false,
                seed,
                fail_next: None,
                log: Vec::new(),
                in_flight: 0,
                max_in_flight: 0,
            })),
            latency: Duration::ZERO,
            confirm_latency: Duration::ZERO,
            supported: true,
        }
    }

    /// Adds a fixed delay to every exchange.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Adds an extra delay to confirmation exchanges, simulating a human
    /// deliberating at the device.
    pub fn with_confirm_latency(mut self, latency: Duration) -> Self {
        self.confirm_latency = latency;
        self
    }

    /// Reports the platform as unable to reach devices.
    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }

    /// Simulates unplugging the device.
    pub fn unplug(&self) {
        self.lock().plugged = false;
    }

    /// Simulates plugging the device back in.
    pub fn plug(&self) {
        self.lock().plugged = true;
    }

    /// Replaces the device with one holding a different seed.
    pub fn swap_device(&self, seed: u64) {
        let mut state = self.lock();
        state.seed = seed;
        state.plugged = true;
        state.locked = false;
    }

    /// Locks or unlocks the device.
    pub fn set_locked(&self, locked: bool) {
        self.lock().locked = locked;
    }

    /// Makes the device decline every confirmation prompt.
    pub fn reject_confirmations(&self, reject: bool) {
        self.lock().reject_confirmations = reject;
    }

    /// Fails the next exchange with `err`, then recovers.
    pub fn fail_next(&self, err: TransportError) {
        self.lock().fail_next = Some(err);
    }

    /// Every request received so far, in arrival order.
    pub fn exchange_log(&self) -> Vec<DeviceRequest> {
        self.lock().log.clone()
    }

    /// Highest number of exchanges ever observed concurrently. The hub's
    /// single-flight rule keeps this at 1.
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deterministic public key: seed in the first 8 bytes (so the seed is
    /// the device fingerprint), slot after that.
    pub fn mock_public_key(seed: u64, slot: u32) -> PublicKey {
        let mut key = [0u8; 32];
        key[..8].copy_from_slice(&seed.to_be_bytes());
        key[8..12].copy_from_slice(&slot.to_be_bytes());
        key
    }

    /// Deterministic 64-byte signature over seed, slot, and payload.
    pub fn mock_signature(seed: u64, slot: u32, payload: &[u8]) -> Signature {
        let mut bytes = vec![0u8; 64];
        bytes[..8].copy_from_slice(&seed.to_be_bytes());
        bytes[8..12].copy_from_slice(&slot.to_be_bytes());
        bytes[12..20].copy_from_slice(&(payload.len() as u64).to_be_bytes());
        for (i, b) in payload.iter().enumerate() {
            bytes[20 + (i % 44)] ^= b;
        }
        Signature(bytes)
    }

    fn reply_for(&self, request: &DeviceRequest) -> Result<DeviceReply, TransportError> {
        let state = self.lock();
        if !state.plugged {
            return Err(TransportError::NotFound);
        }
        if state.locked {
            return Err(TransportError::Locked);
        }
        match request {
            DeviceRequest::GetPublicKey { slot } => Ok(DeviceReply::PublicKey(
                Self::mock_public_key(state.seed, *slot),
            )),
            DeviceRequest::GetPublicKeyConfirm { slot } => {
                if state.reject_confirmations {
                    Err(TransportError::Rejected)
                } else {
                    Ok(DeviceReply::PublicKey(Self::mock_public_key(
                        state.seed, *slot,
                    )))
                }
            }
            DeviceRequest::SignPayload { slot, payload } => {
                if state.reject_confirmations {
                    Err(TransportError::Rejected)
                } else {
                    Ok(DeviceReply::Signature(Self::mock_signature(
                        state.seed, *slot, payload,
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl DeviceTransport for MockDevice {
    async fn exchange(
        &self,
        request: DeviceRequest,
        _timeout: Duration,
    ) -> Result<DeviceReply, TransportError> {
        let injected = {
            let mut state = self.lock();
            state.log.push(request.clone());
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.fail_next.take()
        };
        let _guard = InFlightGuard {
            state: Arc::clone(&self.state),
        };

        time::sleep(self.latency).await;
        let is_confirm = matches!(
            request,
            DeviceRequest::GetPublicKeyConfirm { .. } | DeviceRequest::SignPayload { .. }
        );
        if is_confirm {
            time::sleep(self.confirm_latency).await;
        }

        match injected {
            Some(err) => Err(err),
            None => self.reply_for(&request),
        }
    }

    fn is_supported(&self) -> bool {
        self.supported
    }
}
