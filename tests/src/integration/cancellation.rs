//! # Cancellation Scenarios
//!
//! Closing a channel cancels its tasks without aborting in-flight device
//! exchanges; late results are discarded; device swap and loss void queued
//! work; declines are answers, not failures.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time;

    use hw_signer::{HardwareSignerApi, MockDevice, SignerError, TransportError};

    use crate::integration::{fingerprint_of, spawn_hub, transaction};

    /// Closing a channel settles its pending and in-flight work as
    /// cancelled, while other channels keep working.
    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_and_in_flight() {
        let device = MockDevice::new(1).with_confirm_latency(Duration::from_secs(10));
        let hub = spawn_hub(&device);
        let doomed = Arc::new(hub.open_channel().await.unwrap());
        let survivor = hub.open_channel().await.unwrap();

        let in_flight = {
            let doomed = Arc::clone(&doomed);
            tokio::spawn(async move { doomed.confirm_account(1).await })
        };
        let queued = {
            let doomed = Arc::clone(&doomed);
            tokio::spawn(async move { doomed.get_account(2, false).await })
        };
        // Let the confirmation reach the device.
        time::sleep(Duration::from_secs(1)).await;
        doomed.close().await;

        assert_eq!(in_flight.await.unwrap(), Err(SignerError::Cancelled));
        assert_eq!(queued.await.unwrap(), Err(SignerError::Cancelled));

        // The hub recovers once the orphaned exchange drains.
        let info = survivor.get_account(3, false).await.unwrap();
        assert_eq!(info.public_key, MockDevice::mock_public_key(1, 3));
    }

    /// The orphaned exchange's late result must not leak anywhere.
    #[tokio::test(start_paused = true)]
    async fn test_late_result_is_discarded() {
        let device = MockDevice::new(1).with_confirm_latency(Duration::from_secs(10));
        let hub = spawn_hub(&device);
        let channel = Arc::new(hub.open_channel().await.unwrap());

        let pending = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move { channel.confirm_account(1).await })
        };
        time::sleep(Duration::from_secs(1)).await;
        channel.close().await;
        assert_eq!(pending.await.unwrap(), Err(SignerError::Cancelled));

        // Outlive the orphaned exchange; the hub must stay healthy.
        time::sleep(Duration::from_secs(15)).await;
        let fresh = hub.open_channel().await.unwrap();
        assert!(fresh.get_account(2, false).await.is_ok());
    }

    /// Close is idempotent and later calls fail fast.
    #[tokio::test(start_paused = true)]
    async fn test_double_close_is_idempotent() {
        let device = MockDevice::new(1);
        let hub = spawn_hub(&device);
        let channel = hub.open_channel().await.unwrap();

        channel.close().await;
        channel.close().await;
        assert_eq!(channel.get_account(0, false).await, Err(SignerError::Cancelled));
    }

    /// Dropping a channel without closing it still cleans up.
    #[tokio::test(start_paused = true)]
    async fn test_drop_closes_channel() {
        let device = MockDevice::new(1);
        let hub = spawn_hub(&device);

        let first_id = {
            let channel = hub.open_channel().await.unwrap();
            channel.get_account(1, false).await.unwrap();
            channel.id()
        };

        let second = hub.open_channel().await.unwrap();
        assert!(second.id() > first_id);
        assert!(second.get_account(2, false).await.is_ok());
    }

    /// A device swap voids work queued for the old device.
    #[tokio::test(start_paused = true)]
    async fn test_device_swap_voids_queued_work() {
        let device = MockDevice::new(1).with_confirm_latency(Duration::from_secs(5));
        let hub = spawn_hub(&device);
        let channel = Arc::new(hub.open_channel().await.unwrap());

        let in_flight = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move { channel.confirm_account(1).await })
        };
        let queued = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move { channel.get_account(2, false).await })
        };
        time::sleep(Duration::from_secs(1)).await;
        device.swap_device(9);

        // The next probe observes the new identity and cancels the queued
        // read before it can run against the wrong device.
        assert_eq!(
            queued.await.unwrap(),
            Err(SignerError::DeviceUnreachable)
        );
        let _ = in_flight.await.unwrap();

        let mut status = hub.status();
        status
            .wait_for(|s| s.fingerprint == Some(fingerprint_of(9)))
            .await
            .unwrap();
    }

    /// Losing the device fails queued work and fast-fails new requests
    /// until it returns.
    #[tokio::test(start_paused = true)]
    async fn test_device_loss_fails_queued_and_new_work() {
        let device = MockDevice::new(1);
        let hub = spawn_hub(&device);
        let channel = hub.open_channel().await.unwrap();
        channel.get_account(1, false).await.unwrap();

        device.unplug();
        let mut status = hub.status();
        status.wait_for(|s| s.fingerprint.is_none()).await.unwrap();

        // Absence is now established; no exchange should even be attempted.
        let before = device.exchange_log().len();
        assert_eq!(
            channel.get_account(2, false).await,
            Err(SignerError::DeviceUnreachable)
        );
        assert_eq!(device.exchange_log().len(), before);
    }

    /// Declines surface as answers; real faults surface as errors.
    #[tokio::test(start_paused = true)]
    async fn test_rejection_is_not_a_fault() {
        let device = MockDevice::new(1);
        let hub = spawn_hub(&device);
        let channel = hub.open_channel().await.unwrap();

        device.reject_confirmations(true);
        assert_eq!(channel.confirm_account(1).await, Ok(false));
        assert_eq!(channel.sign_transaction(1, transaction()).await, Ok(None));

        // The device identity is unaffected by declines.
        assert!(hub.status().borrow().fingerprint.is_some());

        device.reject_confirmations(false);
        assert_eq!(channel.confirm_account(1).await, Ok(true));
    }

    /// A locked device is reported as locked, not as missing.
    #[tokio::test(start_paused = true)]
    async fn test_locked_device_surfaces_as_locked() {
        let device = MockDevice::new(1);
        let hub = spawn_hub(&device);
        let channel = hub.open_channel().await.unwrap();
        channel.get_account(1, false).await.unwrap();

        device.set_locked(true);
        assert_eq!(
            channel.get_account(2, false).await,
            Err(SignerError::DeviceLocked)
        );

        device.set_locked(false);
        assert!(channel.get_account(2, false).await.is_ok());
    }

    /// A confirmation the human never answers expires with a timeout,
    /// which is distinct from an explicit rejection.
    #[tokio::test(start_paused = true)]
    async fn test_unanswered_confirmation_times_out() {
        let device = MockDevice::new(1).with_confirm_latency(Duration::from_secs(60));
        let hub = spawn_hub(&device);
        let channel = hub.open_channel().await.unwrap();

        assert_eq!(
            channel.confirm_account(1).await,
            Err(SignerError::Timeout { timeout_ms: 30_000 })
        );
    }

    /// An injected transient fault maps into the public error taxonomy.
    #[tokio::test(start_paused = true)]
    async fn test_transient_fault_maps_to_unknown() {
        let device = MockDevice::new(1);
        let hub = spawn_hub(&device);
        let channel = hub.open_channel().await.unwrap();
        channel.get_account(1, false).await.unwrap();

        device.fail_next(TransportError::Other("APDU 0x6f00".to_string()));
        let err = channel.get_account(2, false).await.unwrap_err();
        assert_eq!(err, SignerError::Unknown("APDU 0x6f00".to_string()));

        assert!(channel.get_account(2, false).await.is_ok());
    }
}
