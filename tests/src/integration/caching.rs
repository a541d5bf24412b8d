//! # Caching Scenarios
//!
//! Account reads are cached per device identity. The cache must survive
//! channel churn, and must flush on device swap or loss.

#[cfg(test)]
mod tests {
    use hw_signer::{DeviceRequest, HardwareSignerApi, HubEvent, MockDevice};

    use crate::integration::{fingerprint_of, spawn_hub};

    fn reads_of_slot(device: &MockDevice, slot: u32) -> usize {
        device
            .exchange_log()
            .iter()
            .filter(|r| matches!(r, DeviceRequest::GetPublicKey { slot: s } if *s == slot))
            .count()
    }

    /// The cache belongs to the hub, not the channel: a second consumer
    /// reuses entries populated by the first.
    #[tokio::test(start_paused = true)]
    async fn test_cache_survives_channel_close() {
        let device = MockDevice::new(5);
        let hub = spawn_hub(&device);

        let first = hub.open_channel().await.unwrap();
        let info_a = first.get_account(2, false).await.unwrap();
        first.close().await;

        let second = hub.open_channel().await.unwrap();
        let info_b = second.get_account(2, false).await.unwrap();

        assert_eq!(info_a, info_b);
        assert_eq!(reads_of_slot(&device, 2), 1);
    }

    /// The probe pre-populates the reference slot, so reading it never
    /// costs an extra exchange.
    #[tokio::test(start_paused = true)]
    async fn test_reference_slot_served_from_probe() {
        let device = MockDevice::new(5);
        let hub = spawn_hub(&device);
        let channel = hub.open_channel().await.unwrap();

        let mut status = hub.status();
        status.wait_for(|s| s.fingerprint.is_some()).await.unwrap();

        let before = device.exchange_log().len();
        let info = channel.get_account(0, false).await.unwrap();
        assert_eq!(info.public_key, MockDevice::mock_public_key(5, 0));
        assert_eq!(device.exchange_log().len(), before);
    }

    /// Swapping the physical device must flush the cache and republish
    /// identity.
    #[tokio::test(start_paused = true)]
    async fn test_device_swap_invalidates_cache() {
        let device = MockDevice::new(1);
        let hub = spawn_hub(&device);
        // Subscribe before the first probe can announce the device.
        let mut events = hub.events();
        let channel = hub.open_channel().await.unwrap();

        let old = channel.get_account(2, false).await.unwrap();
        assert_eq!(old.public_key, MockDevice::mock_public_key(1, 2));

        device.swap_device(9);
        let mut status = hub.status();
        status
            .wait_for(|s| s.fingerprint == Some(fingerprint_of(9)))
            .await
            .unwrap();

        let new = channel.get_account(2, false).await.unwrap();
        assert_eq!(new.public_key, MockDevice::mock_public_key(9, 2));
        assert_eq!(reads_of_slot(&device, 2), 2);

        let mut changes = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let HubEvent::DeviceChanged { fingerprint } = event {
                changes.push(fingerprint);
            }
        }
        assert_eq!(changes, vec![fingerprint_of(1), fingerprint_of(9)]);
    }

    /// Unplugging flushes the cache even when the same device returns.
    #[tokio::test(start_paused = true)]
    async fn test_device_loss_flushes_cache() {
        let device = MockDevice::new(1);
        let hub = spawn_hub(&device);
        let channel = hub.open_channel().await.unwrap();
        let mut events = hub.events();

        channel.get_account(2, false).await.unwrap();

        device.unplug();
        let mut status = hub.status();
        status.wait_for(|s| s.fingerprint.is_none()).await.unwrap();

        device.plug();
        status.wait_for(|s| s.fingerprint.is_some()).await.unwrap();

        channel.get_account(2, false).await.unwrap();
        assert_eq!(reads_of_slot(&device, 2), 2);

        let lost = {
            let mut seen = false;
            while let Ok(event) = events.try_recv() {
                if event == HubEvent::DeviceLost {
                    seen = true;
                }
            }
            seen
        };
        assert!(lost, "device loss must be announced");
    }

    /// A confirmed account read also lands in the cache.
    #[tokio::test(start_paused = true)]
    async fn test_confirmation_populates_cache() {
        let device = MockDevice::new(5);
        let hub = spawn_hub(&device);
        let channel = hub.open_channel().await.unwrap();

        assert_eq!(channel.confirm_account(3).await, Ok(true));

        let before = device.exchange_log().len();
        channel.get_account(3, false).await.unwrap();
        assert_eq!(device.exchange_log().len(), before);
    }
}
