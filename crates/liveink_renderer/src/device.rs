//! Device-state gating seam.
//!
//! Device/tablet enumeration lives outside the engine. The handoff logic
//! only ever asks one question of it: is a given device currently up?

use liveink_core::DeviceId;

/// Reports the up/down state of input devices.
pub trait DeviceTracker: Send + Sync {
    /// Whether the device is currently up (not in contact). Unknown devices
    /// report up.
    fn is_device_up(&self, device: DeviceId) -> bool;
}

/// Default tracker with no device enumeration: every device reports up.
#[derive(Debug, Default)]
pub struct NoDeviceTracker;

impl DeviceTracker for NoDeviceTracker {
    fn is_device_up(&self, _device: DeviceId) -> bool {
        true
    }
}
