//! Device layer interface
//!
//! The engine never talks to hardware. Device enumeration, hand-role
//! resolution and sampling are provided by the embedding application through
//! [`DeviceSource`], and edge events are fed in as [`DeviceEvent`]s.

use super::types::{Action, Hand, MAX_AXES};

/// Tracked device index as assigned by the device layer
pub type DeviceId = u32;

/// Raw X/Y sample of every axis on one controller
pub type AxisSamples = [[f32; 2]; MAX_AXES];

/// What kind of physical element an axis is, as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    None,
    TrackPad,
    Joystick,
    Trigger,
    Unknown,
}

/// Source of device topology and raw samples.
pub trait DeviceSource {
    /// Every tracked controller with the hand role it currently reports,
    /// in device index order
    fn controllers(&self) -> Vec<(DeviceId, Hand)>;

    /// Hand role currently reported by one device
    fn role(&self, device: DeviceId) -> Hand;

    /// Current raw sample of every axis, or `None` if the device cannot be read
    fn axis_samples(&self, device: DeviceId) -> Option<AxisSamples>;

    /// Model string for a device
    fn model_name(&self, _device: DeviceId) -> String {
        String::new()
    }

    fn axis_kind(&self, _device: DeviceId, _axis: u32) -> AxisKind {
        AxisKind::Unknown
    }
}

/// Topology change or button edge reported by the device layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    Activated(DeviceId),
    Deactivated(DeviceId),
    RoleChanged(DeviceId),
    Button {
        device: DeviceId,
        button: u32,
        action: Action,
    },
}
