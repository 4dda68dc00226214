//! Controller input binding
//!
//! Maps application-defined controls onto the physical elements of two
//! tracked hand controllers.
//!
//! # Architecture
//!
//! - [`BindingManager`] holds the per-control callbacks and a set of named
//!   profiles ([`BindingSet`]), one of which is selected
//! - every change to the selected profile recomputes the affected slots of
//!   [`ControllerBindings`], the live dispatch tables
//! - the device layer feeds raw samples and button edges into the tables
//!   through [`DeviceSource`] and [`DeviceEvent`]
//!
//! Several controls may share a physical button; their callbacks are chained
//! in control order. An axis slot drives one control at a time, the most
//! recently bound.
//!
//! # Thread Safety
//!
//! The manager is a handle over a `RwLock`. Application callbacks are never
//! invoked while it is held.

pub mod axis;
pub mod binding;
pub mod capture;
pub mod controller;
pub mod device;
pub mod directory;
pub mod error;
pub mod manager;
pub mod names;
pub mod types;

pub use axis::AxisTransform;
pub use binding::{AxisBinding, AxisParams, AxisSlot, ButtonActions, ButtonBinding};
pub use capture::{AxisCalibration, AxisCapture, DeflectionDetector};
pub use controller::{AxisCaptureFn, ButtonCaptureFn, ControllerBindings};
pub use device::{AxisKind, AxisSamples, DeviceEvent, DeviceId, DeviceSource};
pub use directory::BindingSet;
pub use error::{BindError, BindResult};
pub use manager::{BindingManager, DEFAULT_PROFILE};
pub use names::{action_name, axis_name, button_from_name, button_name, hand_name};
pub use types::{
    Action, AxisDirection, AxisFn, ButtonFn, Control, Hand, MAX_ACTIONS, MAX_AXES,
    MAX_AXIS_DIRECTIONS, MAX_BUTTONS, MAX_HANDS,
};
