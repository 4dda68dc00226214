// vrbind: input binding for tracked hand controllers

pub mod config;
pub mod input;

pub use config::{BoundsCheck, EngineConfig};
pub use input::{
    Action, AxisBinding, AxisDirection, AxisParams, BindError, BindResult, BindingManager,
    ButtonActions, ButtonBinding, Control, DeviceEvent, DeviceSource, Hand,
};
