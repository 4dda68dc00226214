//! Physical dispatch tables
//!
//! Dense tables holding the currently effective consumer of every physical
//! element: one axis transform unit per (hand, axis, direction) and one button
//! consumer per (action, hand, button). Also owns hand resolution, the
//! execute/poll paths and capture mode.
//!
//! Every `resolve_*` method returns the consumers that would run without
//! running them, so a caller holding a lock can release it before invoking
//! application code.

use std::array;
use std::fmt;
use std::sync::Arc;

use crate::config::{BoundsCheck, EngineConfig};

use super::axis::AxisTransform;
use super::binding::{AxisBinding, AxisParams, AxisSlot, ButtonActions, ButtonBinding};
use super::capture::{AxisCalibration, AxisCapture, DeflectionDetector};
use super::device::{DeviceEvent, DeviceId, DeviceSource};
use super::error::{BindError, BindResult};
use super::names::{self, button_name, hand_name};
use super::types::{
    Action, AxisDirection, AxisFn, ButtonFn, Hand, MAX_ACTIONS, MAX_AXES, MAX_AXIS_DIRECTIONS,
    MAX_BUTTONS, MAX_HANDS,
};

/// Receives the button pressed while capturing
pub type ButtonCaptureFn = Arc<dyn Fn(ButtonBinding) + Send + Sync>;
/// Receives the axis deflected while capturing
pub type AxisCaptureFn = Arc<dyn Fn(AxisCapture) + Send + Sync>;

fn noop_button() -> ButtonFn {
    Arc::new(|| {})
}

struct ButtonSlot {
    func: ButtonFn,
    bound: bool,
}

impl ButtonSlot {
    fn unbound() -> Self {
        Self {
            func: noop_button(),
            bound: false,
        }
    }
}

/// Live dispatch state for both hand controllers
pub struct ControllerBindings {
    config: EngineConfig,
    axes: [[[AxisTransform; MAX_AXIS_DIRECTIONS]; MAX_AXES]; MAX_HANDS],
    buttons: [[[ButtonSlot; MAX_BUTTONS]; MAX_HANDS]; MAX_ACTIONS],
    enabled: [bool; MAX_HANDS],
    device_ids: [DeviceId; MAX_HANDS],
    names: [String; MAX_HANDS],
    calibration: AxisCalibration,
}

impl Default for ControllerBindings {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ControllerBindings {
    /// Create tables with every slot unbound and every hand enabled
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            axes: array::from_fn(|_| array::from_fn(|_| array::from_fn(|_| AxisTransform::new()))),
            buttons: array::from_fn(|_| array::from_fn(|_| array::from_fn(|_| ButtonSlot::unbound()))),
            enabled: [true; MAX_HANDS],
            device_ids: [0; MAX_HANDS],
            names: array::from_fn(|_| String::new()),
            calibration: AxisCalibration::new(),
        }
    }

    /// Resolve hands and model names from the device layer
    pub fn init(&mut self, source: &dyn DeviceSource) {
        self.update_hands(source);
        self.update_names(source);
        log::info!(
            "Controller bindings initialised: {} axis slots, {} button slots",
            MAX_HANDS * MAX_AXES * MAX_AXIS_DIRECTIONS,
            MAX_ACTIONS * MAX_HANDS * MAX_BUTTONS
        );
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- index validation ---

    fn check_index(&self, kind: &'static str, index: u32, max: usize) -> Option<usize> {
        let index = index as usize;
        if self.config.bounds_check == BoundsCheck::Checked && index >= max {
            log::error!("{}", BindError::InvalidIndex { kind, index, max });
            return None;
        }
        Some(index)
    }

    fn axis_unit(&self, hand: Hand, axis: u32, direction: AxisDirection) -> Option<&AxisTransform> {
        let axis = self.check_index("axis", axis, MAX_AXES)?;
        Some(&self.axes[hand.index()][axis][direction.index()])
    }

    fn axis_unit_mut(
        &mut self,
        hand: Hand,
        axis: u32,
        direction: AxisDirection,
    ) -> Option<&mut AxisTransform> {
        let axis = self.check_index("axis", axis, MAX_AXES)?;
        Some(&mut self.axes[hand.index()][axis][direction.index()])
    }

    fn button_slot(&self, hand: Hand, button: u32, action: Action) -> Option<&ButtonSlot> {
        let button = self.check_index("button", button, MAX_BUTTONS)?;
        Some(&self.buttons[action.index()][hand.index()][button])
    }

    fn button_slot_mut(&mut self, hand: Hand, button: u32, action: Action) -> Option<&mut ButtonSlot> {
        let button = self.check_index("button", button, MAX_BUTTONS)?;
        Some(&mut self.buttons[action.index()][hand.index()][button])
    }

    // --- axis binding ---

    /// Bind an axis slot with a full parameter set
    pub fn bind_axis(
        &mut self,
        hand: Hand,
        axis: u32,
        direction: AxisDirection,
        func: AxisFn,
        params: &AxisParams,
    ) {
        log::debug!("Binding {:?} axis {} {:?}", hand, axis, direction);
        if let Some(unit) = self.axis_unit_mut(hand, axis, direction) {
            unit.bind(func, params);
        }
    }

    /// Bind a one-sided axis (such as a trigger) across the full output range
    pub fn bind_axis_half(
        &mut self,
        hand: Hand,
        axis: u32,
        direction: AxisDirection,
        func: AxisFn,
        flip: bool,
    ) {
        self.bind_axis(hand, axis, direction, func, &AxisParams::half(flip));
    }

    pub fn bind_axis_with(&mut self, binding: &AxisBinding, func: AxisFn) {
        self.bind_axis(binding.hand, binding.axis, binding.direction, func, &binding.params);
    }

    /// Attach a consumer reusing the parameters the slot was last given
    pub fn bind_axis_consumer(
        &mut self,
        hand: Hand,
        axis: u32,
        direction: AxisDirection,
        func: AxisFn,
    ) {
        if let Some(unit) = self.axis_unit_mut(hand, axis, direction) {
            unit.bind_consumer(func);
        }
    }

    /// Attach a consumer that receives raw samples, ignoring slot parameters
    pub fn bind_axis_passthrough(
        &mut self,
        hand: Hand,
        axis: u32,
        direction: AxisDirection,
        func: AxisFn,
    ) {
        if let Some(unit) = self.axis_unit_mut(hand, axis, direction) {
            unit.bind_passthrough(func);
        }
    }

    pub fn unbind_axis(&mut self, hand: Hand, axis: u32, direction: AxisDirection) {
        log::debug!("Unbinding {:?} axis {} {:?}", hand, axis, direction);
        if let Some(unit) = self.axis_unit_mut(hand, axis, direction) {
            unit.unbind();
        }
    }

    /// Unbind every axis of one hand
    pub fn unbind_axis_any(&mut self, hand: Hand) {
        for unit in self.axes[hand.index()].iter_mut().flatten() {
            unit.unbind();
        }
    }

    /// Unbind every axis of both tracked hands
    pub fn unbind_axis_any_all(&mut self) {
        for hand in Hand::TRACKED {
            self.unbind_axis_any(hand);
        }
    }

    pub fn unbind_axis_with(&mut self, binding: &AxisBinding) {
        self.unbind_axis(binding.hand, binding.axis, binding.direction);
    }

    /// The transform unit behind a slot
    pub fn axis(&self, hand: Hand, axis: u32, direction: AxisDirection) -> Option<&AxisTransform> {
        self.axis_unit(hand, axis, direction)
    }

    // --- button binding ---

    pub fn bind_button(&mut self, hand: Hand, button: u32, action: Action, func: ButtonFn) {
        log::debug!(
            "Binding {} {} {}",
            hand_name(hand),
            button_name(button),
            names::action_name(action)
        );
        if let Some(slot) = self.button_slot_mut(hand, button, action) {
            slot.func = func;
            slot.bound = true;
        }
    }

    /// Bind press on every button of one hand
    pub fn bind_button_any(&mut self, hand: Hand, func: ButtonFn) {
        for slot in self.buttons[Action::Press.index()][hand.index()].iter_mut() {
            slot.func = func.clone();
            slot.bound = true;
        }
    }

    /// Bind press on every button of both tracked hands
    pub fn bind_button_any_all(&mut self, func: ButtonFn) {
        for hand in Hand::TRACKED {
            self.bind_button_any(hand, func.clone());
        }
    }

    /// Bind the callbacks present in `actions` to the slots a binding covers.
    ///
    /// Actions without a callback are left as they are. Wildcard bindings only
    /// accept a press callback.
    pub fn bind_button_set(
        &mut self,
        binding: &ButtonBinding,
        actions: &ButtonActions,
    ) -> BindResult<()> {
        if binding.is_wildcard() {
            if let Some(action) = actions.first_non_press() {
                let err = BindError::UnsupportedWildcardAction {
                    binding: *binding,
                    action,
                };
                log::warn!("{}", err);
                return Err(err);
            }
        }

        match *binding {
            ButtonBinding::Specific { hand, button } => {
                for action in Action::ALL {
                    if let Some(func) = actions.get(action) {
                        self.bind_button(hand, button, action, func.clone());
                    }
                }
            }
            ButtonBinding::AnyOnHand(hand) => match &actions.press {
                Some(func) => self.bind_button_any(hand, func.clone()),
                None => log::warn!("Binding {} without a press callback", binding),
            },
            ButtonBinding::AnyAll => match &actions.press {
                Some(func) => self.bind_button_any_all(func.clone()),
                None => log::warn!("Binding {} without a press callback", binding),
            },
        }
        Ok(())
    }

    pub fn unbind_button(&mut self, hand: Hand, button: u32, action: Action) {
        if let Some(slot) = self.button_slot_mut(hand, button, action) {
            *slot = ButtonSlot::unbound();
        }
    }

    /// Unbind every action of every button on one hand
    pub fn unbind_button_any(&mut self, hand: Hand) {
        for per_action in self.buttons.iter_mut() {
            for slot in per_action[hand.index()].iter_mut() {
                *slot = ButtonSlot::unbound();
            }
        }
    }

    /// Unbind every button of both tracked hands
    pub fn unbind_button_any_all(&mut self) {
        for hand in Hand::TRACKED {
            self.unbind_button_any(hand);
        }
    }

    pub fn unbind_button_set(&mut self, binding: &ButtonBinding) {
        match *binding {
            ButtonBinding::Specific { hand, button } => {
                for action in Action::ALL {
                    self.unbind_button(hand, button, action);
                }
            }
            ButtonBinding::AnyOnHand(hand) => self.unbind_button_any(hand),
            ButtonBinding::AnyAll => self.unbind_button_any_all(),
        }
    }

    /// Whether a button slot holds a real consumer
    pub fn is_button_bound(&self, hand: Hand, button: u32, action: Action) -> bool {
        self.button_slot(hand, button, action)
            .map_or(false, |slot| slot.bound)
    }

    // --- hands ---

    pub fn hand_enabled(&self, hand: Hand) -> bool {
        self.enabled[hand.index()]
    }

    /// Override a hand's enable flag until the next topology update
    pub fn set_hand_enabled(&mut self, hand: Hand, enabled: bool) {
        self.enabled[hand.index()] = enabled;
    }

    pub fn device_id(&self, hand: Hand) -> DeviceId {
        self.device_ids[hand.index()]
    }

    /// Cached model string of the controller in a hand
    pub fn device_name(&self, hand: Hand) -> &str {
        &self.names[hand.index()]
    }

    /// Name of an axis as reported by the device in a hand
    pub fn axis_name(&self, source: &dyn DeviceSource, hand: Hand, axis: u32) -> String {
        if self.check_index("axis", axis, MAX_AXES).is_none() {
            return "UNKNOWN".to_string();
        }
        let kind = source.axis_kind(self.device_id(hand), axis);
        if kind == super::device::AxisKind::None {
            log::warn!("{} axis {} reports no axis type", hand_name(hand), axis);
        }
        names::axis_name(kind, axis)
    }

    /// Assign the first left and first right controller found to their hands.
    ///
    /// A hand with no controller is disabled.
    pub fn update_hands(&mut self, source: &dyn DeviceSource) {
        let mut found: [Option<DeviceId>; MAX_HANDS] = [None; MAX_HANDS];
        for (device, role) in source.controllers() {
            if role != Hand::Unknown && found[role.index()].is_none() {
                found[role.index()] = Some(device);
            }
        }

        for hand in Hand::TRACKED {
            let (enabled, device) = match found[hand.index()] {
                Some(device) => (true, device),
                None => (false, 0),
            };
            if self.device_ids[hand.index()] != device {
                // resting values belong to the previous device
                self.calibration.invalidate();
            }
            self.enabled[hand.index()] = enabled;
            self.device_ids[hand.index()] = device;
            log::debug!(
                "{} hand: {}",
                hand_name(hand),
                if enabled {
                    format!("device {}", device)
                } else {
                    "disabled".to_string()
                }
            );
        }
    }

    pub fn update_names(&mut self, source: &dyn DeviceSource) {
        for hand in Hand::TRACKED {
            self.names[hand.index()] = if self.enabled[hand.index()] {
                source.model_name(self.device_ids[hand.index()])
            } else {
                String::new()
            };
        }
    }

    // --- dispatch ---

    pub fn resolve_axis(
        &self,
        hand: Hand,
        axis: u32,
        direction: AxisDirection,
        value: f32,
    ) -> Option<(AxisFn, f32)> {
        if !self.hand_enabled(hand) {
            return None;
        }
        self.axis_unit(hand, axis, direction)?.resolve(value)
    }

    pub fn resolve_button(&self, hand: Hand, button: u32, action: Action) -> Option<ButtonFn> {
        if !self.hand_enabled(hand) {
            return None;
        }
        let slot = self.button_slot(hand, button, action)?;
        slot.bound.then(|| slot.func.clone())
    }

    /// Feed one raw axis component
    pub fn execute_axis(&self, hand: Hand, axis: u32, direction: AxisDirection, value: f32) {
        if let Some((func, value)) = self.resolve_axis(hand, axis, direction, value) {
            func(value);
        }
    }

    /// Feed both components of one axis
    pub fn execute_axis_pair(&self, hand: Hand, axis: u32, x: f32, y: f32) {
        self.execute_axis(hand, axis, AxisDirection::X, x);
        self.execute_axis(hand, axis, AxisDirection::Y, y);
    }

    /// Feed one button edge
    pub fn execute_button(&self, hand: Hand, button: u32, action: Action) {
        if let Some(func) = self.resolve_button(hand, button, action) {
            func();
        }
    }

    fn resolve_samples(&self, hand: Hand, source: &dyn DeviceSource, out: &mut Vec<(AxisFn, f32)>) {
        let device = self.device_ids[hand.index()];
        let Some(samples) = source.axis_samples(device) else {
            log::trace!("No axis samples from device {}", device);
            return;
        };
        for (axis, sample) in samples.iter().enumerate() {
            for direction in AxisDirection::ALL {
                let unit = &self.axes[hand.index()][axis][direction.index()];
                if let Some(call) = unit.resolve(sample[direction.index()]) {
                    out.push(call);
                }
            }
        }
    }

    /// Every axis consumer of the enabled hands with the value it should get
    pub fn resolve_poll(&self, source: &dyn DeviceSource) -> Vec<(AxisFn, f32)> {
        let mut calls = Vec::new();
        for hand in Hand::TRACKED {
            if self.hand_enabled(hand) {
                self.resolve_samples(hand, source, &mut calls);
            }
        }
        calls
    }

    /// Sample and dispatch every axis of the enabled hands
    pub fn poll(&self, source: &dyn DeviceSource) {
        for (func, value) in self.resolve_poll(source) {
            func(value);
        }
    }

    /// Resolve the axes of one device by its current role, adopting it as
    /// that hand's controller
    pub fn resolve_poll_device(
        &mut self,
        source: &dyn DeviceSource,
        device: DeviceId,
    ) -> Vec<(AxisFn, f32)> {
        let hand = source.role(device);
        if hand == Hand::Unknown {
            log::warn!("Polled device {} has no hand role", device);
            return Vec::new();
        }
        if !self.hand_enabled(hand) {
            return Vec::new();
        }
        if self.device_ids[hand.index()] != device {
            log::debug!("{} hand adopts device {}", hand_name(hand), device);
            self.calibration.invalidate();
            self.device_ids[hand.index()] = device;
            self.names[hand.index()] = source.model_name(device);
        }

        let mut calls = Vec::new();
        self.resolve_samples(hand, source, &mut calls);
        calls
    }

    pub fn poll_device(&mut self, source: &dyn DeviceSource, device: DeviceId) {
        for (func, value) in self.resolve_poll_device(source, device) {
            func(value);
        }
    }

    /// Apply a device event, returning the button consumer it triggers
    pub fn resolve_event(
        &mut self,
        source: &dyn DeviceSource,
        event: DeviceEvent,
    ) -> Option<ButtonFn> {
        match event {
            DeviceEvent::Activated(device)
            | DeviceEvent::Deactivated(device)
            | DeviceEvent::RoleChanged(device) => {
                log::debug!("Device {} topology changed: {:?}", device, event);
                self.update_hands(source);
                self.update_names(source);
                None
            }
            DeviceEvent::Button {
                device,
                button,
                action,
            } => {
                let hand = source.role(device);
                if hand == Hand::Unknown {
                    log::warn!(
                        "Dropping {} from device {} with no hand role",
                        names::action_name(action),
                        device
                    );
                    return None;
                }
                if self.device_ids[hand.index()] != device {
                    self.update_hands(source);
                    self.update_names(source);
                }
                self.resolve_button(hand, button, action)
            }
        }
    }

    pub fn handle_event(&mut self, source: &dyn DeviceSource, event: DeviceEvent) {
        if let Some(func) = self.resolve_event(source, event) {
            func();
        }
    }

    // --- diagnostics ---

    /// Transfer curve of every enabled axis slot
    pub fn binding_graphs(&self, columns: usize, rows: usize) -> Vec<(AxisSlot, String)> {
        let mut graphs = Vec::new();
        for hand in Hand::ALL {
            for (axis, units) in self.axes[hand.index()].iter().enumerate() {
                for direction in AxisDirection::ALL {
                    let unit = &units[direction.index()];
                    if unit.is_enabled() {
                        let slot = AxisSlot {
                            hand,
                            axis: axis as u32,
                            direction,
                        };
                        graphs.push((slot, unit.graph(columns, rows)));
                    }
                }
            }
        }
        graphs
    }

    // --- capture ---

    /// Point every button at `callback`: press reports the button, release
    /// does nothing. Normal dispatch returns only when slots are rebound.
    pub fn capture_button(&mut self, callback: ButtonCaptureFn) {
        log::info!("Capturing next button press");
        for hand in Hand::ALL {
            for button in 0..MAX_BUTTONS as u32 {
                let report = callback.clone();
                self.bind_button(
                    hand,
                    button,
                    Action::Press,
                    Arc::new(move || report(ButtonBinding::specific(hand, button))),
                );
                self.unbind_button(hand, button, Action::Release);
            }
        }
    }

    /// Like [`capture_button`](Self::capture_button) with the raw hand and button
    pub fn capture_button_raw<F>(&mut self, callback: F)
    where
        F: Fn(Hand, u32) + Send + Sync + 'static,
    {
        self.capture_button(Arc::new(move |binding| {
            if let ButtonBinding::Specific { hand, button } = binding {
                callback(hand, button);
            }
        }));
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_calibrated()
    }

    /// Sample the resting value of every axis on the enabled hands
    pub fn calibrate_axes(&mut self, source: &dyn DeviceSource) -> BindResult<()> {
        let hands: Vec<(Hand, DeviceId)> = Hand::TRACKED
            .into_iter()
            .filter(|&hand| self.hand_enabled(hand))
            .map(|hand| (hand, self.device_id(hand)))
            .collect();
        self.calibration.calibrate(&hands, source)
    }

    /// Point every axis of the enabled hands at a deflection detector that
    /// reports to `callback`. Calibrates first if needed.
    pub fn capture_axis(
        &mut self,
        source: &dyn DeviceSource,
        callback: AxisCaptureFn,
    ) -> BindResult<()> {
        if !self.calibration.is_calibrated() {
            self.calibrate_axes(source)?;
        }
        log::info!("Capturing next axis deflection");

        let (threshold, rearm) = (self.config.capture_threshold, self.config.capture_rearm);
        for hand in Hand::TRACKED {
            if !self.hand_enabled(hand) {
                continue;
            }
            for axis in 0..MAX_AXES {
                for direction in AxisDirection::ALL {
                    let resting = self.calibration.resting(hand, axis, direction);
                    let detector = DeflectionDetector::new(resting, threshold, rearm);
                    let report = callback.clone();
                    let axis = axis as u32;
                    // detectors compare raw samples against raw resting values
                    self.bind_axis_passthrough(
                        hand,
                        axis,
                        direction,
                        Arc::new(move |value| {
                            if let Some(negative) = detector.sample(value) {
                                report(AxisCapture {
                                    hand,
                                    axis,
                                    direction,
                                    negative,
                                });
                            }
                        }),
                    );
                }
            }
        }
        Ok(())
    }

    /// Like [`capture_axis`](Self::capture_axis) with the raw slot and sign
    pub fn capture_axis_raw<F>(&mut self, source: &dyn DeviceSource, callback: F) -> BindResult<()>
    where
        F: Fn(Hand, u32, AxisDirection, bool) + Send + Sync + 'static,
    {
        self.capture_axis(
            source,
            Arc::new(move |c: AxisCapture| callback(c.hand, c.axis, c.direction, c.negative)),
        )
    }
}

impl fmt::Debug for ControllerBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerBindings")
            .field("config", &self.config)
            .field("enabled", &self.enabled)
            .field("device_ids", &self.device_ids)
            .field("names", &self.names)
            .field("calibrated", &self.calibration.is_calibrated())
            .finish()
    }
}
