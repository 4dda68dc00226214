//! Binding manager
//!
//! The public face of the engine. Applications register callbacks per control
//! ([`BindingManager::set_analogue`], [`BindingManager::set_digital`]) and
//! relate controls to physical elements in named profiles. Every change to the
//! selected profile is pushed into the physical dispatch tables before the
//! call returns.
//!
//! The manager is a cloneable handle. Application callbacks always run with
//! no lock held, so they may bind, unbind or capture on the same manager; such
//! changes are seen from the next poll on.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::EngineConfig;

use super::binding::{AxisBinding, AxisSlot, ButtonActions, ButtonBinding};
use super::controller::{AxisCaptureFn, ButtonCaptureFn, ControllerBindings};
use super::device::{DeviceEvent, DeviceId, DeviceSource};
use super::directory::BindingSet;
use super::error::{BindError, BindResult};
use super::types::{
    Action, AxisDirection, AxisFn, ButtonFn, Control, Hand, MAX_AXES, MAX_BUTTONS,
};

/// Profile selected by a new manager
pub const DEFAULT_PROFILE: &str = "default";

struct Inner<C: Control> {
    controller: ControllerBindings,
    profiles: HashMap<String, BindingSet<C>>,
    selected: String,
    analogue: Vec<Option<AxisFn>>,
    digital: Vec<ButtonActions>,
}

/// Handle to a binding engine for the control domain `C`
pub struct BindingManager<C: Control> {
    inner: Arc<RwLock<Inner<C>>>,
}

impl<C: Control> Clone for BindingManager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Control> Default for BindingManager<C> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn check_axis(binding: &AxisBinding) -> BindResult<()> {
    if binding.axis as usize >= MAX_AXES {
        return Err(BindError::InvalidIndex {
            kind: "axis",
            index: binding.axis as usize,
            max: MAX_AXES,
        });
    }
    Ok(())
}

fn check_button(binding: &ButtonBinding) -> BindResult<()> {
    if let ButtonBinding::Specific { button, .. } = *binding {
        if button as usize >= MAX_BUTTONS {
            return Err(BindError::InvalidIndex {
                kind: "button",
                index: button as usize,
                max: MAX_BUTTONS,
            });
        }
    }
    Ok(())
}

impl<C: Control> Inner<C> {
    fn selected_set(&self) -> Option<&BindingSet<C>> {
        self.profiles.get(&self.selected)
    }

    fn profile_mut(&mut self, profile: &str) -> &mut BindingSet<C> {
        self.profiles
            .entry(profile.to_string())
            .or_insert_with(|| BindingSet::new(profile))
    }

    fn is_selected(&self, profile: &str) -> bool {
        self.selected == profile
    }

    fn has_wildcard(&self, control: C) -> bool {
        self.profiles.values().any(|set| set.has_wildcard(control))
    }

    /// Point one axis slot at its newest owner in the selected profile.
    ///
    /// An owner without an analogue consumer leaves the slot disabled; older
    /// bindings on the slot do not stand in for it.
    fn recompute_axis(&mut self, slot: AxisSlot) {
        let owner = self.selected_set().and_then(|set| set.axis_owner(slot));
        let func = owner.and_then(|(control, binding)| {
            self.analogue[control.ordinal()]
                .clone()
                .map(|func| (binding, func))
        });

        match func {
            Some((binding, func)) => self.controller.bind_axis_with(&binding, func),
            None => self
                .controller
                .unbind_axis(slot.hand, slot.axis, slot.direction),
        }
    }

    /// Aggregate the callbacks of every control covering one button
    fn recompute_button(&mut self, hand: Hand, button: u32) {
        let controls = self
            .selected_set()
            .map(|set| set.controls_covering(hand, button))
            .unwrap_or_default();

        for action in Action::ALL {
            let funcs: Vec<ButtonFn> = controls
                .iter()
                .filter_map(|control| self.digital[control.ordinal()].get(action).cloned())
                .collect();

            match funcs.len() {
                0 => self.controller.unbind_button(hand, button, action),
                1 => self
                    .controller
                    .bind_button(hand, button, action, funcs[0].clone()),
                _ => self.controller.bind_button(
                    hand,
                    button,
                    action,
                    Arc::new(move || {
                        for func in &funcs {
                            func();
                        }
                    }),
                ),
            }
        }
    }

    fn recompute_control(&mut self, control: C) {
        let (axes, buttons) = match self.selected_set() {
            Some(set) => (set.axis_slots(control), set.button_slots(control)),
            None => return,
        };
        for slot in axes {
            self.recompute_axis(slot);
        }
        for (hand, button) in buttons {
            self.recompute_button(hand, button);
        }
    }

    /// Re-derive every physical slot from the selected profile
    fn recompute_all(&mut self) {
        for hand in Hand::ALL {
            for axis in 0..MAX_AXES as u32 {
                for direction in AxisDirection::ALL {
                    self.recompute_axis(AxisSlot {
                        hand,
                        axis,
                        direction,
                    });
                }
            }
            for button in 0..MAX_BUTTONS as u32 {
                self.recompute_button(hand, button);
            }
        }
    }
}

impl<C: Control> BindingManager<C> {
    /// Create a manager with an empty [`DEFAULT_PROFILE`] selected
    pub fn new(config: EngineConfig) -> Self {
        let mut profiles = HashMap::new();
        profiles.insert(DEFAULT_PROFILE.to_string(), BindingSet::new(DEFAULT_PROFILE));

        let inner = Inner {
            controller: ControllerBindings::new(config),
            profiles,
            selected: DEFAULT_PROFILE.to_string(),
            analogue: vec![None; C::COUNT],
            digital: vec![ButtonActions::default(); C::COUNT],
        };
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    /// Resolve hands and device names
    pub fn init(&self, source: &dyn DeviceSource) {
        self.inner.write().controller.init(source);
    }

    pub fn update_hands(&self, source: &dyn DeviceSource) {
        let mut inner = self.inner.write();
        inner.controller.update_hands(source);
        inner.controller.update_names(source);
    }

    // --- per-control callbacks ---

    /// Set the consumer that receives a control's axis value
    pub fn set_analogue(&self, control: C, func: AxisFn) {
        let mut inner = self.inner.write();
        inner.analogue[control.ordinal()] = Some(func);
        inner.recompute_control(control);
    }

    pub fn clear_analogue(&self, control: C) {
        let mut inner = self.inner.write();
        inner.analogue[control.ordinal()] = None;
        inner.recompute_control(control);
    }

    /// Set the callback a control runs on one button action.
    ///
    /// Controls with a wildcard button binding in any profile accept press only.
    pub fn set_digital(&self, control: C, action: Action, func: ButtonFn) -> BindResult<()> {
        let mut inner = self.inner.write();
        if action != Action::Press && inner.has_wildcard(control) {
            let binding = inner
                .profiles
                .values()
                .flat_map(|set| set.button_bindings(control))
                .find(ButtonBinding::is_wildcard)
                .unwrap_or(ButtonBinding::AnyAll);
            let err = BindError::UnsupportedWildcardAction { binding, action };
            log::warn!("{:?}: {}", control, err);
            return Err(err);
        }
        inner.digital[control.ordinal()].set(action, Some(func));
        inner.recompute_control(control);
        Ok(())
    }

    pub fn clear_digital(&self, control: C, action: Action) {
        let mut inner = self.inner.write();
        inner.digital[control.ordinal()].set(action, None);
        inner.recompute_control(control);
    }

    // --- binding ---

    /// Bind a control to an axis slot in the selected profile
    pub fn bind_axis(&self, control: C, binding: AxisBinding) -> BindResult<()> {
        let profile = self.selected_profile();
        self.bind_axis_in(&profile, control, binding)
    }

    /// Bind a control to an axis slot in a named profile, creating it if needed
    pub fn bind_axis_in(&self, profile: &str, control: C, binding: AxisBinding) -> BindResult<()> {
        check_axis(&binding)?;
        let mut inner = self.inner.write();
        if inner.analogue[control.ordinal()].is_none() {
            log::warn!("{:?} bound to an axis with no consumer set", control);
        }
        log::debug!("[{}] {:?} -> {:?}", profile, control, binding.slot());

        let slot = inner.profile_mut(profile).bind_axis(control, binding);
        if inner.is_selected(profile) {
            inner.recompute_axis(slot);
        }
        Ok(())
    }

    /// Remove every axis binding of a control in the selected profile
    pub fn unbind_axis(&self, control: C) {
        let profile = self.selected_profile();
        self.unbind_axis_in(&profile, control);
    }

    pub fn unbind_axis_in(&self, profile: &str, control: C) {
        let mut inner = self.inner.write();
        let slots = match inner.profiles.get_mut(profile) {
            Some(set) => set.unbind_axis(control),
            None => return,
        };
        log::debug!("[{}] {:?} unbound from {} axis slots", profile, control, slots.len());
        if inner.is_selected(profile) {
            for slot in slots {
                inner.recompute_axis(slot);
            }
        }
    }

    /// Bind a control to a button in the selected profile
    pub fn bind_button(&self, control: C, binding: ButtonBinding) -> BindResult<()> {
        let profile = self.selected_profile();
        self.bind_button_in(&profile, control, binding)
    }

    /// Bind a control to a button in a named profile, creating it if needed.
    ///
    /// Wildcard bindings are refused for controls with callbacks other than
    /// press.
    pub fn bind_button_in(
        &self,
        profile: &str,
        control: C,
        binding: ButtonBinding,
    ) -> BindResult<()> {
        check_button(&binding)?;
        let mut inner = self.inner.write();

        let actions = &inner.digital[control.ordinal()];
        if binding.is_wildcard() {
            if let Some(action) = actions.first_non_press() {
                let err = BindError::UnsupportedWildcardAction { binding, action };
                log::warn!("{:?}: {}", control, err);
                return Err(err);
            }
        }
        if actions.is_empty() {
            log::warn!("{:?} bound to {} with no callbacks set", control, binding);
        }
        log::debug!("[{}] {:?} -> {}", profile, control, binding);

        inner.profile_mut(profile).bind_button(control, binding);
        if inner.is_selected(profile) {
            for (hand, button) in binding.physical_buttons() {
                inner.recompute_button(hand, button);
            }
        }
        Ok(())
    }

    /// Remove every button binding of a control in the selected profile
    pub fn unbind_button(&self, control: C) {
        let profile = self.selected_profile();
        self.unbind_button_in(&profile, control);
    }

    pub fn unbind_button_in(&self, profile: &str, control: C) {
        let mut inner = self.inner.write();
        let removed = match inner.profiles.get_mut(profile) {
            Some(set) => set.unbind_button(control),
            None => return,
        };
        log::debug!("[{}] {:?} unbound from {} buttons", profile, control, removed.len());
        if inner.is_selected(profile) {
            let touched: BTreeSet<(Hand, u32)> = removed
                .iter()
                .flat_map(ButtonBinding::physical_buttons)
                .collect();
            for (hand, button) in touched {
                inner.recompute_button(hand, button);
            }
        }
    }

    // --- profiles ---

    /// Add an empty profile; returns false if the name is taken
    pub fn create_profile(&self, name: &str) -> bool {
        let mut inner = self.inner.write();
        if inner.profiles.contains_key(name) {
            return false;
        }
        inner
            .profiles
            .insert(name.to_string(), BindingSet::new(name));
        true
    }

    pub fn remove_profile(&self, name: &str) -> BindResult<()> {
        let mut inner = self.inner.write();
        if inner.is_selected(name) {
            return Err(BindError::SelectedProfileRemoval(name.to_string()));
        }
        inner
            .profiles
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| BindError::ProfileNotFound(name.to_string()))
    }

    /// Make a profile current, creating it if needed, and re-derive every slot
    pub fn select_profile(&self, name: &str) {
        let mut inner = self.inner.write();
        inner.profile_mut(name);
        inner.selected = name.to_string();
        inner.recompute_all();
        log::info!("Selected binding profile '{}'", name);
    }

    /// Re-derive every slot from the selected profile, ending any capture
    pub fn refresh(&self) {
        self.inner.write().recompute_all();
    }

    pub fn selected_profile(&self) -> String {
        self.inner.read().selected.clone()
    }

    /// Profile names, sorted
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().profiles.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn axis_bindings(&self, profile: &str, control: C) -> Vec<AxisBinding> {
        self.inner
            .read()
            .profiles
            .get(profile)
            .map(|set| set.axis_bindings(control))
            .unwrap_or_default()
    }

    pub fn button_bindings(&self, profile: &str, control: C) -> Vec<ButtonBinding> {
        self.inner
            .read()
            .profiles
            .get(profile)
            .map(|set| set.button_bindings(control))
            .unwrap_or_default()
    }

    /// Controls a press on a physical button reaches, in call order
    pub fn controls_on_button(&self, profile: &str, hand: Hand, button: u32) -> Vec<C> {
        self.inner
            .read()
            .profiles
            .get(profile)
            .map(|set| set.controls_covering(hand, button))
            .unwrap_or_default()
    }

    // --- dispatch ---

    pub fn execute_axis(&self, hand: Hand, axis: u32, direction: AxisDirection, value: f32) {
        let call = self
            .inner
            .read()
            .controller
            .resolve_axis(hand, axis, direction, value);
        if let Some((func, value)) = call {
            func(value);
        }
    }

    pub fn execute_axis_pair(&self, hand: Hand, axis: u32, x: f32, y: f32) {
        self.execute_axis(hand, axis, AxisDirection::X, x);
        self.execute_axis(hand, axis, AxisDirection::Y, y);
    }

    pub fn execute_button(&self, hand: Hand, button: u32, action: Action) {
        let call = self.inner.read().controller.resolve_button(hand, button, action);
        if let Some(func) = call {
            func();
        }
    }

    /// Sample every axis of the enabled hands and dispatch the results
    pub fn poll(&self, source: &dyn DeviceSource) {
        let calls = self.inner.read().controller.resolve_poll(source);
        log::trace!("Dispatching {} axis values", calls.len());
        for (func, value) in calls {
            func(value);
        }
    }

    pub fn poll_device(&self, source: &dyn DeviceSource, device: DeviceId) {
        let calls = self.inner.write().controller.resolve_poll_device(source, device);
        for (func, value) in calls {
            func(value);
        }
    }

    pub fn handle_event(&self, source: &dyn DeviceSource, event: DeviceEvent) {
        let call = self.inner.write().controller.resolve_event(source, event);
        if let Some(func) = call {
            func();
        }
    }

    // --- capture ---

    /// Report the next pressed button instead of dispatching it.
    ///
    /// Normal dispatch resumes on [`refresh`](Self::refresh), a profile
    /// selection or a rebind of the affected slots.
    pub fn capture_button(&self, callback: ButtonCaptureFn) {
        self.inner.write().controller.capture_button(callback);
    }

    pub fn capture_button_raw<F>(&self, callback: F)
    where
        F: Fn(Hand, u32) + Send + Sync + 'static,
    {
        self.inner.write().controller.capture_button_raw(callback);
    }

    /// Store the resting value of every axis on the enabled hands
    pub fn calibrate_axes(&self, source: &dyn DeviceSource) -> BindResult<()> {
        self.inner.write().controller.calibrate_axes(source)
    }

    /// Report the next deliberate axis deflection instead of dispatching it
    pub fn capture_axis(&self, source: &dyn DeviceSource, callback: AxisCaptureFn) -> BindResult<()> {
        self.inner.write().controller.capture_axis(source, callback)
    }

    pub fn capture_axis_raw<F>(&self, source: &dyn DeviceSource, callback: F) -> BindResult<()>
    where
        F: Fn(Hand, u32, AxisDirection, bool) + Send + Sync + 'static,
    {
        self.inner.write().controller.capture_axis_raw(source, callback)
    }

    // --- inspection ---

    /// Run `f` against the live dispatch tables.
    ///
    /// The manager is locked for the duration; `f` must not call back into it.
    pub fn with_controller<R>(&self, f: impl FnOnce(&ControllerBindings) -> R) -> R {
        f(&self.inner.read().controller)
    }

    pub fn device_name(&self, hand: Hand) -> String {
        self.inner.read().controller.device_name(hand).to_string()
    }

    pub fn axis_name(&self, source: &dyn DeviceSource, hand: Hand, axis: u32) -> String {
        self.inner.read().controller.axis_name(source, hand, axis)
    }

    pub fn binding_graphs(&self, columns: usize, rows: usize) -> Vec<(AxisSlot, String)> {
        self.inner.read().controller.binding_graphs(columns, rows)
    }
}

impl<C: Control> std::fmt::Debug for BindingManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("BindingManager")
            .field("selected", &inner.selected)
            .field("profiles", &inner.profiles.len())
            .field("controller", &inner.controller)
            .finish()
    }
}
