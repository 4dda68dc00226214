//! Binding values
//!
//! Plain descriptions of which physical element a control is attached to.
//! These are what the binding directory stores and what capture mode reports.

use std::fmt;

use super::names::{button_name, hand_name};
use super::types::{Action, AxisDirection, ButtonFn, Hand, MAX_BUTTONS};

/// Transform parameters of one analogue slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisParams {
    /// Invert the output
    pub flip: bool,
    pub deadzone_min: f32,
    pub deadzone_max: f32,
    pub saturation_min: f32,
    pub saturation_max: f32,
    /// Raw value the axis rests at
    pub centre: f32,
}

impl Default for AxisParams {
    fn default() -> Self {
        Self {
            flip: false,
            deadzone_min: 0.0,
            deadzone_max: 0.0,
            saturation_min: -1.0,
            saturation_max: 1.0,
            centre: 0.0,
        }
    }
}

impl AxisParams {
    /// Parameters for a one-sided physical range such as a trigger reporting
    /// 0..1, spread across the full -1..1 logical range.
    pub fn half(flip: bool) -> Self {
        Self {
            flip,
            saturation_min: 0.0,
            saturation_max: 1.0,
            ..Self::default()
        }
    }

    pub fn flipped(flip: bool) -> Self {
        Self {
            flip,
            ..Self::default()
        }
    }
}

/// One physical analogue slot a control is bound to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBinding {
    pub hand: Hand,
    pub axis: u32,
    pub direction: AxisDirection,
    pub params: AxisParams,
}

impl AxisBinding {
    pub fn new(hand: Hand, axis: u32, direction: AxisDirection) -> Self {
        Self {
            hand,
            axis,
            direction,
            params: AxisParams::default(),
        }
    }

    pub fn with_params(mut self, params: AxisParams) -> Self {
        self.params = params;
        self
    }

    /// The dispatch slot this binding drives
    pub fn slot(&self) -> AxisSlot {
        AxisSlot {
            hand: self.hand,
            axis: self.axis,
            direction: self.direction,
        }
    }
}

/// Address of one physical axis component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AxisSlot {
    pub hand: Hand,
    pub axis: u32,
    pub direction: AxisDirection,
}

/// A button binding, either one specific button or a wildcard scope.
///
/// Wildcards are matched by scope containment through [`ButtonBinding::covers`];
/// equality and hashing stay structural so the type is a sound map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ButtonBinding {
    Specific { hand: Hand, button: u32 },
    /// Every button on one hand
    AnyOnHand(Hand),
    /// Every button on both tracked hands
    AnyAll,
}

impl ButtonBinding {
    pub fn specific(hand: Hand, button: u32) -> Self {
        ButtonBinding::Specific { hand, button }
    }

    pub fn is_wildcard(&self) -> bool {
        !matches!(self, ButtonBinding::Specific { .. })
    }

    /// Whether a physical button falls within this binding's scope
    pub fn covers(&self, hand: Hand, button: u32) -> bool {
        match *self {
            ButtonBinding::Specific { hand: h, button: b } => h == hand && b == button,
            ButtonBinding::AnyOnHand(h) => h == hand && (button as usize) < MAX_BUTTONS,
            ButtonBinding::AnyAll => hand != Hand::Unknown && (button as usize) < MAX_BUTTONS,
        }
    }

    /// Every physical (hand, button) within scope
    pub fn physical_buttons(&self) -> Vec<(Hand, u32)> {
        let all_on = |hand: Hand| (0..MAX_BUTTONS as u32).map(move |b| (hand, b));
        match *self {
            ButtonBinding::Specific { hand, button } => vec![(hand, button)],
            ButtonBinding::AnyOnHand(hand) => all_on(hand).collect(),
            ButtonBinding::AnyAll => Hand::TRACKED.into_iter().flat_map(all_on).collect(),
        }
    }

    /// The wildcard bindings that would also cover a given specific button
    pub(crate) fn widening(hand: Hand, button: u32) -> [ButtonBinding; 3] {
        [
            ButtonBinding::Specific { hand, button },
            ButtonBinding::AnyOnHand(hand),
            ButtonBinding::AnyAll,
        ]
    }
}

impl fmt::Display for ButtonBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ButtonBinding::Specific { hand, button } => {
                write!(f, "{} {}", hand_name(hand), button_name(button))
            }
            ButtonBinding::AnyOnHand(hand) => write!(f, "any {} button", hand_name(hand)),
            ButtonBinding::AnyAll => write!(f, "any button"),
        }
    }
}

/// The per-action callbacks attached to a button.
#[derive(Clone, Default)]
pub struct ButtonActions {
    pub release: Option<ButtonFn>,
    pub press: Option<ButtonFn>,
    pub touch: Option<ButtonFn>,
    pub untouch: Option<ButtonFn>,
}

impl ButtonActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_press(func: ButtonFn) -> Self {
        Self {
            press: Some(func),
            ..Self::default()
        }
    }

    pub fn get(&self, action: Action) -> Option<&ButtonFn> {
        match action {
            Action::Release => self.release.as_ref(),
            Action::Press => self.press.as_ref(),
            Action::Touch => self.touch.as_ref(),
            Action::Untouch => self.untouch.as_ref(),
        }
    }

    pub fn set(&mut self, action: Action, func: Option<ButtonFn>) {
        let slot = match action {
            Action::Release => &mut self.release,
            Action::Press => &mut self.press,
            Action::Touch => &mut self.touch,
            Action::Untouch => &mut self.untouch,
        };
        *slot = func;
    }

    pub fn is_empty(&self) -> bool {
        Action::ALL.iter().all(|&action| self.get(action).is_none())
    }

    /// First registered action other than press, if any
    pub fn first_non_press(&self) -> Option<Action> {
        Action::ALL
            .into_iter()
            .find(|&action| action != Action::Press && self.get(action).is_some())
    }
}

impl fmt::Debug for ButtonActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound: Vec<Action> = Action::ALL
            .into_iter()
            .filter(|&action| self.get(action).is_some())
            .collect();
        f.debug_struct("ButtonActions").field("bound", &bound).finish()
    }
}
