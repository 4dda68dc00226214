//! Human-readable names
//!
//! Display names for hands, actions, buttons and axes. These are for logs and
//! binding UIs only; nothing in the binding algorithm depends on them.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::device::AxisKind;
use super::types::{Action, Hand};

/// Button id to name mapping, following the tracked-controller button layout
static BUTTON_NAMES: LazyLock<HashMap<u32, &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    m.insert(0, "SYSTEM");
    m.insert(1, "MENU");
    // also reported as the dashboard back button
    m.insert(2, "GRIP");
    m.insert(3, "DPAD LEFT");
    m.insert(4, "DPAD UP");
    m.insert(5, "DPAD RIGHT");
    m.insert(6, "DPAD DOWN");
    m.insert(7, "A");
    m.insert(31, "PROXIMITY");

    // axis buttons; 32 and 33 double as touchpad and trigger
    m.insert(32, "TOUCHPAD");
    m.insert(33, "TRIGGER");
    m.insert(34, "AXIS 2");
    m.insert(35, "AXIS 3");
    m.insert(36, "AXIS 4");

    m
});

/// Reverse mapping: name to button id
static NAME_BUTTONS: LazyLock<HashMap<&'static str, u32>> =
    LazyLock::new(|| BUTTON_NAMES.iter().map(|(&id, &name)| (name, id)).collect());

pub fn hand_name(hand: Hand) -> &'static str {
    match hand {
        Hand::Left => "LEFT",
        Hand::Right => "RIGHT",
        Hand::Unknown => "UNKNOWN",
    }
}

pub fn action_name(action: Action) -> &'static str {
    match action {
        Action::Release => "RELEASE",
        Action::Press => "PRESS",
        Action::Touch => "TOUCH",
        Action::Untouch => "UNTOUCH",
    }
}

/// Name of a button id, falling back to `BUTTON n`
pub fn button_name(button: u32) -> String {
    match BUTTON_NAMES.get(&button) {
        Some(name) => (*name).to_string(),
        None => format!("BUTTON {}", button),
    }
}

/// Button id from a name produced by [`button_name`] (case-insensitive)
pub fn button_from_name(name: &str) -> Option<u32> {
    let upper = name.trim().to_ascii_uppercase();
    if let Some(&id) = NAME_BUTTONS.get(upper.as_str()) {
        return Some(id);
    }
    upper
        .strip_prefix("BUTTON ")
        .and_then(|n| n.trim().parse().ok())
}

/// Name of an axis given the kind the device reports for it
pub fn axis_name(kind: AxisKind, axis: u32) -> String {
    let kind = match kind {
        AxisKind::None => "UNKNOWN(NONE)",
        AxisKind::TrackPad => "TRACKPAD",
        AxisKind::Joystick => "JOYSTICK",
        AxisKind::Trigger => "TRIGGER",
        AxisKind::Unknown => "UNKNOWN",
    };
    format!("{} #{}", kind, axis)
}
