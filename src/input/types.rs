//! Physical element identifiers and limits
//!
//! Hands, axis directions and button actions, the fixed table sizes they
//! index into, and the trait an application's control domain implements.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Number of hand slots (unknown, left, right)
pub const MAX_HANDS: usize = 3;
/// Number of analogue axes reported per controller
pub const MAX_AXES: usize = 5;
/// Number of components per axis (X, Y)
pub const MAX_AXIS_DIRECTIONS: usize = 2;
/// Number of buttons addressable per controller
pub const MAX_BUTTONS: usize = 64;
/// Number of button actions
pub const MAX_ACTIONS: usize = 4;

/// Consumer of a transformed axis value
pub type AxisFn = Arc<dyn Fn(f32) + Send + Sync>;
/// Consumer of a button action
pub type ButtonFn = Arc<dyn Fn() + Send + Sync>;

/// Which physical controller an element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hand {
    Unknown,
    Left,
    Right,
}

impl Hand {
    /// All hand slots, in table order
    pub const ALL: [Hand; MAX_HANDS] = [Hand::Unknown, Hand::Left, Hand::Right];
    /// Hands that a tracked controller can actually be resolved to
    pub const TRACKED: [Hand; 2] = [Hand::Left, Hand::Right];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Component of a two-dimensional axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AxisDirection {
    X,
    Y,
}

impl AxisDirection {
    pub const ALL: [AxisDirection; MAX_AXIS_DIRECTIONS] = [AxisDirection::X, AxisDirection::Y];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Edge event reported for a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    Release,
    Press,
    Touch,
    Untouch,
}

impl Action {
    pub const ALL: [Action; MAX_ACTIONS] =
        [Action::Release, Action::Press, Action::Touch, Action::Untouch];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// An application-defined symbolic control.
///
/// Implementors are small, densely numbered, totally ordered keys (usually a
/// fieldless enum). The engine only uses the ordering, the ordinal and the
/// count; it never interprets the value.
pub trait Control: Copy + Ord + Hash + Debug + Send + Sync + 'static {
    /// Number of controls in the domain
    const COUNT: usize;

    /// Dense ordinal in `0..COUNT`
    fn ordinal(self) -> usize;
}

/// Implement [`Control`] for a fieldless enum listing every variant in order.
///
/// ```
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// enum Game { Fire, Jump, Steer }
/// vrbind::impl_control!(Game { Fire, Jump, Steer });
///
/// use vrbind::Control;
/// assert_eq!(Game::COUNT, 3);
/// assert_eq!(Game::Steer.ordinal(), 2);
/// ```
#[macro_export]
macro_rules! impl_control {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::Control for $ty {
            const COUNT: usize = [$(stringify!($variant)),+].len();

            fn ordinal(self) -> usize {
                self as usize
            }
        }
    };
}
