//! Error type for binding operations

use super::binding::ButtonBinding;
use super::types::{Action, Hand};

/// Errors reported by the binding engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindError {
    /// Wildcard button bindings only dispatch the press action
    #[error("{binding} cannot carry a {action:?} callback, wildcard bindings support press only")]
    UnsupportedWildcardAction {
        binding: ButtonBinding,
        action: Action,
    },

    #[error("{kind} index {index} out of range (max: {max})")]
    InvalidIndex {
        kind: &'static str,
        index: usize,
        max: usize,
    },

    #[error("Binding profile '{0}' not found")]
    ProfileNotFound(String),

    #[error("Cannot remove the selected binding profile '{0}'")]
    SelectedProfileRemoval(String),

    /// The device layer could not supply a resting sample
    #[error("No resting sample available for the {hand:?} controller")]
    CalibrationUnavailable { hand: Hand },
}

/// Result type for binding operations
pub type BindResult<T> = Result<T, BindError>;
