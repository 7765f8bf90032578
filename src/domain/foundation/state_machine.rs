//! Lifecycle enums with declared transitions.

use super::ValidationError;

/// A `Copy` enum whose legal moves are listed by the implementor.
///
/// `transition_to` and `is_terminal` come for free. The bridge's
/// `SupervisorState` is the main implementor.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    fn can_transition_to(&self, target: &Self) -> bool;

    fn valid_transitions(&self) -> Vec<Self>;

    /// `target` if the move is legal.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state",
                format!("{:?} cannot move to {:?}", self, target),
            ))
        }
    }

    /// No way out.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
