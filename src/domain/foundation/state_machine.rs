//! Validated transitions for mode enums.

use super::ValidationError;

/// Enum whose values form a state machine.
///
/// Implementors list their legal transitions; `transition_to` turns an
/// illegal one into a `ValidationError` instead of overwriting state.
///
/// # Example
///
/// ```ignore
/// let mode = SessionMode::Unspecified.transition_to(SessionMode::Suggestion)?;
/// assert!(mode.is_terminal());
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if moving from `self` to `target` is legal.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// All states reachable in one step.
    fn valid_transitions(&self) -> Vec<Self>;

    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// No outgoing transitions.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
