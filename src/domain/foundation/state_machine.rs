//! State machine trait for status enums.
//!
//! Shared by the order payment and shipping statuses so transition rules
//! live next to the enum they constrain.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
///
/// # Example
///
/// ```ignore
/// let next = ShippingStatus::Preparing.transition_to(ShippingStatus::Shipped)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Field name reported in transition errors.
    const FIELD: &'static str;

    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_transition(Self::FIELD, self, target))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Lamp {
        Off,
        On,
        Broken,
    }

    impl StateMachine for Lamp {
        const FIELD: &'static str = "lamp";

        fn can_transition_to(&self, target: &Self) -> bool {
            self.valid_transitions().contains(target)
        }

        fn valid_transitions(&self) -> Vec<Self> {
            match self {
                Lamp::Off => vec![Lamp::On, Lamp::Broken],
                Lamp::On => vec![Lamp::Off, Lamp::Broken],
                Lamp::Broken => vec![],
            }
        }
    }

    #[test]
    fn valid_transition_returns_target() {
        assert_eq!(Lamp::Off.transition_to(Lamp::On), Ok(Lamp::On));
    }

    #[test]
    fn invalid_transition_names_the_field() {
        let err = Lamp::Broken.transition_to(Lamp::On).unwrap_err();
        assert_eq!(err.to_string(), "Cannot transition lamp from Broken to On");
    }

    #[test]
    fn state_without_exits_is_terminal() {
        assert!(Lamp::Broken.is_terminal());
        assert!(!Lamp::Off.is_terminal());
    }
}
