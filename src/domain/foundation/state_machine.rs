//! Transition-table trait for lifecycle enums.

use super::ValidationError;

/// A finite set of states with an explicit edge table.
///
/// Implementors list their edges once; `transition_to` then refuses any move
/// that is not in the table, so callers can log and ignore illegal moves
/// instead of corrupting state.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Whether `target` is reachable from `self` in one step.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Every state reachable from `self` in one step.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Move to `target`, or explain why the edge does not exist.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if !self.can_transition_to(&target) {
            return Err(ValidationError::invalid_format(
                "state_transition",
                format!("no edge from {:?} to {:?}", self, target),
            ));
        }
        Ok(target)
    }

    /// A state with no outgoing edges.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Request {
        Queued,
        InFlight,
        Done,
    }

    impl StateMachine for Request {
        fn can_transition_to(&self, target: &Self) -> bool {
            self.valid_transitions().contains(target)
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Request::*;
            match self {
                Queued => vec![InFlight],
                InFlight => vec![Queued, Done],
                Done => vec![],
            }
        }
    }

    #[test]
    fn follows_listed_edges() {
        assert_eq!(
            Request::Queued.transition_to(Request::InFlight),
            Ok(Request::InFlight)
        );
        assert_eq!(Request::InFlight.transition_to(Request::Done), Ok(Request::Done));
    }

    #[test]
    fn refuses_missing_edge_naming_both_states() {
        let err = Request::Queued.transition_to(Request::Done).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Queued"));
        assert!(message.contains("Done"));
    }

    #[test]
    fn done_is_terminal() {
        assert!(Request::Done.is_terminal());
        assert!(!Request::InFlight.is_terminal());
    }
}
