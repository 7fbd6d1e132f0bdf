/// Task state definitions for tracking per-page progress
use crate::LexiError;
use std::fmt;

/// Represents the current state of a crawl task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// The page is being fetched and extracted (possibly on a retry)
    Running,

    /// An attempt produced a parsed payload
    Succeeded,

    /// Every attempt failed; the page contributes an empty fragment
    Exhausted,
}

impl TaskState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Exhausted)
    }

    /// Checks whether moving from `self` to `to` is allowed
    ///
    /// A task only ever leaves `Running`, and only for a terminal state.
    pub fn can_transition_to(&self, to: TaskState) -> bool {
        !self.is_terminal() && to.is_terminal()
    }

    /// Moves to `to`, rejecting transitions out of terminal states
    pub fn transition(&mut self, to: TaskState) -> Result<(), LexiError> {
        if !self.can_transition_to(to) {
            return Err(LexiError::InvalidTransition { from: *self, to });
        }
        *self = to;
        Ok(())
    }

    /// Short lowercase label used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!TaskState::Running.is_terminal());
        assert!(TaskState::Succeeded.is_terminal());
        assert!(TaskState::Exhausted.is_terminal());
    }

    #[test]
    fn test_running_to_terminal() {
        let mut state = TaskState::Running;
        state.transition(TaskState::Succeeded).unwrap();
        assert_eq!(state, TaskState::Succeeded);

        let mut state = TaskState::Running;
        state.transition(TaskState::Exhausted).unwrap();
        assert_eq!(state, TaskState::Exhausted);
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [TaskState::Succeeded, TaskState::Exhausted] {
            for to in [TaskState::Running, TaskState::Succeeded, TaskState::Exhausted] {
                let mut state = terminal;
                let result = state.transition(to);
                assert!(
                    matches!(result, Err(LexiError::InvalidTransition { .. })),
                    "{} -> {} should be rejected",
                    terminal,
                    to
                );
                assert_eq!(state, terminal);
            }
        }
    }

    #[test]
    fn test_running_to_running_rejected() {
        let mut state = TaskState::Running;
        assert!(state.transition(TaskState::Running).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", TaskState::Running), "running");
        assert_eq!(format!("{}", TaskState::Exhausted), "exhausted");
    }
}
