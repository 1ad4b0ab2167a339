// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Benchmark run state machine with typed state transitions.
//!
//! Implements the run lifecycle:
//! Idle → Loaded → ServiceStopped → CacheFlushed → ServiceStarted → Ran → Done.
//! Any non-terminal state may fall into Failed. Invalid transitions result in
//! StateTransitionError.

use serde::{Deserialize, Serialize};

use crate::error::StateTransitionError;

/// Run lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Platform set up, nothing loaded yet.
    Idle,

    /// Benchmark data and model tables exist.
    Loaded,

    ServiceStopped,

    CacheFlushed,

    /// Service is back and answered the probe query.
    ServiceStarted,

    /// Benchmark query finished.
    Ran,

    /// Run completed.
    Done,

    /// A phase failed; the run is abandoned.
    Failed,
}

impl RunState {
    /// Get the state name for error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Loaded => "Loaded",
            Self::ServiceStopped => "ServiceStopped",
            Self::CacheFlushed => "CacheFlushed",
            Self::ServiceStarted => "ServiceStarted",
            Self::Ran => "Ran",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Check if transition to the target state is valid.
    pub fn can_transition_to(&self, target: RunState) -> bool {
        if target == Self::Failed {
            return !self.is_terminal();
        }

        matches!(
            (self, target),
            (Self::Idle, Self::Loaded)
                | (Self::Loaded, Self::ServiceStopped)
                | (Self::ServiceStopped, Self::CacheFlushed)
                | (Self::CacheFlushed, Self::ServiceStarted)
                | (Self::ServiceStarted, Self::Ran)
                | (Self::Ran, Self::Done)
        )
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// State machine for one benchmark run on a platform.
#[derive(Debug)]
pub struct RunStateMachine {
    platform: String,
    current_state: RunState,
    transition_count: u64,
}

impl RunStateMachine {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            current_state: RunState::Idle,
            transition_count: 0,
        }
    }

    pub fn state(&self) -> RunState {
        self.current_state
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&mut self, target: RunState) -> Result<(), StateTransitionError> {
        if self.current_state.is_terminal() {
            return Err(StateTransitionError::TerminalState {
                platform: self.platform.clone(),
                state: self.current_state.name(),
            });
        }

        if !self.current_state.can_transition_to(target) {
            return Err(StateTransitionError::InvalidTransition {
                platform: self.platform.clone(),
                from: self.current_state.name(),
                to: target.name(),
            });
        }

        tracing::debug!(
            platform = %self.platform,
            from = self.current_state.name(),
            to = target.name(),
            "State transition"
        );

        self.current_state = target;
        self.transition_count += 1;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAPPY_PATH: [RunState; 6] = [
        RunState::Loaded,
        RunState::ServiceStopped,
        RunState::CacheFlushed,
        RunState::ServiceStarted,
        RunState::Ran,
        RunState::Done,
    ];

    #[test]
    fn test_initial_state() {
        let sm = RunStateMachine::new("postgres");
        assert_eq!(sm.state(), RunState::Idle);
        assert_eq!(sm.transition_count(), 0);
        assert_eq!(sm.platform(), "postgres");
    }

    #[test]
    fn test_happy_path() {
        let mut sm = RunStateMachine::new("postgres");
        for state in HAPPY_PATH {
            sm.transition_to(state).unwrap();
            assert_eq!(sm.state(), state);
        }
        assert_eq!(sm.transition_count(), 6);
    }

    #[test]
    fn test_skipping_a_phase_is_rejected() {
        let mut sm = RunStateMachine::new("postgres");
        let err = sm.transition_to(RunState::ServiceStopped).unwrap_err();
        assert!(matches!(
            err,
            StateTransitionError::InvalidTransition {
                from: "Idle",
                to: "ServiceStopped",
                ..
            }
        ));
        assert_eq!(sm.state(), RunState::Idle);
    }

    #[test]
    fn test_failed_reachable_from_every_non_terminal_state() {
        for steps in 0..HAPPY_PATH.len() {
            let mut sm = RunStateMachine::new("greenplum");
            for state in &HAPPY_PATH[..steps] {
                sm.transition_to(*state).unwrap();
            }
            if sm.state().is_terminal() {
                continue;
            }
            assert!(sm.transition_to(RunState::Failed).is_ok());
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut sm = RunStateMachine::new("postgres");
        sm.transition_to(RunState::Failed).unwrap();
        assert!(matches!(
            sm.transition_to(RunState::Failed),
            Err(StateTransitionError::TerminalState { state: "Failed", .. })
        ));
        assert!(sm.transition_to(RunState::Loaded).is_err());
    }
}
