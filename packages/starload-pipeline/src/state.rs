//! Run state machine
//!
//! Idle → Extracting → Validating → Transforming → Loading → Done, with Failed
//! reachable from every non-terminal state. Transitions are strictly sequential; a
//! run that reached Done or Failed cannot move again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCategory, PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Extracting,
    Validating,
    Transforming,
    Loading,
    Done,
    Failed {
        /// State the run was in when the error surfaced
        stage: String,
        error: String,
        category: ErrorCategory,
    },
}

impl PipelineState {
    pub fn state_name(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Extracting => "extracting",
            PipelineState::Validating => "validating",
            PipelineState::Transforming => "transforming",
            PipelineState::Loading => "loading",
            PipelineState::Done => "done",
            PipelineState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed { .. })
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.state_name())
    }
}

/// Tracks one run through the stages
pub struct RunStateMachine {
    state: PipelineState,
    updated_at: DateTime<Utc>,
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Idle,
            updated_at: Utc::now(),
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn into_state(self) -> PipelineState {
        self.state
    }

    fn set(&mut self, state: PipelineState) {
        self.state = state;
        self.updated_at = Utc::now();
    }

    fn invalid(&self, to: &str) -> PipelineError {
        PipelineError::InvalidStateTransition {
            from: self.state.state_name().to_string(),
            to: to.to_string(),
        }
    }

    /// Transition to the next stage: IDLE → EXTRACTING → VALIDATING → TRANSFORMING → LOADING
    pub fn advance(&mut self) -> Result<&PipelineState> {
        let next = match self.state {
            PipelineState::Idle => PipelineState::Extracting,
            PipelineState::Extracting => PipelineState::Validating,
            PipelineState::Validating => PipelineState::Transforming,
            PipelineState::Transforming => PipelineState::Loading,
            _ => return Err(self.invalid("next stage")),
        };
        self.set(next);
        Ok(&self.state)
    }

    /// Transition: LOADING → DONE, or TRANSFORMING → DONE when there is nothing to load
    pub fn complete(&mut self) -> Result<()> {
        match self.state {
            PipelineState::Transforming | PipelineState::Loading => {
                self.set(PipelineState::Done);
                Ok(())
            }
            _ => Err(self.invalid("done")),
        }
    }

    /// Transition: * → FAILED
    pub fn fail(&mut self, error: &PipelineError) -> Result<()> {
        if self.state.is_terminal() {
            return Err(self.invalid("failed"));
        }
        let stage = self.state.state_name().to_string();
        self.set(PipelineState::Failed {
            stage,
            error: error.to_string(),
            category: error.category(),
        });
        Ok(())
    }
}
