use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::OrchestratorError;

/// Lifecycle of a single run.
///
/// `Created -> Initialized -> PreProcessed -> Analyzed -> PostProcessed -> Done`,
/// with `Failed` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Created,
    Initialized,
    PreProcessed,
    Analyzed,
    PostProcessed,
    Done,
    Failed,
}

impl RunState {
    /// Check if the run is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Successor on the success path.
    pub fn next(&self) -> Option<RunState> {
        match self {
            Self::Created => Some(Self::Initialized),
            Self::Initialized => Some(Self::PreProcessed),
            Self::PreProcessed => Some(Self::Analyzed),
            Self::Analyzed => Some(Self::PostProcessed),
            Self::PostProcessed => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    pub fn can_transition_to(&self, to: RunState) -> bool {
        !self.is_terminal() && (to == Self::Failed || self.next() == Some(to))
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Initialized => "initialized",
            Self::PreProcessed => "pre_processed",
            Self::Analyzed => "analyzed",
            Self::PostProcessed => "post_processed",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEntry {
    pub state: RunState,
    pub timestamp: DateTime<Utc>,
}

/// Tracks the current state of a run and every state it passed through.
#[derive(Debug, Clone)]
pub struct StateTracker {
    entries: Vec<StateEntry>,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTracker {
    pub fn new() -> Self {
        Self {
            entries: vec![StateEntry {
                state: RunState::Created,
                timestamp: Utc::now(),
            }],
        }
    }

    pub fn current(&self) -> RunState {
        self.entries
            .last()
            .map(|e| e.state)
            .unwrap_or(RunState::Created)
    }

    /// Move to `to`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&mut self, to: RunState) -> Result<(), OrchestratorError> {
        let from = self.current();
        if !from.can_transition_to(to) {
            return Err(OrchestratorError::InvalidTransition { from, to });
        }
        tracing::debug!(%from, %to, "Run state transition");
        self.entries.push(StateEntry {
            state: to,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Enter `Failed` unless the run already reached a terminal state.
    pub fn fail(&mut self) {
        if !self.current().is_terminal() {
            self.entries.push(StateEntry {
                state: RunState::Failed,
                timestamp: Utc::now(),
            });
        }
    }

    /// States visited so far, oldest first.
    pub fn history(&self) -> Vec<RunState> {
        self.entries.iter().map(|e| e.state).collect()
    }

    pub fn entries(&self) -> &[StateEntry] {
        &self.entries
    }
}
