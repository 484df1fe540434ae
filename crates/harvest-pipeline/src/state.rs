//! Run state machine

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a run currently is
///
/// ```text
/// Init -> Extracting -> Refactoring -> Writing -> Extracting ... -> Committed
///                                   \-> Extracting ... -> Validated   (dry run)
/// any non-terminal state -> Failed -> RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineState {
    Init,
    Extracting,
    Refactoring,
    Writing,
    Committed,
    Validated,
    Failed,
    RolledBack,
}

impl PipelineState {
    /// True for states a run ends in
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Committed | PipelineState::Validated | PipelineState::RolledBack
        )
    }

    /// Whether a run may move from `self` to `next`
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;

        match (self, next) {
            (Init, Extracting) | (Init, Committed) | (Init, Validated) => true,
            (Extracting, Refactoring) => true,
            (Refactoring, Writing) | (Refactoring, Extracting) | (Refactoring, Validated) => true,
            (Writing, Extracting) | (Writing, Committed) => true,
            (Failed, RolledBack) => true,
            (from, Failed) => !from.is_terminal() && from != Failed,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Current state plus every state visited, in order
#[derive(Debug, Clone)]
pub(crate) struct StateTracker {
    current: PipelineState,
    history: Vec<PipelineState>,
}

impl StateTracker {
    pub(crate) fn new() -> Self {
        Self {
            current: PipelineState::Init,
            history: vec![PipelineState::Init],
        }
    }

    pub(crate) fn current(&self) -> PipelineState {
        self.current
    }

    pub(crate) fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.current.can_transition_to(next),
            "illegal transition {} -> {}",
            self.current,
            next
        );
        tracing::trace!("Pipeline state {} -> {}", self.current, next);
        self.current = next;
        self.history.push(next);
    }

    pub(crate) fn into_history(self) -> Vec<PipelineState> {
        self.history
    }
}
