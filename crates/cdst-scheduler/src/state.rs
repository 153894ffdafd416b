//! Scenario lifecycle state machine:
//! `Pending -> Running -> {Completed, Failed, Cancelled}`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ScenarioStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScenarioStatus::Completed | ScenarioStatus::Failed | ScenarioStatus::Cancelled)
    }

    /// `true` if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: ScenarioStatus) -> bool {
        use ScenarioStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }
}
