// Status and stage enums shared by every reported entity

use serde::{Deserialize, Serialize};

/// Outcome of a test, fixture, or step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    Broken,
    Skipped,
    #[default]
    Unknown,
}

impl Status {
    /// True for statuses a downstream renderer treats as "not green".
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failed | Status::Broken)
    }
}

/// Lifecycle stage of a reported entity.
///
/// The only legal transitions are `Scheduled -> Running -> Finished` and
/// `Running -> Interrupted`. Entities force-closed at finalize time land in
/// `Interrupted`, never disappear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Scheduled,
    Running,
    Finished,
    Interrupted,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Finished | Stage::Interrupted)
    }
}
