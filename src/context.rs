// Execution context - resolves "what is currently open" per lane
// Per-lane state is fully isolated; no lane can observe another's frames

use crate::model::{
    Attachment, FixtureResult, Label, Parameter, Stage, StepResult, TestResult,
    TestResultContainer,
};
use crate::protocol::FixtureKind;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Opaque handle to one lane, produced by `start_test`/`start_fixture` and
/// passed with every subsequent message (explicit addressing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextToken(Uuid);

impl ContextToken {
    pub(crate) fn fresh() -> Self {
        Self(Uuid::new_v4())
    }

    pub(crate) fn key(&self) -> Uuid {
        self.0
    }
}

/// The entity a lane is building.
#[derive(Debug)]
pub(crate) enum LaneTarget {
    Test(TestResult),
    Fixture {
        container: TestResultContainer,
        fixture: FixtureResult,
        kind: FixtureKind,
    },
}

/// Result of popping the open-step stack.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PopStep {
    /// Top frame finalized; its uuid for crossed-stop detection.
    Closed(Uuid),
    /// Nothing open: double stop or stop without start.
    Empty,
}

/// One in-flight test or fixture: the entity under construction plus its
/// open-step stack. Steps close strictly LIFO; a stop always targets the
/// most recently opened frame.
#[derive(Debug)]
pub(crate) struct Lane {
    pub(crate) target: LaneTarget,
    open_steps: Vec<StepResult>,
}

impl Lane {
    pub(crate) fn for_test(result: TestResult) -> Self {
        Self {
            target: LaneTarget::Test(result),
            open_steps: Vec::new(),
        }
    }

    pub(crate) fn for_fixture(
        container: TestResultContainer,
        fixture: FixtureResult,
        kind: FixtureKind,
    ) -> Self {
        Self {
            target: LaneTarget::Fixture {
                container,
                fixture,
                kind,
            },
            open_steps: Vec::new(),
        }
    }

    /// Append a new step frame; returns the frame's run-local identity.
    pub(crate) fn push_step(&mut self, mut step: StepResult, now: i64) -> Uuid {
        step.stage = Stage::Running;
        if step.start.is_none() {
            step.start = Some(now);
        }
        let id = step.uuid;
        self.open_steps.push(step);
        id
    }

    /// Finalize and remove the top frame, attaching it to its parent.
    /// An empty stack is reported, not panicked on.
    pub(crate) fn pop_step(
        &mut self,
        finish: impl FnOnce(&mut StepResult),
    ) -> PopStep {
        let Some(mut step) = self.open_steps.pop() else {
            return PopStep::Empty;
        };
        finish(&mut step);
        let id = step.uuid;
        self.parent_steps().push(step);
        PopStep::Closed(id)
    }

    /// Force-close every open frame as interrupted, innermost first.
    /// Returns how many frames were closed.
    pub(crate) fn interrupt_open_steps(&mut self, now: i64) -> u64 {
        let mut closed = 0;
        while let PopStep::Closed(_) = self.pop_step(|step| {
            step.stage = Stage::Interrupted;
            step.stop = Some(now);
        }) {
            closed += 1;
        }
        closed
    }

    #[allow(dead_code)]
    pub(crate) fn has_open_steps(&self) -> bool {
        !self.open_steps.is_empty()
    }

    /// Current frame: the stack tail, the implicit target for attachments
    /// and step metadata issued without a target.
    pub(crate) fn current_step(&mut self) -> Option<&mut StepResult> {
        self.open_steps.last_mut()
    }

    /// Where a finalized top frame lands: the next frame down, or the root
    /// entity's step list.
    fn parent_steps(&mut self) -> &mut Vec<StepResult> {
        if let Some(parent) = self.open_steps.last_mut() {
            return &mut parent.steps;
        }
        match &mut self.target {
            LaneTarget::Test(result) => &mut result.steps,
            LaneTarget::Fixture { fixture, .. } => &mut fixture.steps,
        }
    }

    /// Attachment sink: the current frame if a step is open, otherwise the
    /// root entity.
    pub(crate) fn attachment_sink(&mut self) -> &mut Vec<Attachment> {
        if let Some(step) = self.open_steps.last_mut() {
            return &mut step.attachments;
        }
        match &mut self.target {
            LaneTarget::Test(result) => &mut result.attachments,
            LaneTarget::Fixture { fixture, .. } => &mut fixture.attachments,
        }
    }

    /// Root-level label list (labels are test-scoped; fixtures have none).
    pub(crate) fn labels(&mut self) -> Option<&mut Vec<Label>> {
        match &mut self.target {
            LaneTarget::Test(result) => Some(&mut result.labels),
            LaneTarget::Fixture { .. } => None,
        }
    }

    /// Root-level parameter list.
    pub(crate) fn parameters(&mut self) -> &mut Vec<Parameter> {
        match &mut self.target {
            LaneTarget::Test(result) => &mut result.parameters,
            LaneTarget::Fixture { fixture, .. } => &mut fixture.parameters,
        }
    }
}

/// All live lanes, keyed by context token.
///
/// The map lock is held only for lookup, insert, and remove; message
/// application locks the individual lane, so slow writer I/O on one lane
/// never blocks another.
#[derive(Debug, Default)]
pub(crate) struct LaneRegistry {
    lanes: Mutex<HashMap<Uuid, Arc<Mutex<Lane>>>>,
}

impl LaneRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn open(&self, lane: Lane) -> ContextToken {
        let token = ContextToken::fresh();
        self.lanes
            .lock()
            .expect("lane registry poisoned")
            .insert(token.key(), Arc::new(Mutex::new(lane)));
        token
    }

    /// Fetch a lane handle. `None` means the lane was never opened or has
    /// already been finalized and released.
    pub(crate) fn get(&self, token: ContextToken) -> Option<Arc<Mutex<Lane>>> {
        self.lanes
            .lock()
            .expect("lane registry poisoned")
            .get(&token.key())
            .cloned()
    }

    /// Remove and return a lane for finalization. Later messages addressed
    /// to this token will no longer resolve.
    pub(crate) fn close(&self, token: ContextToken) -> Option<Arc<Mutex<Lane>>> {
        self.lanes
            .lock()
            .expect("lane registry poisoned")
            .remove(&token.key())
    }

    pub(crate) fn live_count(&self) -> usize {
        self.lanes.lock().expect("lane registry poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;

    fn test_lane() -> Lane {
        Lane::for_test(TestResult::new("t"))
    }

    #[test]
    fn test_push_pop_nests_under_root() {
        let mut lane = test_lane();
        lane.push_step(StepResult::new("a"), 1);
        let popped = lane.pop_step(|step| {
            step.stage = Stage::Finished;
            step.status = Status::Passed;
        });
        assert!(matches!(popped, PopStep::Closed(_)));

        let LaneTarget::Test(result) = &lane.target else {
            panic!("expected test target");
        };
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].name, "a");
        assert_eq!(result.steps[0].stage, Stage::Finished);
    }

    #[test]
    fn test_lifo_nesting() {
        let mut lane = test_lane();
        lane.push_step(StepResult::new("outer"), 1);
        lane.push_step(StepResult::new("inner"), 2);
        lane.pop_step(|s| s.stage = Stage::Finished);
        lane.pop_step(|s| s.stage = Stage::Finished);

        let LaneTarget::Test(result) = &lane.target else {
            panic!("expected test target");
        };
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].name, "outer");
        assert_eq!(result.steps[0].steps[0].name, "inner");
    }

    #[test]
    fn test_pop_on_empty_stack_reports() {
        let mut lane = test_lane();
        assert_eq!(lane.pop_step(|_| {}), PopStep::Empty);
    }

    #[test]
    fn test_interrupt_open_steps_closes_all() {
        let mut lane = test_lane();
        lane.push_step(StepResult::new("a"), 1);
        lane.push_step(StepResult::new("b"), 2);
        assert_eq!(lane.interrupt_open_steps(9), 2);
        assert!(!lane.has_open_steps());

        let LaneTarget::Test(result) = &lane.target else {
            panic!("expected test target");
        };
        assert_eq!(result.steps[0].stage, Stage::Interrupted);
        assert_eq!(result.steps[0].steps[0].stage, Stage::Interrupted);
        assert_eq!(result.steps[0].steps[0].stop, Some(9));
    }

    #[test]
    fn test_attachment_sink_follows_current_frame() {
        let mut lane = test_lane();
        lane.attachment_sink().push(Attachment::new("root", "r", "text/plain"));
        lane.push_step(StepResult::new("s"), 1);
        lane.attachment_sink().push(Attachment::new("step", "s", "text/plain"));
        lane.pop_step(|s| s.stage = Stage::Finished);

        let LaneTarget::Test(result) = &lane.target else {
            panic!("expected test target");
        };
        assert_eq!(result.attachments.len(), 1);
        assert_eq!(result.steps[0].attachments.len(), 1);
        assert_eq!(result.steps[0].attachments[0].name, "step");
    }

    #[test]
    fn test_registry_close_releases_lane() {
        let registry = LaneRegistry::new();
        let token = registry.open(test_lane());
        assert!(registry.get(token).is_some());
        assert!(registry.close(token).is_some());
        assert!(registry.get(token).is_none());
        assert!(registry.close(token).is_none());
        assert_eq!(registry.live_count(), 0);
    }
}
