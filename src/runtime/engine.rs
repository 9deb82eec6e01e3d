// Reporter runtime - the concurrency-aware lifecycle state machine
// Ingests runtime messages per lane, finalizes immutable result records,
// and hands them to the writer

use crate::context::{ContextToken, Lane, LaneRegistry, LaneTarget, PopStep};
use crate::diagnostics::{Diagnostics, DiagnosticsSnapshot};
use crate::errors::ReportError;
use crate::identity;
use crate::model::{
    Attachment, Category, EnvironmentInfo, FixtureResult, Stage, Status, StatusDetails,
    StepResult, TestResult, TestResultContainer,
};
use crate::protocol::{FixtureKind, FixtureMeta, RuntimeMessage, TestMeta, TestOutcome, TestPatch};
use crate::runtime::LifecycleListener;
use crate::writer::{AttachmentOptions, ResultWriter};
use chrono::Utc;
use std::sync::{Arc, Mutex};

/// Synthetic run-level entity collecting global attachments and errors not
/// tied to any running test.
struct RunScope {
    container: TestResultContainer,
    events: FixtureResult,
    dirty: bool,
}

impl RunScope {
    fn new() -> Self {
        let mut container = TestResultContainer::new("run");
        container.start = Some(now_millis());
        let mut events = FixtureResult::new("run events");
        events.stage = Stage::Running;
        events.start = container.start;
        Self {
            container,
            events,
            dirty: false,
        }
    }
}

/// Builder for `ReporterRuntime`. A writer is mandatory; construction fails
/// fast without one.
#[derive(Default)]
pub struct RuntimeBuilder {
    writer: Option<Arc<dyn ResultWriter>>,
    listeners: Vec<Arc<dyn LifecycleListener>>,
}

impl RuntimeBuilder {
    pub fn writer(mut self, writer: Arc<dyn ResultWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn LifecycleListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn build(self) -> Result<ReporterRuntime, ReportError> {
        let writer = self
            .writer
            .ok_or_else(|| ReportError::Config("no writer supplied".into()))?;
        Ok(ReporterRuntime {
            writer,
            listeners: self.listeners,
            lanes: LaneRegistry::new(),
            run: Mutex::new(RunScope::new()),
            diagnostics: Diagnostics::new(),
        })
    }
}

/// The engine. Performs no scheduling of its own; it is invoked reentrantly
/// by whatever concurrency model the calling adapter uses. Per-lane state is
/// isolated; the writer is the only shared sink.
pub struct ReporterRuntime {
    writer: Arc<dyn ResultWriter>,
    listeners: Vec<Arc<dyn LifecycleListener>>,
    lanes: LaneRegistry,
    run: Mutex<RunScope>,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for ReporterRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReporterRuntime").finish_non_exhaustive()
    }
}

impl ReporterRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// Open a new test lane and return its context token.
    pub fn start_test(&self, meta: TestMeta) -> ContextToken {
        let mut result = TestResult::new(meta.name);
        result.full_name = meta.full_name;
        result.description = meta.description;
        result.labels = meta.labels;
        result.links = meta.links;
        result.parameters = meta.parameters;
        result.stage = Stage::Running;
        result.start = Some(now_millis());

        tracing::debug!("Starting test {} ({})", result.name, result.uuid);
        self.lanes.open(Lane::for_test(result))
    }

    /// Open a new fixture lane and return its context token.
    pub fn start_fixture(&self, meta: FixtureMeta) -> ContextToken {
        let container_name = meta.container_name.unwrap_or_else(|| meta.name.clone());
        let mut container = TestResultContainer::new(container_name);
        container.start = Some(now_millis());

        let mut fixture = FixtureResult::new(meta.name);
        fixture.parameters = meta.parameters;
        fixture.stage = Stage::Running;
        fixture.start = container.start;

        tracing::debug!("Starting fixture {} ({})", fixture.name, container.uuid);
        self.lanes.open(Lane::for_fixture(container, fixture, meta.kind))
    }

    /// Apply one message to the lane addressed by `ctx`.
    ///
    /// Malformed sequences degrade to no-ops with a diagnostic; only writer
    /// failures surface as errors.
    pub fn apply_message(
        &self,
        ctx: ContextToken,
        message: RuntimeMessage,
    ) -> Result<(), ReportError> {
        // Global messages are not tied to any lane; route them before
        // resolving the token.
        if matches!(
            message,
            RuntimeMessage::GlobalAttachment { .. } | RuntimeMessage::GlobalError { .. }
        ) {
            return self.apply_global(message);
        }
        match message {
            RuntimeMessage::StopTest { outcome } => return self.stop_test(ctx, outcome),
            RuntimeMessage::StopFixture { outcome } => return self.stop_fixture(ctx, outcome),
            _ => {}
        }

        let Some(handle) = self.lanes.get(ctx) else {
            self.diagnostics.record_message_after_finalize();
            tracing::warn!("Discarding message for unknown or finalized lane: {message:?}");
            return Ok(());
        };
        let mut lane = handle.lock().expect("lane poisoned");

        match message {
            RuntimeMessage::StartTest { .. } | RuntimeMessage::StartFixture { .. } => {
                self.diagnostics.record_double_start();
                tracing::warn!("Discarding start message addressed to an open lane");
            }
            RuntimeMessage::UpdateTest { patch } => match &mut lane.target {
                LaneTarget::Test(result) => apply_patch(result, patch),
                LaneTarget::Fixture { .. } => {
                    self.diagnostics.record_mismatched_target();
                    tracing::warn!("Discarding test patch addressed to a fixture lane");
                }
            },
            RuntimeMessage::StartStep { name, uuid, start } => {
                let mut step = StepResult::new(name);
                if let Some(uuid) = uuid {
                    step.uuid = uuid;
                }
                step.start = start;
                lane.push_step(step, now_millis());
            }
            RuntimeMessage::StopStep {
                uuid,
                status,
                details,
                stop,
            } => {
                let popped = lane.pop_step(|step| {
                    step.status = status.unwrap_or(Status::Passed);
                    step.status_details = details;
                    step.stage = Stage::Finished;
                    step.stop = stop.or_else(|| Some(now_millis()));
                });
                match popped {
                    PopStep::Closed(closed) => {
                        // A mismatched frame id means stops crossed; the top
                        // frame closes regardless (LIFO).
                        if uuid.is_some_and(|expected| expected != closed) {
                            self.diagnostics.record_unbalanced_step();
                            tracing::warn!("Step stop addressed a frame that is not on top");
                        }
                    }
                    PopStep::Empty => {
                        self.diagnostics.record_unbalanced_step();
                        tracing::warn!("Step stop with no open step; ignoring");
                    }
                }
            }
            RuntimeMessage::StepMetadata { label, parameter } => match lane.current_step() {
                Some(step) => {
                    if let Some(label) = label {
                        step.labels.push(label);
                    }
                    if let Some(parameter) = parameter {
                        step.parameters.push(parameter);
                    }
                }
                None => {
                    self.diagnostics.record_orphan_attachment();
                    tracing::warn!("Step metadata with no open step; ignoring");
                }
            },
            RuntimeMessage::RawAttachment {
                name,
                content_type,
                bytes,
            } => {
                let options = AttachmentOptions::new(content_type.clone());
                let source = self.writer.write_attachment(&name, &bytes, &options)?;
                lane.attachment_sink()
                    .push(Attachment::new(name, source, content_type));
            }
            RuntimeMessage::AttachmentFromPath {
                path,
                name,
                content_type,
            } => {
                let dest_name = name.unwrap_or_else(|| {
                    path.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "attachment".to_string())
                });
                let content_type =
                    content_type.unwrap_or_else(|| "application/octet-stream".to_string());
                let source = self.writer.write_attachment_from_path(&path, &dest_name)?;
                lane.attachment_sink()
                    .push(Attachment::new(dest_name, source, content_type));
            }
            RuntimeMessage::LabelBatch { labels } => match lane.labels() {
                Some(sink) => sink.extend(labels),
                None => {
                    self.diagnostics.record_mismatched_target();
                    tracing::warn!("Discarding labels addressed to a fixture lane");
                }
            },
            RuntimeMessage::LinkBatch { links } => match &mut lane.target {
                LaneTarget::Test(result) => result.links.extend(links),
                LaneTarget::Fixture { .. } => {
                    self.diagnostics.record_mismatched_target();
                    tracing::warn!("Discarding links addressed to a fixture lane");
                }
            },
            RuntimeMessage::ParameterBatch { parameters } => {
                lane.parameters().extend(parameters);
            }
            RuntimeMessage::OwnTest { test_id } => match &mut lane.target {
                LaneTarget::Fixture { container, .. } => container.children.push(test_id),
                LaneTarget::Test(_) => {
                    self.diagnostics.record_mismatched_target();
                    tracing::warn!("Discarding child association addressed to a test lane");
                }
            },
            // Handled before the lane lookup.
            RuntimeMessage::StopTest { .. }
            | RuntimeMessage::StopFixture { .. }
            | RuntimeMessage::GlobalAttachment { .. }
            | RuntimeMessage::GlobalError { .. } => unreachable!(),
        }
        Ok(())
    }

    /// Finalize the lane's test: set the outcome, force-close dangling
    /// steps, derive identities, run listeners, persist, release the lane.
    pub fn stop_test(
        &self,
        ctx: ContextToken,
        outcome: TestOutcome,
    ) -> Result<(), ReportError> {
        let Some(handle) = self.lanes.get(ctx) else {
            self.diagnostics.record_stop_without_start();
            tracing::warn!("Test stop for unknown or finalized lane; ignoring");
            return Ok(());
        };
        if !matches!(
            handle.lock().expect("lane poisoned").target,
            LaneTarget::Test(_)
        ) {
            self.diagnostics.record_mismatched_target();
            tracing::warn!("Test stop addressed to a fixture lane; ignoring");
            return Ok(());
        }
        let Some(handle) = self.lanes.close(ctx) else {
            // A concurrent stop won the race.
            self.diagnostics.record_stop_without_start();
            return Ok(());
        };

        let result = {
            let mut lane = handle.lock().expect("lane poisoned");
            let now = now_millis();
            let interrupted = lane.interrupt_open_steps(now);
            if interrupted > 0 {
                self.diagnostics.record_interrupted_children(interrupted);
                tracing::warn!("Force-closed {interrupted} open step(s) as interrupted");
            }

            let LaneTarget::Test(result) = &mut lane.target else {
                unreachable!("target kind checked above");
            };
            result.status = outcome.status;
            if outcome.details.is_some() {
                result.status_details = outcome.details;
            }
            result.stage = if outcome.interrupted {
                Stage::Interrupted
            } else {
                Stage::Finished
            };
            result.stop = Some(now);
            derive_identities(result);
            result.clone()
        };

        tracing::debug!("Finalizing test {} ({})", result.name, result.uuid);
        let mut current = result;
        for listener in &self.listeners {
            match listener.on_test_result(current.clone()) {
                Ok(Some(updated)) => current = updated,
                Ok(None) => {
                    tracing::debug!("Listener suppressed persistence of {}", current.uuid);
                    return Ok(());
                }
                Err(e) => {
                    self.diagnostics.record_listener_failure();
                    tracing::warn!("Listener failed on test result: {e:#}");
                }
            }
        }
        self.writer.write_result(&current)
    }

    /// Finalize the lane's fixture and its container.
    pub fn stop_fixture(
        &self,
        ctx: ContextToken,
        outcome: TestOutcome,
    ) -> Result<(), ReportError> {
        let Some(handle) = self.lanes.get(ctx) else {
            self.diagnostics.record_stop_without_start();
            tracing::warn!("Fixture stop for unknown or finalized lane; ignoring");
            return Ok(());
        };
        if !matches!(
            handle.lock().expect("lane poisoned").target,
            LaneTarget::Fixture { .. }
        ) {
            self.diagnostics.record_mismatched_target();
            tracing::warn!("Fixture stop addressed to a test lane; ignoring");
            return Ok(());
        }
        let Some(handle) = self.lanes.close(ctx) else {
            self.diagnostics.record_stop_without_start();
            return Ok(());
        };

        let container = {
            let mut lane = handle.lock().expect("lane poisoned");
            let now = now_millis();
            let interrupted = lane.interrupt_open_steps(now);
            if interrupted > 0 {
                self.diagnostics.record_interrupted_children(interrupted);
                tracing::warn!("Force-closed {interrupted} open step(s) as interrupted");
            }

            let LaneTarget::Fixture {
                container,
                fixture,
                kind,
            } = &mut lane.target
            else {
                unreachable!("target kind checked above");
            };
            fixture.status = outcome.status;
            if outcome.details.is_some() {
                fixture.status_details = outcome.details;
            }
            fixture.stage = if outcome.interrupted {
                Stage::Interrupted
            } else {
                Stage::Finished
            };
            fixture.stop = Some(now);

            let finished = fixture.clone();
            match kind {
                FixtureKind::Before => container.befores.push(finished),
                FixtureKind::After => container.afters.push(finished),
            }
            container.stop = Some(now);
            container.clone()
        };

        tracing::debug!(
            "Finalizing container {} ({})",
            container.name,
            container.uuid
        );
        let mut current = container;
        for listener in &self.listeners {
            match listener.on_test_container(current.clone()) {
                Ok(Some(updated)) => current = updated,
                Ok(None) => {
                    tracing::debug!("Listener suppressed persistence of {}", current.uuid);
                    return Ok(());
                }
                Err(e) => {
                    self.diagnostics.record_listener_failure();
                    tracing::warn!("Listener failed on container: {e:#}");
                }
            }
        }
        self.writer.write_group(&current)
    }

    /// Apply a run-level message that belongs to no lane. Valid at any
    /// point in the run, including before the first test starts and after
    /// the last one finishes.
    ///
    /// Lane-scoped messages sent here are discarded with a diagnostic.
    pub fn apply_global(&self, message: RuntimeMessage) -> Result<(), ReportError> {
        match message {
            RuntimeMessage::GlobalAttachment {
                name,
                content_type,
                bytes,
            } => self.global_attachment(name, content_type, bytes),
            RuntimeMessage::GlobalError { message, trace } => {
                self.global_error(message, trace);
                Ok(())
            }
            other => {
                self.diagnostics.record_mismatched_target();
                tracing::warn!("Discarding lane-scoped message sent to the run scope: {other:?}");
                Ok(())
            }
        }
    }

    /// Persist run environment info. Repeated calls overwrite: the most
    /// recent call for a run is what gets persisted.
    pub fn write_environment_info(
        &self,
        environment: &EnvironmentInfo,
    ) -> Result<(), ReportError> {
        self.writer.write_environment_info(environment)
    }

    /// Persist defect category definitions. Repeated calls overwrite.
    pub fn write_categories(&self, categories: &[Category]) -> Result<(), ReportError> {
        self.writer.write_categories(categories)
    }

    /// Write the synthetic run-level container if any global attachment or
    /// error was routed to it. Idempotent: the scope resets after writing.
    pub fn finalize_run(&self) -> Result<(), ReportError> {
        let scope = {
            let mut run = self.run.lock().expect("run scope poisoned");
            if !run.dirty {
                return Ok(());
            }
            std::mem::replace(&mut *run, RunScope::new())
        };

        let mut container = scope.container;
        let mut events = scope.events;
        let now = now_millis();
        if events.status == Status::Unknown {
            events.status = Status::Passed;
        }
        events.stage = Stage::Finished;
        events.stop = Some(now);
        container.befores.push(events);
        container.stop = Some(now);

        let mut current = container;
        for listener in &self.listeners {
            match listener.on_test_container(current.clone()) {
                Ok(Some(updated)) => current = updated,
                Ok(None) => return Ok(()),
                Err(e) => {
                    self.diagnostics.record_listener_failure();
                    tracing::warn!("Listener failed on run container: {e:#}");
                }
            }
        }
        self.writer.write_group(&current)
    }

    /// Point-in-time view of the protocol diagnostics counters.
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// Number of lanes currently in flight.
    pub fn live_lanes(&self) -> usize {
        self.lanes.live_count()
    }

    fn global_attachment(
        &self,
        name: String,
        content_type: String,
        bytes: Vec<u8>,
    ) -> Result<(), ReportError> {
        let options = AttachmentOptions::new(content_type.clone());
        let source = self.writer.write_attachment(&name, &bytes, &options)?;
        let mut run = self.run.lock().expect("run scope poisoned");
        run.events
            .attachments
            .push(Attachment::new(name, source, content_type));
        run.dirty = true;
        Ok(())
    }

    fn global_error(&self, message: String, trace: Option<String>) {
        tracing::warn!("Run-level error reported: {message}");
        let mut run = self.run.lock().expect("run scope poisoned");
        let mut step = StepResult::new(message.clone());
        step.status = Status::Broken;
        let mut details = StatusDetails::from_message(message);
        details.trace = trace;
        step.status_details = Some(details);
        step.stage = Stage::Finished;
        run.events.steps.push(step);
        run.events.status = Status::Broken;
        run.dirty = true;
    }
}

fn apply_patch(result: &mut TestResult, patch: TestPatch) {
    if let Some(name) = patch.name {
        result.name = name;
    }
    if let Some(full_name) = patch.full_name {
        result.full_name = Some(full_name);
    }
    if let Some(description) = patch.description {
        result.description = Some(description);
    }
    if let Some(description_html) = patch.description_html {
        result.description_html = Some(description_html);
    }
    if let Some(status_details) = patch.status_details {
        result.status_details = Some(status_details);
    }
    if let Some(history_id) = patch.history_id {
        result.history_id = Some(history_id);
    }
    if let Some(test_case_id) = patch.test_case_id {
        result.test_case_id = Some(test_case_id);
    }
}

/// Fill in derived identities unless a patch preset them.
fn derive_identities(result: &mut TestResult) {
    let full_name = result
        .full_name
        .clone()
        .unwrap_or_else(|| result.name.clone());
    if result.test_case_id.is_none() {
        result.test_case_id = Some(identity::test_case_id(&full_name));
    }
    if result.history_id.is_none() {
        result.history_id = Some(identity::history_id(&full_name, &result.parameters));
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::InMemoryWriter;

    fn runtime_with_memory() -> (ReporterRuntime, Arc<InMemoryWriter>) {
        let writer = Arc::new(InMemoryWriter::new());
        let runtime = ReporterRuntime::builder()
            .writer(writer.clone())
            .build()
            .expect("writer supplied");
        (runtime, writer)
    }

    #[test]
    fn test_build_without_writer_fails_fast() {
        let err = ReporterRuntime::builder().build().unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn test_start_stop_releases_lane() {
        let (runtime, writer) = runtime_with_memory();
        let ctx = runtime.start_test(TestMeta::new("t"));
        assert_eq!(runtime.live_lanes(), 1);

        runtime.stop_test(ctx, TestOutcome::passed()).unwrap();
        assert_eq!(runtime.live_lanes(), 0);
        assert_eq!(writer.result_count(), 1);
        assert_eq!(writer.results()[0].status, Status::Passed);
        assert_eq!(writer.results()[0].stage, Stage::Finished);
    }

    #[test]
    fn test_double_stop_is_counted_not_applied() {
        let (runtime, writer) = runtime_with_memory();
        let ctx = runtime.start_test(TestMeta::new("t"));
        runtime.stop_test(ctx, TestOutcome::passed()).unwrap();
        runtime.stop_test(ctx, TestOutcome::failed("late")).unwrap();

        assert_eq!(writer.result_count(), 1);
        assert_eq!(writer.results()[0].status, Status::Passed);
        assert_eq!(runtime.diagnostics().stop_without_start, 1);
    }

    #[test]
    fn test_message_after_finalize_discarded() {
        let (runtime, writer) = runtime_with_memory();
        let ctx = runtime.start_test(TestMeta::new("t"));
        runtime.stop_test(ctx, TestOutcome::passed()).unwrap();

        runtime
            .apply_message(ctx, RuntimeMessage::label("suite", "late"))
            .unwrap();

        assert!(writer.results()[0].labels.is_empty());
        assert_eq!(runtime.diagnostics().message_after_finalize, 1);
    }

    #[test]
    fn test_interrupted_outcome_sets_stage() {
        let (runtime, writer) = runtime_with_memory();
        let ctx = runtime.start_test(TestMeta::new("t"));
        runtime
            .stop_test(ctx, TestOutcome::interrupted("aborted"))
            .unwrap();

        let result = &writer.results()[0];
        assert_eq!(result.stage, Stage::Interrupted);
        assert_eq!(result.status, Status::Broken);
    }

    #[test]
    fn test_identity_preset_by_patch_wins() {
        let (runtime, writer) = runtime_with_memory();
        let ctx = runtime.start_test(TestMeta::new("t"));
        runtime
            .apply_message(
                ctx,
                RuntimeMessage::UpdateTest {
                    patch: TestPatch {
                        history_id: Some("preset".into()),
                        ..TestPatch::default()
                    },
                },
            )
            .unwrap();
        runtime.stop_test(ctx, TestOutcome::passed()).unwrap();

        let result = &writer.results()[0];
        assert_eq!(result.history_id.as_deref(), Some("preset"));
        // The other identity is still derived.
        assert!(result.test_case_id.is_some());
    }

    #[test]
    fn test_fixture_lands_in_befores() {
        let (runtime, writer) = runtime_with_memory();
        let ctx = runtime.start_fixture(FixtureMeta::before("db setup").container("db"));
        let owned = uuid::Uuid::new_v4();
        runtime
            .apply_message(ctx, RuntimeMessage::OwnTest { test_id: owned })
            .unwrap();
        runtime.stop_fixture(ctx, TestOutcome::passed()).unwrap();

        let groups = writer.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "db");
        assert_eq!(groups[0].children, vec![owned]);
        assert_eq!(groups[0].befores.len(), 1);
        assert_eq!(groups[0].befores[0].name, "db setup");
        assert_eq!(groups[0].befores[0].stage, Stage::Finished);
    }

    #[test]
    fn test_global_error_routed_to_run_container() {
        let (runtime, writer) = runtime_with_memory();
        let ctx = runtime.start_test(TestMeta::new("t"));
        runtime
            .apply_message(
                ctx,
                RuntimeMessage::GlobalError {
                    message: "adapter crashed".into(),
                    trace: None,
                },
            )
            .unwrap();
        runtime.stop_test(ctx, TestOutcome::passed()).unwrap();
        runtime.finalize_run().unwrap();

        let groups = writer.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "run");
        assert_eq!(groups[0].befores[0].status, Status::Broken);
        assert_eq!(groups[0].befores[0].steps[0].name, "adapter crashed");
    }

    #[test]
    fn test_global_error_before_any_test_starts() {
        let (runtime, writer) = runtime_with_memory();
        runtime
            .apply_global(RuntimeMessage::GlobalError {
                message: "host failed to boot".into(),
                trace: Some("boot.log".into()),
            })
            .unwrap();
        runtime.finalize_run().unwrap();

        let groups = writer.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].befores[0].status, Status::Broken);
        assert_eq!(groups[0].befores[0].steps[0].name, "host failed to boot");
    }

    #[test]
    fn test_lane_scoped_message_to_run_scope_is_discarded() {
        let (runtime, writer) = runtime_with_memory();
        runtime
            .apply_global(RuntimeMessage::label("suite", "x"))
            .unwrap();
        runtime.finalize_run().unwrap();

        assert!(writer.groups().is_empty());
        assert_eq!(runtime.diagnostics().mismatched_target, 1);
    }

    #[test]
    fn test_crossed_step_stop_is_counted() {
        let (runtime, writer) = runtime_with_memory();
        let ctx = runtime.start_test(TestMeta::new("t"));
        let outer = uuid::Uuid::new_v4();
        let inner = uuid::Uuid::new_v4();
        runtime
            .apply_message(ctx, RuntimeMessage::step_with_id("outer", outer))
            .unwrap();
        runtime
            .apply_message(ctx, RuntimeMessage::step_with_id("inner", inner))
            .unwrap();
        // Stops arrive crossed: the outer frame is named first.
        runtime
            .apply_message(ctx, RuntimeMessage::stop_step_for(outer))
            .unwrap();
        runtime
            .apply_message(ctx, RuntimeMessage::stop_step_for(inner))
            .unwrap();
        runtime.stop_test(ctx, TestOutcome::passed()).unwrap();

        // Frames still close LIFO; the mismatches are reported.
        let result = &writer.results()[0];
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].name, "outer");
        assert_eq!(result.steps[0].steps[0].name, "inner");
        assert_eq!(runtime.diagnostics().unbalanced_step, 2);
    }

    #[test]
    fn test_matching_step_stop_ids_are_clean() {
        let (runtime, _writer) = runtime_with_memory();
        let ctx = runtime.start_test(TestMeta::new("t"));
        let id = uuid::Uuid::new_v4();
        runtime
            .apply_message(ctx, RuntimeMessage::step_with_id("s", id))
            .unwrap();
        runtime
            .apply_message(ctx, RuntimeMessage::stop_step_for(id))
            .unwrap();
        runtime.stop_test(ctx, TestOutcome::passed()).unwrap();

        assert_eq!(runtime.diagnostics().unbalanced_step, 0);
    }

    #[test]
    fn test_finalize_run_without_global_events_writes_nothing() {
        let (runtime, writer) = runtime_with_memory();
        runtime.finalize_run().unwrap();
        assert!(writer.groups().is_empty());
    }
}
