// Implicit single-lane addressing - convenience wrapper
// UNSAFE UNDER CONCURRENT LANES: valid only when exactly one test is ever
// in flight; concurrent hosts must pass context tokens explicitly

use crate::context::ContextToken;
use crate::errors::ReportError;
use crate::protocol::{FixtureMeta, RuntimeMessage, TestMeta, TestOutcome};
use crate::runtime::ReporterRuntime;
use std::sync::Mutex;

/// Wrapper holding the single current context token so callers can omit it.
///
/// Starting a second test before stopping the first overwrites the pointer;
/// the first lane is then unreachable through this wrapper (it is still
/// addressable explicitly and will be force-closed as usual if stopped).
pub struct SingleLaneReporter {
    runtime: ReporterRuntime,
    current: Mutex<Option<ContextToken>>,
}

impl SingleLaneReporter {
    pub fn new(runtime: ReporterRuntime) -> Self {
        Self {
            runtime,
            current: Mutex::new(None),
        }
    }

    /// The wrapped runtime, for explicit addressing alongside implicit use.
    pub fn runtime(&self) -> &ReporterRuntime {
        &self.runtime
    }

    pub fn start_test(&self, meta: TestMeta) -> ContextToken {
        let ctx = self.runtime.start_test(meta);
        let mut current = self.current.lock().expect("current lane poisoned");
        if current.is_some() {
            tracing::warn!("Implicit lane replaced while a test was still open");
        }
        *current = Some(ctx);
        ctx
    }

    pub fn start_fixture(&self, meta: FixtureMeta) -> ContextToken {
        let ctx = self.runtime.start_fixture(meta);
        *self.current.lock().expect("current lane poisoned") = Some(ctx);
        ctx
    }

    /// Apply a message to the current lane. Global messages belong to the
    /// run scope and are routed whether or not a lane is open; any other
    /// message with no lane open is discarded with a diagnostic.
    pub fn apply(&self, message: RuntimeMessage) -> Result<(), ReportError> {
        if matches!(
            message,
            RuntimeMessage::GlobalAttachment { .. } | RuntimeMessage::GlobalError { .. }
        ) {
            return self.runtime.apply_global(message);
        }
        match self.current_token() {
            Some(ctx) => self.runtime.apply_message(ctx, message),
            None => {
                tracing::warn!("Discarding message: no implicit lane open");
                Ok(())
            }
        }
    }

    pub fn stop_test(&self, outcome: TestOutcome) -> Result<(), ReportError> {
        let Some(ctx) = self.take_token() else {
            tracing::warn!("Test stop with no implicit lane open; ignoring");
            return Ok(());
        };
        self.runtime.stop_test(ctx, outcome)
    }

    pub fn stop_fixture(&self, outcome: TestOutcome) -> Result<(), ReportError> {
        let Some(ctx) = self.take_token() else {
            tracing::warn!("Fixture stop with no implicit lane open; ignoring");
            return Ok(());
        };
        self.runtime.stop_fixture(ctx, outcome)
    }

    fn current_token(&self) -> Option<ContextToken> {
        *self.current.lock().expect("current lane poisoned")
    }

    fn take_token(&self) -> Option<ContextToken> {
        self.current.lock().expect("current lane poisoned").take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Stage, Status};
    use crate::writer::InMemoryWriter;
    use std::sync::Arc;

    fn reporter() -> (SingleLaneReporter, Arc<InMemoryWriter>) {
        let writer = Arc::new(InMemoryWriter::new());
        let runtime = ReporterRuntime::builder()
            .writer(writer.clone())
            .build()
            .expect("writer supplied");
        (SingleLaneReporter::new(runtime), writer)
    }

    #[test]
    fn test_implicit_flow() {
        let (reporter, writer) = reporter();
        reporter.start_test(TestMeta::new("t"));
        reporter.apply(RuntimeMessage::step("a")).unwrap();
        reporter.apply(RuntimeMessage::stop_step()).unwrap();
        reporter.stop_test(TestOutcome::passed()).unwrap();

        let result = &writer.results()[0];
        assert_eq!(result.status, Status::Passed);
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].stage, Stage::Finished);
    }

    #[test]
    fn test_message_without_open_lane_is_noop() {
        let (reporter, writer) = reporter();
        reporter.apply(RuntimeMessage::label("suite", "x")).unwrap();
        reporter.stop_test(TestOutcome::passed()).unwrap();
        assert_eq!(writer.result_count(), 0);
    }

    #[test]
    fn test_global_error_survives_without_open_lane() {
        let (reporter, writer) = reporter();
        reporter
            .apply(RuntimeMessage::GlobalError {
                message: "environment down".into(),
                trace: None,
            })
            .unwrap();
        reporter.runtime().finalize_run().unwrap();

        let groups = writer.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "run");
        assert_eq!(groups[0].befores[0].status, Status::Broken);
        assert_eq!(groups[0].befores[0].steps[0].name, "environment down");
    }

    #[test]
    fn test_stop_clears_pointer() {
        let (reporter, writer) = reporter();
        reporter.start_test(TestMeta::new("t"));
        reporter.stop_test(TestOutcome::passed()).unwrap();
        reporter.stop_test(TestOutcome::failed("late")).unwrap();
        assert_eq!(writer.result_count(), 1);
    }
}
