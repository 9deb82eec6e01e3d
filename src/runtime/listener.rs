// Lifecycle listeners - hooks invoked at finalize time, before the writer

use crate::model::{TestResult, TestResultContainer};
use anyhow::Result;

/// Hook invoked when an entity finalizes, before persistence.
///
/// Each hook receives the finalized entity and may mutate it (return a
/// changed value), pass it through unchanged, or return `Ok(None)` to
/// suppress persistence entirely. An `Err` is logged and swallowed: it never
/// prevents other listeners or the default write from running.
pub trait LifecycleListener: Send + Sync {
    /// Called with each finalized test result.
    fn on_test_result(&self, result: TestResult) -> Result<Option<TestResult>> {
        Ok(Some(result))
    }

    /// Called with each finalized container.
    fn on_test_container(
        &self,
        container: TestResultContainer,
    ) -> Result<Option<TestResultContainer>> {
        Ok(Some(container))
    }
}
