// Writer module - the persistence boundary
// Independent implementations of one capability trait, selected by
// configuration; the engine behaves identically under any conforming writer

pub mod fs;
pub mod memory;

use crate::errors::ReportError;
use crate::model::{Category, EnvironmentInfo, TestResult, TestResultContainer};
use std::path::Path;

pub use fs::FileSystemWriter;
pub use memory::InMemoryWriter;

/// Options accompanying an attachment write.
#[derive(Debug, Clone, Default)]
pub struct AttachmentOptions {
    pub content_type: String,
    /// Preferred file extension, including the dot. Writers may ignore it.
    pub extension: Option<String>,
}

impl AttachmentOptions {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            extension: None,
        }
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }
}

/// Persistence sink for finalized results.
///
/// The sink is append-only and shared across lanes; implementations must
/// serialize their own internal state so concurrent writes for distinct
/// entities cannot corrupt each other. Relative ordering across lanes is
/// immaterial. Retry policy belongs to the implementation, never the engine.
pub trait ResultWriter: Send + Sync {
    /// Persist one finalized test result.
    fn write_result(&self, result: &TestResult) -> Result<(), ReportError>;

    /// Persist one finalized container.
    fn write_group(&self, container: &TestResultContainer) -> Result<(), ReportError>;

    /// Persist attachment bytes; the returned storage reference becomes
    /// `Attachment.source` and is opaque to the engine.
    fn write_attachment(
        &self,
        name: &str,
        bytes: &[u8],
        options: &AttachmentOptions,
    ) -> Result<String, ReportError>;

    /// Persist an attachment by reading `path` at write time.
    fn write_attachment_from_path(
        &self,
        path: &Path,
        dest_name: &str,
    ) -> Result<String, ReportError>;

    /// Persist run environment info. Last write wins within a run.
    fn write_environment_info(&self, environment: &EnvironmentInfo) -> Result<(), ReportError>;

    /// Persist defect category definitions. Last write wins within a run.
    fn write_categories(&self, categories: &[Category]) -> Result<(), ReportError>;
}
