// In-memory writer - record/replay store
// Substituted for the filesystem writer in tests; also useful for adapters
// that forward results over their own transport

use crate::errors::ReportError;
use crate::model::{Category, EnvironmentInfo, TestResult, TestResultContainer};
use crate::writer::{AttachmentOptions, ResultWriter};
use std::path::Path;
use std::sync::Mutex;

/// One recorded attachment blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAttachment {
    pub name: String,
    pub source: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct Store {
    results: Vec<TestResult>,
    groups: Vec<TestResultContainer>,
    attachments: Vec<RecordedAttachment>,
    environment: Option<EnvironmentInfo>,
    categories: Option<Vec<Category>>,
}

/// Writer that records everything handed to it, in arrival order.
#[derive(Debug, Default)]
pub struct InMemoryWriter {
    store: Mutex<Store>,
    next_ref: Mutex<u64>,
}

impl InMemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<TestResult> {
        self.store.lock().expect("store poisoned").results.clone()
    }

    pub fn groups(&self) -> Vec<TestResultContainer> {
        self.store.lock().expect("store poisoned").groups.clone()
    }

    pub fn attachments(&self) -> Vec<RecordedAttachment> {
        self.store.lock().expect("store poisoned").attachments.clone()
    }

    pub fn environment(&self) -> Option<EnvironmentInfo> {
        self.store.lock().expect("store poisoned").environment.clone()
    }

    pub fn categories(&self) -> Option<Vec<Category>> {
        self.store.lock().expect("store poisoned").categories.clone()
    }

    pub fn result_count(&self) -> usize {
        self.store.lock().expect("store poisoned").results.len()
    }

    /// Replay one recorded result through its serialized form, proving the
    /// captured document is structurally faithful.
    pub fn replay_result(&self, index: usize) -> Option<TestResult> {
        let store = self.store.lock().expect("store poisoned");
        let result = store.results.get(index)?;
        let json = serde_json::to_string(result).ok()?;
        serde_json::from_str(&json).ok()
    }

    fn next_source(&self, name: &str) -> String {
        let mut next = self.next_ref.lock().expect("counter poisoned");
        *next += 1;
        format!("mem-{}-{}", *next, name)
    }
}

impl ResultWriter for InMemoryWriter {
    fn write_result(&self, result: &TestResult) -> Result<(), ReportError> {
        self.store
            .lock()
            .expect("store poisoned")
            .results
            .push(result.clone());
        Ok(())
    }

    fn write_group(&self, container: &TestResultContainer) -> Result<(), ReportError> {
        self.store
            .lock()
            .expect("store poisoned")
            .groups
            .push(container.clone());
        Ok(())
    }

    fn write_attachment(
        &self,
        name: &str,
        bytes: &[u8],
        options: &AttachmentOptions,
    ) -> Result<String, ReportError> {
        let source = self.next_source(name);
        self.store
            .lock()
            .expect("store poisoned")
            .attachments
            .push(RecordedAttachment {
                name: name.to_string(),
                source: source.clone(),
                content_type: options.content_type.clone(),
                bytes: bytes.to_vec(),
            });
        Ok(source)
    }

    fn write_attachment_from_path(
        &self,
        path: &Path,
        dest_name: &str,
    ) -> Result<String, ReportError> {
        let bytes = std::fs::read(path).map_err(|source| ReportError::AttachmentSource {
            path: path.to_path_buf(),
            source,
        })?;
        self.write_attachment(dest_name, &bytes, &AttachmentOptions::default())
    }

    fn write_environment_info(&self, environment: &EnvironmentInfo) -> Result<(), ReportError> {
        self.store.lock().expect("store poisoned").environment = Some(environment.clone());
        Ok(())
    }

    fn write_categories(&self, categories: &[Category]) -> Result<(), ReportError> {
        self.store.lock().expect("store poisoned").categories = Some(categories.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_results_in_order() {
        let writer = InMemoryWriter::new();
        writer.write_result(&TestResult::new("first")).unwrap();
        writer.write_result(&TestResult::new("second")).unwrap();

        let results = writer.results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "first");
        assert_eq!(results[1].name, "second");
    }

    #[test]
    fn test_attachment_sources_are_unique() {
        let writer = InMemoryWriter::new();
        let a = writer
            .write_attachment("log", b"a", &AttachmentOptions::new("text/plain"))
            .unwrap();
        let b = writer
            .write_attachment("log", b"b", &AttachmentOptions::new("text/plain"))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(writer.attachments()[0].bytes, b"a");
    }

    #[test]
    fn test_environment_last_write_wins() {
        let writer = InMemoryWriter::new();
        let mut first = EnvironmentInfo::new();
        first.set("os", "linux");
        let mut second = EnvironmentInfo::new();
        second.set("os", "macos");

        writer.write_environment_info(&first).unwrap();
        writer.write_environment_info(&second).unwrap();
        assert_eq!(writer.environment().unwrap().get("os"), Some("macos"));
    }

    #[test]
    fn test_replay_round_trips() {
        let writer = InMemoryWriter::new();
        let mut result = TestResult::new("t");
        result.full_name = Some("pkg.t".into());
        writer.write_result(&result).unwrap();

        let replayed = writer.replay_result(0).unwrap();
        assert_eq!(replayed, result);
    }

    #[test]
    fn test_attachment_from_missing_path_errors() {
        let writer = InMemoryWriter::new();
        let err = writer
            .write_attachment_from_path(Path::new("/nonexistent/blob.bin"), "blob")
            .unwrap_err();
        assert!(matches!(err, ReportError::AttachmentSource { .. }));
    }
}
