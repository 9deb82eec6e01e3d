// Filesystem writer - one JSON document per entity
// Layout consumed by the downstream report renderer: {uuid}-result.json,
// {uuid}-container.json, attachment blobs, environment.properties,
// categories.json

use crate::errors::ReportError;
use crate::model::{Category, EnvironmentInfo, TestResult, TestResultContainer};
use crate::writer::{AttachmentOptions, ResultWriter};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Writer persisting results as individual files in one output directory.
pub struct FileSystemWriter {
    output_dir: PathBuf,
}

impl FileSystemWriter {
    /// Create the writer, creating the output directory up front.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, ReportError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)
            .map_err(|e| ReportError::io("create report directory", &output_dir, e))?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_json<T: serde::Serialize>(
        &self,
        file_name: &str,
        document: &'static str,
        value: &T,
    ) -> Result<(), ReportError> {
        let path = self.output_dir.join(file_name);
        let file = fs::File::create(&path)
            .map_err(|e| ReportError::io("create report file", &path, e))?;
        serde_json::to_writer(file, value).map_err(|e| ReportError::serialize(document, e))
    }
}

impl ResultWriter for FileSystemWriter {
    fn write_result(&self, result: &TestResult) -> Result<(), ReportError> {
        tracing::debug!("Writing result {} ({})", result.name, result.uuid);
        self.write_json(&format!("{}-result.json", result.uuid), "test result", result)
    }

    fn write_group(&self, container: &TestResultContainer) -> Result<(), ReportError> {
        tracing::debug!("Writing container {} ({})", container.name, container.uuid);
        self.write_json(
            &format!("{}-container.json", container.uuid),
            "result container",
            container,
        )
    }

    fn write_attachment(
        &self,
        _name: &str,
        bytes: &[u8],
        options: &AttachmentOptions,
    ) -> Result<String, ReportError> {
        let extension = options.extension.as_deref().unwrap_or("");
        let source = format!("{}-attachment{}", Uuid::new_v4(), extension);
        let path = self.output_dir.join(&source);
        fs::write(&path, bytes)
            .map_err(|e| ReportError::io("write attachment", &path, e))?;
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
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"));
        let options = AttachmentOptions {
            content_type: String::new(),
            extension,
        };
        self.write_attachment(dest_name, &bytes, &options)
    }

    fn write_environment_info(&self, environment: &EnvironmentInfo) -> Result<(), ReportError> {
        let path = self.output_dir.join("environment.properties");
        let mut file = fs::File::create(&path)
            .map_err(|e| ReportError::io("create environment file", &path, e))?;
        for (key, value) in environment.iter() {
            writeln!(file, "{key}={value}")
                .map_err(|e| ReportError::io("write environment file", &path, e))?;
        }
        Ok(())
    }

    fn write_categories(&self, categories: &[Category]) -> Result<(), ReportError> {
        self.write_json("categories.json", "categories", &categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_one_document_per_result() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let writer = FileSystemWriter::new(dir.path()).unwrap();
        let result = TestResult::new("t");

        writer.write_result(&result).unwrap();

        let path = dir.path().join(format!("{}-result.json", result.uuid));
        assert!(path.exists());
        let content = fs::read_to_string(&path).unwrap();
        let back: TestResult = serde_json::from_str(&content).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_attachment_source_is_returned_file_name() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let writer = FileSystemWriter::new(dir.path()).unwrap();

        let source = writer
            .write_attachment(
                "request",
                b"{}",
                &AttachmentOptions::new("application/json").extension(".json"),
            )
            .unwrap();

        assert!(source.ends_with("-attachment.json"));
        assert_eq!(fs::read(dir.path().join(&source)).unwrap(), b"{}");
    }

    #[test]
    fn test_environment_properties_format() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let writer = FileSystemWriter::new(dir.path()).unwrap();
        let mut environment = EnvironmentInfo::new();
        environment.set("browser", "firefox");
        environment.set("os", "linux");

        writer.write_environment_info(&environment).unwrap();

        let content = fs::read_to_string(dir.path().join("environment.properties")).unwrap();
        assert_eq!(content, "browser=firefox\nos=linux\n");
    }

    #[test]
    fn test_categories_overwrite() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let writer = FileSystemWriter::new(dir.path()).unwrap();

        writer.write_categories(&[Category::new("X")]).unwrap();
        writer.write_categories(&[Category::new("Y")]).unwrap();

        let content = fs::read_to_string(dir.path().join("categories.json")).unwrap();
        let back: Vec<Category> = serde_json::from_str(&content).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].name, "Y");
    }

    #[test]
    fn test_attachment_from_path_keeps_extension() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let writer = FileSystemWriter::new(dir.path()).unwrap();
        let src = dir.path().join("payload.txt");
        fs::write(&src, b"hello").unwrap();

        let source = writer.write_attachment_from_path(&src, "payload").unwrap();

        assert!(source.ends_with(".txt"));
        assert_eq!(fs::read(dir.path().join(&source)).unwrap(), b"hello");
    }
}
