// Runtime configuration
// Writer implementations are independent variants of one capability,
// selected here rather than through an inheritance chain

use crate::errors::ReportError;
use crate::writer::{FileSystemWriter, InMemoryWriter, ResultWriter};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Which writer implementation the runtime persists through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WriterConfig {
    /// One JSON document per entity under `output_dir`.
    FileSystem { output_dir: PathBuf },
    /// Record/replay store; nothing touches disk.
    InMemory,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self::FileSystem {
            output_dir: PathBuf::from(default_output_dir()),
        }
    }
}

impl WriterConfig {
    /// Construct the configured writer.
    pub fn build(&self) -> Result<Arc<dyn ResultWriter>, ReportError> {
        match self {
            Self::FileSystem { output_dir } => {
                Ok(Arc::new(FileSystemWriter::new(output_dir.clone())?))
            }
            Self::InMemory => Ok(Arc::new(InMemoryWriter::new())),
        }
    }
}

fn default_output_dir() -> &'static str {
    "report-results"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_file_system() {
        let config = WriterConfig::default();
        assert!(matches!(config, WriterConfig::FileSystem { .. }));
    }

    #[test]
    fn test_tagged_deserialization() {
        let config: WriterConfig = serde_json::from_str(r#"{"type":"in-memory"}"#).unwrap();
        assert_eq!(config, WriterConfig::InMemory);

        let config: WriterConfig =
            serde_json::from_str(r#"{"type":"file-system","output_dir":"/tmp/r"}"#).unwrap();
        assert!(matches!(config, WriterConfig::FileSystem { .. }));
    }

    #[test]
    fn test_build_in_memory() {
        let writer = WriterConfig::InMemory.build();
        assert!(writer.is_ok());
    }
}
