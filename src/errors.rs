// Error types for the reporting runtime

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the runtime and by writer implementations.
///
/// Protocol-level problems (stop without start, double stop, orphan
/// attachments) are deliberately NOT represented here: those degrade to
/// no-ops counted by `Diagnostics`, so a misbehaving adapter cannot abort
/// the host test run.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Structural misconfiguration detected at construction time.
    #[error("runtime configuration error: {0}")]
    Config(String),

    #[error("failed to {action} at {path}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {document}")]
    Serialize {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Attachment source file could not be read for a deferred attachment.
    #[error("attachment source not readable: {path}")]
    AttachmentSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReportError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn serialize(document: &'static str, source: serde_json::Error) -> Self {
        Self::Serialize { document, source }
    }
}
