// Attachment reference stored on results and steps

use serde::{Deserialize, Serialize};

/// Reference to an attachment persisted through the writer.
///
/// `source` is the opaque storage reference returned by
/// `ResultWriter::write_attachment`; the engine never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub source: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

impl Attachment {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            content_type: content_type.into(),
        }
    }
}
