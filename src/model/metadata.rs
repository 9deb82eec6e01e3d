// Metadata attached to results: labels, links, parameters, status details

use serde::{Deserialize, Serialize};

/// Name/value label. Labels form an ordered multiset: duplicates are
/// permitted and registration order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Link to an external resource (issue tracker, TMS, documentation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "type")]
    pub link_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub url: String,
}

impl Link {
    pub fn new(link_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            link_type: link_type.into(),
            name: None,
            url: url.into(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Display mode for a parameter value in the rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterMode {
    #[default]
    Default,
    /// Value is replaced by a placeholder in the rendered report.
    Masked,
    /// Parameter is not rendered at all.
    Hidden,
}

/// Test or step parameter.
///
/// Parameters flagged `excluded` are kept in the result document but removed
/// from the canonical serialization that feeds `historyId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "is_default_mode")]
    pub mode: ParameterMode,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub excluded: bool,
}

fn is_default_mode(mode: &ParameterMode) -> bool {
    *mode == ParameterMode::Default
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            mode: ParameterMode::Default,
            excluded: false,
        }
    }

    pub fn masked(mut self) -> Self {
        self.mode = ParameterMode::Masked;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.mode = ParameterMode::Hidden;
        self
    }

    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }
}

/// Failure detail carried alongside a status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flaky: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
}

impl StatusDetails {
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }
}
