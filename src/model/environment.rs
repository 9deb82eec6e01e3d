// Run-scoped documents: defect categories and environment info

use crate::model::Status;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Defect category definition used by the downstream renderer to group
/// failures. Run-scoped: one categories document per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_statuses: Vec<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flaky: Option<bool>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            matched_statuses: Vec::new(),
            message_regex: None,
            trace_regex: None,
            flaky: None,
        }
    }

    pub fn matching(mut self, statuses: impl IntoIterator<Item = Status>) -> Self {
        self.matched_statuses = statuses.into_iter().collect();
        self
    }

    pub fn message_regex(mut self, pattern: impl Into<String>) -> Self {
        self.message_regex = Some(pattern.into());
        self
    }
}

/// Key/value description of the environment a run executed in.
///
/// Keys are kept sorted so the persisted document is stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvironmentInfo(pub BTreeMap<String, String>);

impl EnvironmentInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for EnvironmentInfo {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
