// Result entities: tests, containers, fixtures, steps
// Pure data; all behavior lives in the runtime

use crate::model::{Attachment, Label, Link, Parameter, Stage, Status, StatusDetails};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One executed test, as handed to the writer at finalize time.
///
/// `uuid` is run-local and random; it links children to parents within a
/// single run and carries no cross-run meaning. Cross-run correlation uses
/// `test_case_id` and `history_id`, both derived deterministically by the
/// `identity` module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub uuid: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_case_id: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    #[serde(default)]
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl TestResult {
    /// Create a scheduled test result with a fresh run-local uuid.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            full_name: None,
            history_id: None,
            test_case_id: None,
            status: Status::Unknown,
            status_details: None,
            stage: Stage::Scheduled,
            description: None,
            description_html: None,
            start: None,
            stop: None,
            labels: Vec::new(),
            links: Vec::new(),
            parameters: Vec::new(),
            steps: Vec::new(),
            attachments: Vec::new(),
        }
    }
}

/// Grouping entity owning tests and their before/after fixtures.
///
/// Many-to-one: one container may own several test uuids when the host
/// associates a single fixture execution with multiple tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultContainer {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub befores: Vec<FixtureResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub afters: Vec<FixtureResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
}

impl TestResultContainer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            children: Vec::new(),
            befores: Vec::new(),
            afters: Vec::new(),
            start: None,
            stop: None,
        }
    }
}

/// One before/after hook execution, reported as its own timed entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureResult {
    pub name: String,
    #[serde(default)]
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    #[serde(default)]
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
}

impl FixtureResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Status::Unknown,
            status_details: None,
            stage: Stage::Scheduled,
            parameters: Vec::new(),
            steps: Vec::new(),
            attachments: Vec::new(),
            start: None,
            stop: None,
        }
    }
}

/// One step in a test or fixture body. Steps nest recursively; nesting is
/// determined purely by the lane's open-step stack at start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// Run-local identity of the step frame, used to detect crossed stops.
    pub uuid: Uuid,
    pub name: String,
    #[serde(default)]
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    #[serde(default)]
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
}

impl StepResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            status: Status::Unknown,
            status_details: None,
            stage: Stage::Scheduled,
            parameters: Vec::new(),
            labels: Vec::new(),
            steps: Vec::new(),
            attachments: Vec::new(),
            start: None,
            stop: None,
        }
    }
}
