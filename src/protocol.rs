// Runtime message protocol - the sole contract between adapters and the engine
// Every variant is self-contained and serializable so messages can cross
// process or transport boundaries unchanged

use crate::model::{Label, Link, Parameter, Status, StatusDetails};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// One lifecycle event on a lane.
///
/// Messages for one lane are processed strictly in arrival order; ordering
/// across lanes is unspecified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RuntimeMessage {
    /// Open a new test lane. Arriving on an already-open lane this is a
    /// double start and is discarded with a diagnostic.
    StartTest { meta: TestMeta },

    /// Finalize the lane's test with the given outcome.
    StopTest { outcome: TestOutcome },

    /// Patch top-level test metadata in place.
    UpdateTest { patch: TestPatch },

    /// Open a step under the lane's current frame. An adapter may supply
    /// its own frame uuid to enable crossed-stop detection on the way out.
    StartStep {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        uuid: Option<Uuid>,
        #[serde(skip_serializing_if = "Option::is_none")]
        start: Option<i64>,
    },

    /// Close the most recently opened step in the lane. When `uuid` is set
    /// and does not match the frame actually closed, the mismatch is
    /// reported as a diagnostic; the top frame closes regardless (LIFO).
    StopStep {
        #[serde(skip_serializing_if = "Option::is_none")]
        uuid: Option<Uuid>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<Status>,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<StatusDetails>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop: Option<i64>,
    },

    /// Label or parameter attached to the currently open step.
    StepMetadata {
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<Label>,
        #[serde(skip_serializing_if = "Option::is_none")]
        parameter: Option<Parameter>,
    },

    /// Open a new fixture lane.
    StartFixture { meta: FixtureMeta },

    /// Finalize the lane's fixture and its container.
    StopFixture { outcome: TestOutcome },

    /// Inline attachment bytes, persisted through the writer immediately.
    RawAttachment {
        name: String,
        content_type: String,
        bytes: Vec<u8>,
    },

    /// Deferred attachment: the writer reads the file at persist time.
    AttachmentFromPath {
        path: PathBuf,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
    },

    /// Labels appended to the lane's test, in order, duplicates permitted.
    LabelBatch { labels: Vec<Label> },

    /// Links appended to the lane's test.
    LinkBatch { links: Vec<Link> },

    /// Parameters appended to the lane's test.
    ParameterBatch { parameters: Vec<Parameter> },

    /// Associate an owned test uuid with the lane's fixture container.
    OwnTest { test_id: Uuid },

    /// Attachment not tied to any running test; routed to the synthetic
    /// run-level container.
    GlobalAttachment {
        name: String,
        content_type: String,
        bytes: Vec<u8>,
    },

    /// Error not tied to any running test; routed to the synthetic
    /// run-level container.
    GlobalError {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        trace: Option<String>,
    },
}

impl RuntimeMessage {
    // Thin builders over the protocol. Each convenience call constructs a
    // message; none of them is a separate capability.

    pub fn step(name: impl Into<String>) -> Self {
        Self::StartStep {
            name: name.into(),
            uuid: None,
            start: None,
        }
    }

    pub fn step_with_id(name: impl Into<String>, uuid: Uuid) -> Self {
        Self::StartStep {
            name: name.into(),
            uuid: Some(uuid),
            start: None,
        }
    }

    pub fn stop_step() -> Self {
        Self::StopStep {
            uuid: None,
            status: Some(Status::Passed),
            details: None,
            stop: None,
        }
    }

    pub fn stop_step_for(uuid: Uuid) -> Self {
        Self::StopStep {
            uuid: Some(uuid),
            status: Some(Status::Passed),
            details: None,
            stop: None,
        }
    }

    pub fn stop_step_with(status: Status, details: Option<StatusDetails>) -> Self {
        Self::StopStep {
            uuid: None,
            status: Some(status),
            details,
            stop: None,
        }
    }

    pub fn label(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::LabelBatch {
            labels: vec![Label::new(name, value)],
        }
    }

    pub fn link(link_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self::LinkBatch {
            links: vec![Link::new(link_type, url)],
        }
    }

    pub fn parameter(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::ParameterBatch {
            parameters: vec![Parameter::new(name, value)],
        }
    }

    pub fn step_label(label: Label) -> Self {
        Self::StepMetadata {
            label: Some(label),
            parameter: None,
        }
    }

    pub fn step_parameter(parameter: Parameter) -> Self {
        Self::StepMetadata {
            label: None,
            parameter: Some(parameter),
        }
    }

    pub fn attach(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self::RawAttachment {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn attach_file(path: impl Into<PathBuf>) -> Self {
        Self::AttachmentFromPath {
            path: path.into(),
            name: None,
            content_type: None,
        }
    }
}

/// Final outcome carried by a stop message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,
    /// Abort signal: the entity finishes with stage `interrupted` instead of
    /// `finished`. Silence is never a cancellation signal; aborts arrive as
    /// an explicit stop with this flag set.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub interrupted: bool,
}

impl TestOutcome {
    pub fn passed() -> Self {
        Self {
            status: Status::Passed,
            details: None,
            interrupted: false,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failed,
            details: Some(StatusDetails::from_message(message)),
            interrupted: false,
        }
    }

    pub fn broken(message: impl Into<String>) -> Self {
        Self {
            status: Status::Broken,
            details: Some(StatusDetails::from_message(message)),
            interrupted: false,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: Status::Skipped,
            details: Some(StatusDetails::from_message(reason)),
            interrupted: false,
        }
    }

    pub fn interrupted(message: impl Into<String>) -> Self {
        Self {
            status: Status::Broken,
            details: Some(StatusDetails::from_message(message)),
            interrupted: true,
        }
    }
}

/// Payload of a start-test message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMeta {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

impl TestMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push(Label::new(name, value));
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// Whether a fixture runs before or after its owned tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureKind {
    Before,
    After,
}

/// Payload of a start-fixture message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureMeta {
    pub name: String,
    pub kind: FixtureKind,
    /// Container name; defaults to the fixture name when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

impl FixtureMeta {
    pub fn before(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FixtureKind::Before,
            container_name: None,
            parameters: Vec::new(),
        }
    }

    pub fn after(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FixtureKind::After,
            container_name: None,
            parameters: Vec::new(),
        }
    }

    pub fn container(mut self, name: impl Into<String>) -> Self {
        self.container_name = Some(name.into());
        self
    }
}

/// Partial update applied to a test's top-level metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    /// Preset identity; finalize keeps it instead of deriving its own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_case_id: Option<String>,
}
