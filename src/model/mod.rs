// Model module - result entities handed to the writer
// Pure data: construction helpers, equality, serialization; no behavior

pub mod attachment;
pub mod environment;
pub mod metadata;
pub mod result;
pub mod status;

pub use attachment::Attachment;
pub use environment::{Category, EnvironmentInfo};
pub use metadata::{Label, Link, Parameter, ParameterMode, StatusDetails};
pub use result::{FixtureResult, StepResult, TestResult, TestResultContainer};
pub use status::{Stage, Status};
