pub mod config;
pub mod context;
pub mod diagnostics;
pub mod errors;
pub mod identity;
pub mod logging;
pub mod model;
pub mod protocol;
pub mod runtime;
pub mod writer;

pub use config::WriterConfig;
pub use context::ContextToken;
pub use diagnostics::DiagnosticsSnapshot;
pub use errors::ReportError;
pub use protocol::{FixtureMeta, RuntimeMessage, TestMeta, TestOutcome, TestPatch};
pub use runtime::{LifecycleListener, ReporterRuntime, SingleLaneReporter};
pub use writer::{AttachmentOptions, ResultWriter};
