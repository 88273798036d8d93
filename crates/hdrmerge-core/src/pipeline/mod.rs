pub mod batch;
pub mod config;
pub mod merge;
mod orchestrator;
mod types;

pub use batch::bracketed_sets;
pub use config::{LoadOptions, MergeConfig, PreviewSize, SaveOptions};
pub use merge::{automatic_merge, Backends, MergeReport, SetOutcome, SetResult};
pub use orchestrator::{ImageIo, SaveSummary};
pub use types::{load_result_code, LoadStage, LoadSummary, NoOpReporter, ProgressReporter, SaveStage};
