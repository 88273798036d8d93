use std::path::PathBuf;

use crate::error::LoadError;

/// Stage of [`ImageIo::load`](super::ImageIo::load), used for progress reporting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadStage {
    /// Decoding one input; carries the file name.
    Loading(PathBuf),
    ProcessingStack,
    Done,
}

impl std::fmt::Display for LoadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading(path) => write!(f, "Loading {}", path.display()),
            Self::ProcessingStack => write!(f, "Processing stack"),
            Self::Done => write!(f, "Done loading!"),
        }
    }
}

/// Stage of [`ImageIo::save`](super::ImageIo::save).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveStage {
    RenderingImage,
    RenderingPreview,
    WritingOutput,
    Done,
}

impl SaveStage {
    /// Completion percentage at the start of this stage.
    pub fn percent(self) -> u8 {
        match self {
            Self::RenderingImage => 0,
            Self::RenderingPreview => 33,
            Self::WritingOutput => 66,
            Self::Done => 100,
        }
    }
}

impl std::fmt::Display for SaveStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RenderingImage => write!(f, "Rendering image"),
            Self::RenderingPreview => write!(f, "Rendering preview"),
            Self::WritingOutput => write!(f, "Writing output"),
            Self::Done => write!(f, "Done writing"),
        }
    }
}

/// Thread-safe progress reporting for loading and saving.
///
/// Called synchronously from the orchestrating thread; implementations must
/// return promptly. All methods default to no-ops.
pub trait ProgressReporter: Send + Sync {
    /// Loading reached `percent` (0..=100).
    fn load_progress(&self, _percent: u8, _stage: &LoadStage) {}

    fn save_progress(&self, _stage: SaveStage) {}
}

/// Reporter that ignores every event.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Outcome of a successful [`ImageIo::load`](super::ImageIo::load).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadSummary {
    /// Exposures in the stack; 0 when the input held no usable frames.
    pub images: usize,
    pub aligned: bool,
    pub cropped: bool,
}

/// Integer form of a load outcome: `2n` for `n` loaded images, otherwise
/// the failing index shifted left by one with the low bit set for format
/// mismatches.
pub fn load_result_code(outcome: &std::result::Result<LoadSummary, LoadError>) -> usize {
    match outcome {
        Ok(summary) => summary.images << 1,
        Err(e) => e.result_code(),
    }
}
