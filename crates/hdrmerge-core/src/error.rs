use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HdrMergeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid SER file: {0}")]
    InvalidSer(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Frame index {index} out of range (total: {total})")]
    FrameIndexOutOfRange { index: usize, total: usize },

    #[error("Unsupported sensor layout: {0}")]
    UnsupportedLayout(String),

    #[error(
        "Error loading {}, {}",
        file.display(),
        if source.is_format_error() { "it has a different format" } else { "it could not be decoded" }
    )]
    LoadFailed {
        file: PathBuf,
        #[source]
        source: LoadError,
    },

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("No usable frames in {0}")]
    NoUsableFrames(PathBuf),

    #[error("Exposure stack is empty")]
    EmptyStack,

    #[error("Stack error: {0}")]
    Stack(String),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),
}

/// Failure of a single ingestion batch. The batch is always discarded as a
/// whole; `index` points at the input (file or frame) that stopped it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    #[error("input {index} could not be decoded")]
    DecodeFailed { index: usize },

    #[error("input {index} has a different format")]
    FormatMismatch { index: usize },
}

impl LoadError {
    pub fn index(&self) -> usize {
        match *self {
            Self::DecodeFailed { index } | Self::FormatMismatch { index } => index,
        }
    }

    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::FormatMismatch { .. })
    }

    /// Encoded form used by command-line callers: the failing index shifted
    /// left by one, with the low bit set for format mismatches.
    pub fn result_code(&self) -> usize {
        (self.index() << 1) | usize::from(self.is_format_error())
    }
}

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("cannot read metadata from {path}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("cannot read metadata from output container: {0}")]
    DestinationUnreadable(String),

    #[error("cannot write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, HdrMergeError>;
