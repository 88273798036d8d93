pub mod mask;
pub mod preview;
pub mod ser;
pub mod writer;

use std::path::Path;

use crate::error::Result;
use crate::frame::{CreationInterval, DecodedExposure};

/// Boundary to the raw decoding backend.
///
/// Decoding of independent frames has no shared state, so implementations
/// must be callable from several threads at once.
pub trait ExposureDecoder: Send + Sync {
    /// Number of logical frames stored in `path`; 0 when it cannot be read.
    fn probe_frame_count(&self, path: &Path) -> usize;

    /// Decode frame `frame` of `path`. No partial buffer on failure.
    fn decode(&self, path: &Path, frame: usize) -> Result<DecodedExposure>;

    /// Capture interval of the first frame, if the file records one.
    fn probe_creation_interval(&self, path: &Path) -> Option<CreationInterval>;
}

pub use mask::save_mask;
pub use preview::render_preview;
pub use ser::{SerDecoder, SerReader};
pub use writer::{OutputWriter, TiffWriter};
