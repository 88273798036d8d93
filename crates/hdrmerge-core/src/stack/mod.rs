pub mod align;
pub mod hdr;

use ndarray::Array2;

use crate::error::Result;
use crate::frame::{Exposure, ExposureId, RawParameters};

pub use hdr::HdrStack;

/// Boundary to the exposure-stack compute engine.
///
/// The stack chooses where each exposure goes; callers learn the order
/// through [`ExposureStack::id_at`] rather than by mirroring positions.
/// Every stage runs to completion before returning.
pub trait ExposureStack: Send {
    /// Insert an exposure and return the position the stack chose for it.
    fn insert(&mut self, exposure: Exposure) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifier of the exposure at `position`.
    fn id_at(&self, position: usize) -> Option<ExposureId>;

    /// Identifiers in stack order.
    fn ids(&self) -> Vec<ExposureId> {
        (0..self.len()).filter_map(|p| self.id_at(p)).collect()
    }

    fn clear(&mut self);

    fn set_flip(&mut self, flip: u8);

    fn calculate_saturation_level(&mut self, params: &RawParameters, use_custom_white: bool);

    fn align(&mut self) -> Result<()>;

    fn crop(&mut self);

    fn is_cropped(&self) -> bool;

    fn compute_response_functions(&mut self);

    fn generate_mask(&mut self);

    /// Per-pixel index of the exposure chosen for that pixel.
    fn mask(&self) -> Option<&Array2<u16>>;

    fn width(&self) -> usize;

    fn height(&self) -> usize;

    /// Exposure difference, in stops, between the brightest and the darkest
    /// exposure.
    fn max_exposure(&self) -> f32;

    fn compose(&self, params: &RawParameters, feather_radius: u32) -> Result<Array2<f32>>;
}
