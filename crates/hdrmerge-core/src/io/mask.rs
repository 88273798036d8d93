use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};
use ndarray::Array2;
use tracing::debug;

use crate::error::Result;

/// Gray level for mask index `index` in a stack of `num_images` exposures.
/// The last exposure is always white.
pub fn mask_gray(index: u16, num_images: usize) -> u8 {
    let num_colors = num_images.saturating_sub(1);
    let index = index as usize;
    if index >= num_colors {
        255
    } else {
        ((256 * index) / num_colors).min(255) as u8
    }
}

/// Save the exposure mask as an 8-bit grayscale PNG.
pub fn save_mask(mask: &Array2<u16>, num_images: usize, path: &Path) -> Result<()> {
    debug!(file = %path.display(), "Saving mask");
    let (h, w) = mask.dim();
    let img = GrayImage::from_fn(w as u32, h as u32, |x, y| {
        Luma([mask_gray(mask[[y as usize, x as usize]], num_images)])
    });
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
