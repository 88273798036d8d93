use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma};
use ndarray::Array2;
use tracing::{debug, info};

use crate::consts::SUPPORTED_BITS_PER_SAMPLE;
use crate::error::{HdrMergeError, Result};
use crate::frame::RawParameters;

/// Boundary to the output container writer. Returns the serialized
/// container; the caller decides where the bytes end up.
pub trait OutputWriter: Send + Sync {
    fn write(
        &self,
        image: &Array2<f32>,
        params: &RawParameters,
        bits_per_sample: u8,
        preview: Option<&GrayImage>,
    ) -> Result<Vec<u8>>;
}

/// Writes the composed image as a 16-bit grayscale TIFF.
#[derive(Clone, Copy, Debug, Default)]
pub struct TiffWriter;

impl OutputWriter for TiffWriter {
    fn write(
        &self,
        image: &Array2<f32>,
        params: &RawParameters,
        bits_per_sample: u8,
        preview: Option<&GrayImage>,
    ) -> Result<Vec<u8>> {
        let (h, w) = image.dim();
        if h == 0 || w == 0 {
            return Err(HdrMergeError::InvalidDimensions {
                width: w as u32,
                height: h as u32,
            });
        }
        if !SUPPORTED_BITS_PER_SAMPLE.contains(&bits_per_sample) {
            debug!(bits_per_sample, "Unsupported bit depth, writing 16 bits");
        }

        let pixels: Vec<u16> = image
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 65535.0) as u16)
            .collect();
        let img = image::ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
            .ok_or(HdrMergeError::InvalidDimensions {
                width: w as u32,
                height: h as u32,
            })?;

        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Tiff)?;

        info!(
            file = %params.file_name.display(),
            width = w,
            height = h,
            bits_per_sample,
            preview = ?preview.map(|p| p.dimensions()),
            "Encoded output container"
        );
        Ok(buf.into_inner())
    }
}
