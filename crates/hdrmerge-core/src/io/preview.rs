use image::{GrayImage, Luma};
use ndarray::Array2;

use crate::pipeline::config::PreviewSize;

const PREVIEW_GAMMA: f32 = 1.0 / 2.2;

/// Render a gamma-encoded luminance preview of a composed image.
///
/// `exp_shift` is the exposure boost in stops applied before encoding.
pub fn render_preview(image: &Array2<f32>, size: PreviewSize, exp_shift: f32) -> Option<GrayImage> {
    let (h, w) = image.dim();
    let gain = exp_shift.exp2();
    let encode = |v: f32| ((v * gain).clamp(0.0, 1.0).powf(PREVIEW_GAMMA) * 255.0).round() as u8;

    match size {
        PreviewSize::None => None,
        PreviewSize::Full => {
            if h == 0 || w == 0 {
                return None;
            }
            Some(GrayImage::from_fn(w as u32, h as u32, |x, y| {
                Luma([encode(image[[y as usize, x as usize]])])
            }))
        }
        PreviewSize::Half => {
            let (ph, pw) = (h / 2, w / 2);
            if ph == 0 || pw == 0 {
                return None;
            }
            Some(GrayImage::from_fn(pw as u32, ph as u32, |x, y| {
                let (r, c) = (y as usize * 2, x as usize * 2);
                let mean = (image[[r, c]] + image[[r, c + 1]] + image[[r + 1, c]] + image[[r + 1, c + 1]])
                    / 4.0;
                Luma([encode(mean)])
            }))
        }
    }
}
