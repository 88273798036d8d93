use ndarray::Array2;
use num_complex::Complex;
use rustfft::FftPlanner;

use crate::consts::MAX_ALIGN_FRACTION;
use crate::error::{HdrMergeError, Result};

/// Integer translation between two images, in proxy pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelOffset {
    pub dy: isize,
    pub dx: isize,
}

/// Compute the translation that maps `target` onto `reference` using FFT
/// phase correlation. Applying the offset means
/// `aligned[r, c] = target[r - dy, c - dx]`.
///
/// Peaks further than a quarter of the image away are rejected as
/// spurious and reported as no motion.
pub fn phase_offset(reference: &Array2<f32>, target: &Array2<f32>) -> Result<PixelOffset> {
    let (h, w) = reference.dim();
    let (th, tw) = target.dim();
    if h != th || w != tw {
        return Err(HdrMergeError::Stack(format!(
            "Array size mismatch: {}x{} vs {}x{}",
            w, h, tw, th
        )));
    }
    if h < 2 || w < 2 {
        return Ok(PixelOffset::default());
    }

    let ref_fft = fft2d(&apply_hann(reference));
    let tgt_fft = fft2d(&apply_hann(target));
    let correlation = ifft2d(&normalized_cross_power(&ref_fft, &tgt_fft));
    let (peak_row, peak_col) = find_peak(&correlation);

    // Handle wrap-around
    let dy = if peak_row > h / 2 {
        peak_row as isize - h as isize
    } else {
        peak_row as isize
    };
    let dx = if peak_col > w / 2 {
        peak_col as isize - w as isize
    } else {
        peak_col as isize
    };

    let max_dy = (h as f64 * MAX_ALIGN_FRACTION) as isize;
    let max_dx = (w as f64 * MAX_ALIGN_FRACTION) as isize;
    if dy.abs() > max_dy || dx.abs() > max_dx {
        return Ok(PixelOffset::default());
    }
    Ok(PixelOffset { dy, dx })
}

fn apply_hann(data: &Array2<f32>) -> Array2<f32> {
    let (h, w) = data.dim();
    Array2::from_shape_fn((h, w), |(row, col)| {
        let wy = 0.5 * (1.0 - (std::f64::consts::TAU * row as f64 / h as f64).cos());
        let wx = 0.5 * (1.0 - (std::f64::consts::TAU * col as f64 / w as f64).cos());
        data[[row, col]] * (wy * wx) as f32
    })
}

/// 2D FFT: row-wise FFT, then column-wise FFT.
fn fft2d(data: &Array2<f32>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);

    let mut result = data.mapv(|v| Complex::new(v as f64, 0.0));

    for mut row in result.rows_mut() {
        let mut row_data = row.to_vec();
        fft_row.process(&mut row_data);
        row.assign(&ndarray::ArrayView1::from(&row_data));
    }

    for mut col in result.columns_mut() {
        let mut col_data = col.to_vec();
        fft_col.process(&mut col_data);
        col.assign(&ndarray::ArrayView1::from(&col_data));
    }

    result
}

/// Inverse 2D FFT, real part only.
fn ifft2d(data: &Array2<Complex<f64>>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let ifft_row = planner.plan_fft_inverse(w);
    let ifft_col = planner.plan_fft_inverse(h);

    let mut work = data.clone();

    for mut col in work.columns_mut() {
        let mut col_data = col.to_vec();
        ifft_col.process(&mut col_data);
        col.assign(&ndarray::ArrayView1::from(&col_data));
    }

    for mut row in work.rows_mut() {
        let mut row_data = row.to_vec();
        ifft_row.process(&mut row_data);
        row.assign(&ndarray::ArrayView1::from(&row_data));
    }

    let scale = 1.0 / (h * w) as f64;
    work.mapv(|c| c.re * scale)
}

fn normalized_cross_power(
    ref_fft: &Array2<Complex<f64>>,
    tgt_fft: &Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    let mut result = ref_fft.clone();
    ndarray::Zip::from(&mut result)
        .and(tgt_fft)
        .for_each(|r, &t| {
            let cross = *r * t.conj();
            let mag = cross.norm();
            *r = if mag > 1e-12 {
                cross / mag
            } else {
                Complex::new(0.0, 0.0)
            };
        });
    result
}

fn find_peak(data: &Array2<f64>) -> (usize, usize) {
    let mut best = (0, 0);
    let mut best_val = f64::NEG_INFINITY;
    for ((row, col), &v) in data.indexed_iter() {
        if v > best_val {
            best_val = v;
            best = (row, col);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(h: usize, w: usize, cy: f32, cx: f32) -> Array2<f32> {
        Array2::from_shape_fn((h, w), |(r, c)| {
            let d2 = (r as f32 - cy).powi(2) + (c as f32 - cx).powi(2);
            (-d2 / 18.0).exp()
        })
    }

    #[test]
    fn test_phase_offset_recovers_translation() {
        let reference = blob(32, 32, 16.0, 16.0);
        let target = blob(32, 32, 13.0, 18.0);
        let offset = phase_offset(&reference, &target).unwrap();
        assert_eq!(offset, PixelOffset { dy: 3, dx: -2 });
    }

    #[test]
    fn test_phase_offset_identical_is_zero() {
        let reference = blob(24, 20, 10.0, 9.0);
        let offset = phase_offset(&reference, &reference).unwrap();
        assert_eq!(offset, PixelOffset::default());
    }

    #[test]
    fn test_phase_offset_size_mismatch() {
        let a = Array2::<f32>::zeros((8, 8));
        let b = Array2::<f32>::zeros((8, 6));
        assert!(phase_offset(&a, &b).is_err());
    }
}
