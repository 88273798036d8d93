use ndarray::parallel::prelude::*;
use ndarray::{Array2, Axis, Zip};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::consts::{PARALLEL_ROW_THRESHOLD, RESPONSE_NOISE_FLOOR, SATURATION_FRACTION};
use crate::error::{HdrMergeError, Result};
use crate::frame::{Exposure, ExposureId, RawParameters};

use super::align::{phase_offset, PixelOffset};
use super::ExposureStack;

struct StackEntry {
    exposure: Exposure,
    /// Mean level above black, used to order the stack.
    brightness: f64,
    /// Translation onto the first exposure, in raw pixels (always even).
    offset: PixelOffset,
    /// Multiplier bringing this exposure to the scale of the darkest one.
    response: f32,
}

impl StackEntry {
    /// Level above black at aligned position `(row, col)` of the full frame.
    fn value_at(&self, row: isize, col: isize) -> Option<f32> {
        let r = row - self.offset.dy;
        let c = col - self.offset.dx;
        if r < 0 || c < 0 {
            return None;
        }
        let (r, c) = (r as usize, c as usize);
        let raw = *self.exposure.samples.get((r, c))?;
        let black = self.exposure.black_at(r, c);
        Some(raw.saturating_sub(black) as f32)
    }
}

/// Rectangle of the full frame covered by every aligned exposure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Region {
    top: usize,
    left: usize,
    height: usize,
    width: usize,
}

/// In-memory exposure stack, brightest exposure first.
pub struct HdrStack {
    entries: Vec<StackEntry>,
    region: Region,
    cropped: bool,
    flip: u8,
    /// Level above black from which a sample counts as saturated.
    saturation: f32,
    /// Usable range above black of the sensor.
    range: f32,
    mask: Option<Array2<u16>>,
}

impl Default for HdrStack {
    fn default() -> Self {
        Self::new()
    }
}

impl HdrStack {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            region: Region {
                top: 0,
                left: 0,
                height: 0,
                width: 0,
            },
            cropped: false,
            flip: 0,
            saturation: f32::MAX,
            range: u16::MAX as f32,
            mask: None,
        }
    }

    pub fn flip(&self) -> u8 {
        self.flip
    }

    pub fn saturation_level(&self) -> f32 {
        self.saturation
    }

    /// Response multiplier of the exposure at `position`.
    pub fn response(&self, position: usize) -> Option<f32> {
        self.entries.get(position).map(|e| e.response)
    }

    /// Alignment offset of the exposure at `position`, in raw pixels.
    pub fn offset(&self, position: usize) -> Option<PixelOffset> {
        self.entries.get(position).map(|e| e.offset)
    }

    fn is_saturated(&self, v: f32) -> bool {
        v >= self.saturation
    }

    /// Half-resolution proxy of one exposure for alignment: 2x2 cell sums,
    /// clipped at the saturation level and scaled by the response.
    fn proxy(&self, entry: &StackEntry) -> Array2<f32> {
        let samples = &entry.exposure.samples;
        let (h, w) = (samples.nrows() / 2, samples.ncols() / 2);
        let sat = self.saturation.min(self.range);
        Array2::from_shape_fn((h, w), |(r, c)| {
            let mut sum = 0.0;
            for (dr, dc) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                let (rr, cc) = (r * 2 + dr, c * 2 + dc);
                let black = entry.exposure.black_at(dr, dc);
                sum += (samples[[rr, cc]].saturating_sub(black) as f32).min(sat);
            }
            sum * entry.response / (4.0 * sat.max(1.0))
        })
    }

    fn full_region(&self) -> Region {
        let (height, width) = self
            .entries
            .first()
            .map(|e| e.exposure.samples.dim())
            .unwrap_or((0, 0));
        Region {
            top: 0,
            left: 0,
            height,
            width,
        }
    }

    fn region_value(&self, entry: &StackEntry, row: usize, col: usize) -> Option<f32> {
        entry.value_at(
            (row + self.region.top) as isize,
            (col + self.region.left) as isize,
        )
    }

    /// Least-squares ratio between a brighter and a darker exposure over the
    /// pixels where both are well exposed.
    fn fit_ratio(&self, brighter: &StackEntry, darker: &StackEntry) -> Option<f32> {
        let floor = self.range * RESPONSE_NOISE_FLOOR;
        let (h, w) = (self.region.height, self.region.width);
        let (sab, sbb) = (0..h)
            .into_par_iter()
            .map(|row| {
                let mut sab = 0.0f64;
                let mut sbb = 0.0f64;
                for col in 0..w {
                    let (Some(a), Some(b)) = (
                        self.region_value(brighter, row, col),
                        self.region_value(darker, row, col),
                    ) else {
                        continue;
                    };
                    if self.is_saturated(a) || b < floor {
                        continue;
                    }
                    sab += a as f64 * b as f64;
                    sbb += b as f64 * b as f64;
                }
                (sab, sbb)
            })
            .reduce(|| (0.0, 0.0), |x, y| (x.0 + y.0, x.1 + y.1));

        if sbb > 0.0 {
            Some((sab / sbb) as f32)
        } else {
            None
        }
    }

    /// Value of one exposure on the darkest exposure's scale, or `None` when
    /// it is outside the frame or saturated.
    fn usable_value(&self, entry: &StackEntry, row: usize, col: usize) -> Option<f32> {
        self.region_value(entry, row, col)
            .filter(|&v| !self.is_saturated(v))
            .map(|v| v / entry.response)
    }

    fn blurred_mask(&self, mask: &Array2<u16>, radius: u32) -> Array2<f32> {
        let m = mask.mapv(|v| v as f32);
        if radius == 0 {
            return m;
        }
        let rows = box_blur_rows(&m, radius as usize);
        box_blur_rows(&rows.reversed_axes().as_standard_layout().to_owned(), radius as usize)
            .reversed_axes()
    }
}

impl ExposureStack for HdrStack {
    fn insert(&mut self, exposure: Exposure) -> usize {
        let brightness = mean_level(&exposure);
        let position = self
            .entries
            .iter()
            .position(|e| e.brightness < brightness)
            .unwrap_or(self.entries.len());
        debug!(id = exposure.id.0, brightness, position, "Inserted exposure");
        self.entries.insert(
            position,
            StackEntry {
                exposure,
                brightness,
                offset: PixelOffset::default(),
                response: 1.0,
            },
        );
        if !self.cropped {
            self.region = self.full_region();
        }
        self.mask = None;
        position
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn id_at(&self, position: usize) -> Option<ExposureId> {
        self.entries.get(position).map(|e| e.exposure.id)
    }

    fn clear(&mut self) {
        *self = Self::new();
    }

    fn set_flip(&mut self, flip: u8) {
        self.flip = flip;
    }

    fn calculate_saturation_level(&mut self, params: &RawParameters, use_custom_white: bool) {
        let range = params.white.saturating_sub(params.max_black() as u32) as f32;
        self.range = range.max(1.0);
        self.saturation = if use_custom_white {
            self.range
        } else {
            self.range * SATURATION_FRACTION
        };
        debug!(saturation = self.saturation, "Saturation level");
    }

    fn align(&mut self) -> Result<()> {
        if self.entries.len() < 2 {
            return Ok(());
        }
        let proxies: Vec<Array2<f32>> = self.entries.par_iter().map(|e| self.proxy(e)).collect();
        let relative: Vec<PixelOffset> = proxies
            .par_windows(2)
            .map(|pair| phase_offset(&pair[0], &pair[1]))
            .collect::<Result<_>>()?;

        let mut acc = PixelOffset::default();
        for (entry, rel) in self.entries.iter_mut().skip(1).zip(relative) {
            // Proxy pixels are 2x2 cells, so raw offsets stay even.
            acc.dy += rel.dy * 2;
            acc.dx += rel.dx * 2;
            entry.offset = acc;
        }
        info!(
            offsets = ?self.entries.iter().map(|e| (e.offset.dy, e.offset.dx)).collect::<Vec<_>>(),
            "Aligned exposures"
        );
        Ok(())
    }

    fn crop(&mut self) {
        let full = self.full_region();
        let (mut top, mut bottom) = (0isize, full.height as isize);
        let (mut left, mut right) = (0isize, full.width as isize);
        for e in &self.entries {
            top = top.max(e.offset.dy);
            bottom = bottom.min(full.height as isize + e.offset.dy);
            left = left.max(e.offset.dx);
            right = right.min(full.width as isize + e.offset.dx);
        }
        let height = ((bottom - top).max(0) as usize) & !1;
        let width = ((right - left).max(0) as usize) & !1;
        self.region = Region {
            top: top as usize,
            left: left as usize,
            height,
            width,
        };
        self.cropped = true;
        self.mask = None;
        info!(top, left, width, height, "Cropped to common area");
    }

    fn is_cropped(&self) -> bool {
        self.cropped
    }

    fn compute_response_functions(&mut self) {
        let n = self.entries.len();
        if n == 0 {
            return;
        }
        // Walk from the darkest exposure towards the brightest.
        self.entries[n - 1].response = 1.0;
        for i in (0..n - 1).rev() {
            let ratio = self
                .fit_ratio(&self.entries[i], &self.entries[i + 1])
                .unwrap_or_else(|| {
                    let b = self.entries[i + 1].brightness;
                    if b > 0.0 {
                        (self.entries[i].brightness / b) as f32
                    } else {
                        1.0
                    }
                })
                .max(1.0);
            self.entries[i].response = self.entries[i + 1].response * ratio;
        }
        debug!(
            responses = ?self.entries.iter().map(|e| e.response).collect::<Vec<_>>(),
            "Response functions"
        );
    }

    fn generate_mask(&mut self) {
        let n = self.entries.len();
        if n == 0 {
            self.mask = None;
            return;
        }
        // Positions past u16::MAX are clamped; no real bracket gets near it.
        let index = |p: usize| u16::try_from(p).unwrap_or(u16::MAX);
        let last = index(n - 1);
        let mut mask = Array2::<u16>::zeros((self.region.height, self.region.width));
        let pick = |(row, col): (usize, usize), m: &mut u16| {
            *m = self
                .entries
                .iter()
                .position(|e| {
                    self.region_value(e, row, col)
                        .is_some_and(|v| !self.is_saturated(v))
                })
                .map(index)
                .unwrap_or(last);
        };
        if self.region.height >= PARALLEL_ROW_THRESHOLD {
            Zip::indexed(&mut mask).par_for_each(pick);
        } else {
            Zip::indexed(&mut mask).for_each(pick);
        }
        self.mask = Some(mask);
    }

    fn mask(&self) -> Option<&Array2<u16>> {
        self.mask.as_ref()
    }

    fn width(&self) -> usize {
        self.region.width
    }

    fn height(&self) -> usize {
        self.region.height
    }

    fn max_exposure(&self) -> f32 {
        self.entries
            .first()
            .map(|e| e.response.max(1.0).log2())
            .unwrap_or(0.0)
    }

    fn compose(&self, params: &RawParameters, feather_radius: u32) -> Result<Array2<f32>> {
        if self.entries.is_empty() {
            return Err(HdrMergeError::EmptyStack);
        }
        let mask = self
            .mask
            .as_ref()
            .ok_or_else(|| HdrMergeError::Stack("mask has not been generated".into()))?;
        let n = self.entries.len();
        let blurred = self.blurred_mask(mask, feather_radius);
        let range = params.white.saturating_sub(params.max_black() as u32).max(1) as f32;

        let mut out = Array2::<f32>::zeros(mask.dim());
        Zip::indexed(&mut out)
            .and(&blurred)
            .par_for_each(|(row, col), o, &m| {
                let lo = (m.floor().max(0.0) as usize).min(n - 1);
                let hi = (lo + 1).min(n - 1);
                let frac = m - lo as f32;
                let v_lo = self.usable_value(&self.entries[lo], row, col);
                let v_hi = self.usable_value(&self.entries[hi], row, col);
                let v = match (v_lo, v_hi) {
                    (Some(a), Some(b)) => a * (1.0 - frac) + b * frac,
                    (Some(a), None) => a,
                    (None, Some(b)) => b,
                    (None, None) => self
                        .region_value(&self.entries[n - 1], row, col)
                        .map(|v| v / self.entries[n - 1].response)
                        .unwrap_or(0.0),
                };
                *o = v / range;
            });
        info!(
            width = out.ncols(),
            height = out.nrows(),
            feather_radius,
            "Composed exposures"
        );
        Ok(out)
    }
}

fn mean_level(exposure: &Exposure) -> f64 {
    let samples = &exposure.samples;
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples
        .axis_iter(Axis(0))
        .into_par_iter()
        .enumerate()
        .map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(|(c, &v)| v.saturating_sub(exposure.black_at(r, c)) as f64)
                .sum::<f64>()
        })
        .sum();
    sum / samples.len() as f64
}

/// Running-mean box blur along each row, clamped at the borders.
fn box_blur_rows(data: &Array2<f32>, radius: usize) -> Array2<f32> {
    let mut out = Array2::<f32>::zeros(data.dim());
    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(data.axis_iter(Axis(0)))
        .for_each(|(mut dst, src)| {
            let w = src.len();
            if w == 0 {
                return;
            }
            let mut prefix = Vec::with_capacity(w + 1);
            prefix.push(0.0f32);
            for &v in src.iter() {
                let last = prefix[prefix.len() - 1];
                prefix.push(last + v);
            }
            for (c, d) in dst.iter_mut().enumerate() {
                let a = c.saturating_sub(radius);
                let b = (c + radius + 1).min(w);
                *d = (prefix[b] - prefix[a]) / (b - a) as f32;
            }
        });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(id: usize, value: u16) -> Exposure {
        Exposure {
            id: ExposureId(id),
            samples: Array2::from_elem((8, 8), value),
            black: [0; 4],
        }
    }

    #[test]
    fn test_box_blur_preserves_constant() {
        let data = Array2::from_elem((4, 9), 2.0f32);
        let out = box_blur_rows(&data, 3);
        assert!(out.iter().all(|&v| (v - 2.0).abs() < 1e-6));
    }

    #[test]
    fn test_insert_orders_brightest_first() {
        let mut stack = HdrStack::new();
        assert_eq!(stack.insert(flat(0, 100)), 0);
        assert_eq!(stack.insert(flat(1, 400)), 0);
        assert_eq!(stack.insert(flat(2, 200)), 1);
        assert_eq!(stack.ids(), vec![ExposureId(1), ExposureId(2), ExposureId(0)]);
    }

    #[test]
    fn test_mask_prefers_brightest_unsaturated() {
        let mut stack = HdrStack::new();
        let mut bright = flat(0, 1000);
        bright.samples[[0, 0]] = 4095;
        stack.insert(bright);
        stack.insert(flat(1, 250));
        let mut params = RawParameters::new("a.ser", 8, 8);
        params.white = 4095;
        stack.calculate_saturation_level(&params, false);
        stack.compute_response_functions();
        stack.generate_mask();
        let mask = stack.mask().unwrap();
        assert_eq!(mask[[0, 0]], 1);
        assert_eq!(mask[[4, 4]], 0);
        assert!((stack.response(0).unwrap() - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_mask_indexes_past_255() {
        let mut stack = HdrStack::new();
        for id in 0..299 {
            stack.insert(flat(id, 4095));
        }
        assert_eq!(stack.insert(flat(299, 100)), 299);
        let mut params = RawParameters::new("a.ser", 8, 8);
        params.white = 4095;
        stack.calculate_saturation_level(&params, false);
        stack.compute_response_functions();
        stack.generate_mask();

        let mask = stack.mask().unwrap();
        assert!(mask.iter().all(|&m| m == 299));
        let out = stack.compose(&params, 2).unwrap();
        assert!(out.iter().all(|&v| (v - 100.0 / 4095.0).abs() < 1e-6));
    }
}
