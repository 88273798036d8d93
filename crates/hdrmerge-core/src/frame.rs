use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Colour filter array layout of the sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CfaLayout {
    Rggb,
    Grbg,
    Gbrg,
    Bggr,
    XTrans,
}

impl CfaLayout {
    /// Only 2x2 mosaics can be shifted by even offsets without changing the
    /// colour of any photosite.
    pub fn can_align(&self) -> bool {
        !matches!(self, Self::XTrans)
    }
}

impl fmt::Display for CfaLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rggb => write!(f, "RGGB"),
            Self::Grbg => write!(f, "GRBG"),
            Self::Gbrg => write!(f, "GBRG"),
            Self::Bggr => write!(f, "BGGR"),
            Self::XTrans => write!(f, "X-Trans"),
        }
    }
}

/// Time span during which the sensor was exposed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CreationInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CreationInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Interval of a capture that finished at `end` after `shutter_secs`.
    pub fn ending_at(end: DateTime<Utc>, shutter_secs: f64) -> Self {
        let micros = (shutter_secs.max(0.0) * 1_000_000.0).round() as i64;
        Self {
            start: end - Duration::microseconds(micros),
            end,
        }
    }

    /// Seconds between the end of this interval and the start of `next`.
    /// Negative when the two overlap.
    pub fn gap_to(&self, next: &CreationInterval) -> f64 {
        (next.start - self.end).num_microseconds().unwrap_or(i64::MAX) as f64 / 1_000_000.0
    }
}

/// Geometry, calibration and timing of one decoded frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawParameters {
    pub file_name: PathBuf,
    pub raw_width: u32,
    pub raw_height: u32,
    pub top_margin: u32,
    pub left_margin: u32,
    /// Active area, updated to the composed size before writing.
    pub width: u32,
    pub height: u32,
    pub layout: CfaLayout,
    /// Black level per CFA cell, indexed by `(row & 1) * 2 + (col & 1)`.
    pub black: [u16; 4],
    /// Saturation point of the sensor data.
    pub white: u32,
    pub cam_mul: [f32; 4],
    pub flip: u8,
    pub capture_end: Option<DateTime<Utc>>,
    pub shutter_secs: f64,
}

impl RawParameters {
    /// Descriptor with an RGGB layout and neutral calibration, to be filled
    /// in by a decoder.
    pub fn new(file_name: impl Into<PathBuf>, raw_width: u32, raw_height: u32) -> Self {
        Self {
            file_name: file_name.into(),
            raw_width,
            raw_height,
            top_margin: 0,
            left_margin: 0,
            width: raw_width,
            height: raw_height,
            layout: CfaLayout::Rggb,
            black: [0; 4],
            white: u16::MAX as u32,
            cam_mul: [1.0; 4],
            flip: 0,
            capture_end: None,
            shutter_secs: 0.0,
        }
    }

    /// Frames can only be merged when they share geometry and sensor layout.
    pub fn is_same_format(&self, other: &RawParameters) -> bool {
        self.raw_width == other.raw_width
            && self.raw_height == other.raw_height
            && self.width == other.width
            && self.height == other.height
            && self.top_margin == other.top_margin
            && self.left_margin == other.left_margin
            && self.layout == other.layout
    }

    pub fn can_align(&self) -> bool {
        self.layout.can_align()
    }

    pub fn max_black(&self) -> u16 {
        self.black.iter().copied().max().unwrap_or(0)
    }

    pub fn creation_interval(&self) -> Option<CreationInterval> {
        self.capture_end
            .map(|end| CreationInterval::ending_at(end, self.shutter_secs))
    }

    pub fn file_name(&self) -> &Path {
        &self.file_name
    }
}

/// Stable identifier of a loaded exposure. Identifiers are handed out in
/// load order and never reused within one batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExposureId(pub usize);

/// Output of the decoding backend for one frame.
#[derive(Clone, Debug)]
pub struct DecodedExposure {
    /// Raw sensor samples, shape = (raw_height, raw_width).
    pub samples: Array2<u16>,
    pub params: RawParameters,
}

impl DecodedExposure {
    /// A decoder may hand back an empty buffer instead of an error.
    pub fn is_usable(&self) -> bool {
        !self.samples.is_empty()
            && self.samples.dim() == (self.params.raw_height as usize, self.params.raw_width as usize)
    }
}

/// One exposure as handed to the stack.
#[derive(Clone, Debug)]
pub struct Exposure {
    pub id: ExposureId,
    pub samples: Array2<u16>,
    /// Black level per CFA cell, copied from the descriptor.
    pub black: [u16; 4],
}

impl Exposure {
    pub fn width(&self) -> usize {
        self.samples.ncols()
    }

    pub fn height(&self) -> usize {
        self.samples.nrows()
    }

    /// Black level of the CFA cell holding `(row, col)`.
    pub fn black_at(&self, row: usize, col: usize) -> u16 {
        self.black[((row & 1) << 1) | (col & 1)]
    }
}
