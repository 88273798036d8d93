use std::fs::File;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{DateTime, Utc};
use memmap2::Mmap;
use ndarray::Array2;
use tracing::debug;

use crate::consts::DOTNET_EPOCH_TICKS;
use crate::error::{HdrMergeError, Result};
use crate::frame::{CfaLayout, CreationInterval, DecodedExposure, RawParameters};

use super::ExposureDecoder;

pub const SER_HEADER_SIZE: usize = 178;
pub const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";

/// SER file header (178 bytes).
#[derive(Clone, Debug)]
pub struct SerHeader {
    pub color_id: i32,
    pub little_endian: bool,
    pub width: u32,
    pub height: u32,
    pub pixel_depth: u32,
    pub frame_count: u32,
    pub observer: String,
    pub instrument: String,
    pub telescope: String,
    pub date_time: u64,
    pub date_time_utc: u64,
}

impl SerHeader {
    /// Bytes per sample (1 for 8-bit, 2 for 9-16 bit).
    pub fn bytes_per_sample(&self) -> usize {
        if self.pixel_depth <= 8 { 1 } else { 2 }
    }

    /// Number of planes per pixel (1 for mono/bayer, 3 for RGB/BGR).
    pub fn planes_per_pixel(&self) -> usize {
        match self.color_id {
            100 | 101 => 3,
            _ => 1,
        }
    }

    /// Total bytes per frame, `None` on overflow.
    pub fn frame_byte_size(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.bytes_per_sample() * self.planes_per_pixel())
    }

    /// Mosaic layout, `None` for mono and interleaved colour data.
    pub fn cfa_layout(&self) -> Option<CfaLayout> {
        match self.color_id {
            8 => Some(CfaLayout::Rggb),
            9 => Some(CfaLayout::Grbg),
            10 => Some(CfaLayout::Gbrg),
            11 => Some(CfaLayout::Bggr),
            _ => None,
        }
    }

    /// Largest sample value the recording can hold.
    pub fn white_level(&self) -> u32 {
        let depth = self.pixel_depth.clamp(1, 16);
        (1u32 << depth) - 1
    }

    pub fn capture_time(&self) -> Option<DateTime<Utc>> {
        ticks_to_datetime(self.date_time_utc)
    }
}

/// Memory-mapped SER file reader.
pub struct SerReader {
    mmap: Mmap,
    pub header: SerHeader,
}

impl SerReader {
    /// Open a SER file and parse its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SER_HEADER_SIZE {
            return Err(HdrMergeError::InvalidSer(
                "File too small for SER header".into(),
            ));
        }

        if &mmap[0..14] != SER_MAGIC {
            return Err(HdrMergeError::InvalidSer(
                "Missing LUCAM-RECORDER magic".into(),
            ));
        }

        let header = parse_header(&mmap[..SER_HEADER_SIZE])?;
        let frame_bytes = header
            .frame_byte_size()
            .ok_or_else(|| HdrMergeError::InvalidSer("Frame size overflow".into()))?;

        let expected_data_size = SER_HEADER_SIZE + frame_bytes * header.frame_count as usize;
        if mmap.len() < expected_data_size {
            return Err(HdrMergeError::InvalidSer(format!(
                "File truncated: expected at least {} bytes, got {}",
                expected_data_size,
                mmap.len()
            )));
        }

        Ok(Self { mmap, header })
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count as usize
    }

    fn frame_bytes(&self) -> usize {
        // Validated in `open`.
        self.header.frame_byte_size().unwrap_or(0)
    }

    /// Get the raw bytes for a single frame (zero-copy from mmap).
    pub fn frame_raw(&self, index: usize) -> Result<&[u8]> {
        let count = self.frame_count();
        if index >= count {
            return Err(HdrMergeError::FrameIndexOutOfRange {
                index,
                total: count,
            });
        }
        let offset = SER_HEADER_SIZE + index * self.frame_bytes();
        let end = offset + self.frame_bytes();
        Ok(&self.mmap[offset..end])
    }

    /// Read a single frame as raw sensor samples.
    pub fn read_mosaic(&self, index: usize) -> Result<Array2<u16>> {
        if self.header.planes_per_pixel() != 1 {
            return Err(HdrMergeError::UnsupportedLayout(
                "interleaved colour data is not a sensor mosaic".into(),
            ));
        }
        let raw = self.frame_raw(index)?;
        Ok(decode_plane(
            raw,
            self.header.height as usize,
            self.header.width as usize,
            self.header.bytes_per_sample(),
            self.header.little_endian,
        ))
    }

    /// Per-frame timestamp from the optional trailer.
    pub fn frame_time(&self, index: usize) -> Option<DateTime<Utc>> {
        let trailer_offset = SER_HEADER_SIZE + self.frame_bytes() * self.frame_count();
        let ts_offset = trailer_offset + index * 8;
        if ts_offset + 8 <= self.mmap.len() {
            let bytes = &self.mmap[ts_offset..ts_offset + 8];
            ticks_to_datetime(u64::from_le_bytes(bytes.try_into().ok()?))
        } else {
            None
        }
    }

    /// Descriptor for one frame of this recording.
    pub fn raw_parameters(&self, path: &Path, index: usize) -> Result<RawParameters> {
        let layout = self.header.cfa_layout().ok_or_else(|| {
            HdrMergeError::UnsupportedLayout(format!("SER colour id {}", self.header.color_id))
        })?;
        let mut params = RawParameters::new(path, self.header.width, self.header.height);
        params.layout = layout;
        params.white = self.header.white_level();
        params.capture_end = self.frame_time(index).or_else(|| self.header.capture_time());
        Ok(params)
    }
}

/// Decoding backend over SER recordings. Every frame of a recording is one
/// exposure of the bracket.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerDecoder;

impl ExposureDecoder for SerDecoder {
    fn probe_frame_count(&self, path: &Path) -> usize {
        match SerReader::open(path) {
            Ok(reader) => {
                debug!(file = %path.display(), frames = reader.frame_count(), "Probed frame count");
                reader.frame_count()
            }
            Err(e) => {
                debug!(file = %path.display(), error = %e, "Cannot probe frame count");
                0
            }
        }
    }

    fn decode(&self, path: &Path, frame: usize) -> Result<DecodedExposure> {
        let reader = SerReader::open(path)?;
        let params = reader.raw_parameters(path, frame)?;
        let samples = reader.read_mosaic(frame)?;
        Ok(DecodedExposure { samples, params })
    }

    fn probe_creation_interval(&self, path: &Path) -> Option<CreationInterval> {
        let reader = SerReader::open(path).ok()?;
        let end = reader.frame_time(0).or_else(|| reader.header.capture_time())?;
        Some(CreationInterval::ending_at(end, 0.0))
    }
}

fn parse_header(buf: &[u8]) -> Result<SerHeader> {
    let mut cursor = std::io::Cursor::new(&buf[14..]); // skip magic

    let _lu_id = cursor.read_i32::<LittleEndian>()?;
    let color_id = cursor.read_i32::<LittleEndian>()?;
    let le_flag = cursor.read_i32::<LittleEndian>()?;
    let width = cursor.read_i32::<LittleEndian>()? as u32;
    let height = cursor.read_i32::<LittleEndian>()? as u32;
    let pixel_depth = cursor.read_i32::<LittleEndian>()? as u32;
    let frame_count = cursor.read_i32::<LittleEndian>()? as u32;

    let observer = read_fixed_string(&buf[42..82]);
    let instrument = read_fixed_string(&buf[82..122]);
    let telescope = read_fixed_string(&buf[122..162]);

    let mut cursor = std::io::Cursor::new(&buf[162..]);
    let date_time = cursor.read_u64::<LittleEndian>()?;
    let date_time_utc = cursor.read_u64::<LittleEndian>()?;

    if width == 0 || height == 0 {
        return Err(HdrMergeError::InvalidDimensions { width, height });
    }

    // Most writers put 0 here for little-endian data; treat only 1 as big-endian.
    let little_endian = le_flag != 1;

    Ok(SerHeader {
        color_id,
        little_endian,
        width,
        height,
        pixel_depth,
        frame_count,
        observer,
        instrument,
        telescope,
        date_time,
        date_time_utc,
    })
}

fn read_fixed_string(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

/// Convert .NET ticks (100 ns since 0001-01-01) to a UTC time.
pub fn ticks_to_datetime(ticks: u64) -> Option<DateTime<Utc>> {
    let since_epoch = ticks.checked_sub(DOTNET_EPOCH_TICKS)?;
    let secs = (since_epoch / 10_000_000) as i64;
    let nanos = ((since_epoch % 10_000_000) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

/// Inverse of [`ticks_to_datetime`].
pub fn datetime_to_ticks(time: &DateTime<Utc>) -> u64 {
    let secs = time.timestamp().max(0) as u64;
    DOTNET_EPOCH_TICKS + secs * 10_000_000 + u64::from(time.timestamp_subsec_nanos() / 100)
}

fn decode_plane(
    raw: &[u8],
    height: usize,
    width: usize,
    bytes_per_sample: usize,
    little_endian: bool,
) -> Array2<u16> {
    Array2::from_shape_fn((height, width), |(row, col)| {
        let idx = (row * width + col) * bytes_per_sample;
        if bytes_per_sample == 1 {
            raw[idx] as u16
        } else {
            let pair = [raw[idx], raw[idx + 1]];
            if little_endian {
                u16::from_le_bytes(pair)
            } else {
                u16::from_be_bytes(pair)
            }
        }
    })
}
