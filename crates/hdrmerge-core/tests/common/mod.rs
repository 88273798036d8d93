#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use hdrmerge_core::error::{HdrMergeError, Result};
use hdrmerge_core::frame::{
    CreationInterval, DecodedExposure, Exposure, ExposureId, RawParameters,
};
use hdrmerge_core::io::ser::{datetime_to_ticks, SER_HEADER_SIZE};
use hdrmerge_core::io::{ExposureDecoder, OutputWriter};
use hdrmerge_core::pipeline::{LoadStage, ProgressReporter, SaveStage};
use hdrmerge_core::stack::ExposureStack;
use image::GrayImage;
use ndarray::Array2;

pub const FAKE_WIDTH: u32 = 8;
pub const FAKE_HEIGHT: u32 = 6;

/// UTC time on 2024-05-01.
pub fn at(hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, min, sec)
        .single()
        .expect("valid time")
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Scripted behaviour of one input file.
#[derive(Clone, Debug)]
pub struct FakeInput {
    pub params: RawParameters,
    /// Fill level of each frame; the file holds `levels.len()` frames.
    pub levels: Vec<u16>,
    /// Overrides the probed frame count.
    pub probe_frames: Option<usize>,
    pub fail: bool,
    /// Decode "succeeds" but hands back an empty buffer.
    pub empty: bool,
    pub interval: Option<CreationInterval>,
}

#[derive(Default)]
pub struct FakeDecoder {
    inputs: HashMap<PathBuf, FakeInput>,
    pub decoded: Mutex<Vec<(PathBuf, usize)>>,
}

impl FakeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl AsRef<Path>, levels: &[u16]) -> &mut FakeInput {
        let path = path.as_ref().to_path_buf();
        let input = FakeInput {
            params: RawParameters::new(&path, FAKE_WIDTH, FAKE_HEIGHT),
            levels: levels.to_vec(),
            probe_frames: None,
            fail: false,
            empty: false,
            interval: None,
        };
        self.inputs.entry(path).or_insert(input)
    }

    pub fn decode_calls(&self) -> usize {
        self.decoded.lock().expect("lock").len()
    }
}

impl ExposureDecoder for FakeDecoder {
    fn probe_frame_count(&self, path: &Path) -> usize {
        self.inputs
            .get(path)
            .map(|i| i.probe_frames.unwrap_or(i.levels.len()))
            .unwrap_or(0)
    }

    fn decode(&self, path: &Path, frame: usize) -> Result<DecodedExposure> {
        self.decoded
            .lock()
            .expect("lock")
            .push((path.to_path_buf(), frame));
        let input = self
            .inputs
            .get(path)
            .ok_or_else(|| HdrMergeError::InvalidSer(format!("no such input {}", path.display())))?;
        if input.fail {
            return Err(HdrMergeError::InvalidSer("scripted failure".into()));
        }
        let samples = if input.empty {
            Array2::zeros((0, 0))
        } else {
            let level = input.levels.get(frame).copied().unwrap_or(0);
            Array2::from_elem(
                (input.params.raw_height as usize, input.params.raw_width as usize),
                level,
            )
        };
        Ok(DecodedExposure {
            samples,
            params: input.params.clone(),
        })
    }

    fn probe_creation_interval(&self, path: &Path) -> Option<CreationInterval> {
        self.inputs.get(path).and_then(|i| i.interval)
    }
}

// ---------------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------------

pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Stack ordering exposures brightest first by their first sample, logging
/// every call.
pub struct FakeStack {
    entries: Vec<(ExposureId, u16)>,
    dims: (usize, usize),
    mask: Option<Array2<u16>>,
    log: CallLog,
}

impl FakeStack {
    pub fn new() -> (Self, CallLog) {
        let log = CallLog::default();
        let stack = Self {
            entries: Vec::new(),
            dims: (0, 0),
            mask: None,
            log: Arc::clone(&log),
        };
        (stack, log)
    }

    fn record(&self, call: impl Into<String>) {
        self.log.lock().expect("lock").push(call.into());
    }
}

impl ExposureStack for FakeStack {
    fn insert(&mut self, exposure: Exposure) -> usize {
        let level = exposure.samples.first().copied().unwrap_or(0);
        let position = self
            .entries
            .iter()
            .position(|&(_, l)| l < level)
            .unwrap_or(self.entries.len());
        self.entries.insert(position, (exposure.id, level));
        self.dims = exposure.samples.dim();
        self.record(format!("insert {} at {position}", exposure.id.0));
        position
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn id_at(&self, position: usize) -> Option<ExposureId> {
        self.entries.get(position).map(|&(id, _)| id)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.mask = None;
        self.record("clear");
    }

    fn set_flip(&mut self, flip: u8) {
        self.record(format!("flip {flip}"));
    }

    fn calculate_saturation_level(&mut self, params: &RawParameters, use_custom_white: bool) {
        self.record(format!("saturation {} {use_custom_white}", params.white));
    }

    fn align(&mut self) -> Result<()> {
        self.record("align");
        Ok(())
    }

    fn crop(&mut self) {
        self.record("crop");
    }

    fn is_cropped(&self) -> bool {
        false
    }

    fn compute_response_functions(&mut self) {
        self.record("response");
    }

    fn generate_mask(&mut self) {
        self.mask = Some(Array2::zeros(self.dims));
        self.record("mask");
    }

    fn mask(&self) -> Option<&Array2<u16>> {
        self.mask.as_ref()
    }

    fn width(&self) -> usize {
        self.dims.1
    }

    fn height(&self) -> usize {
        self.dims.0
    }

    fn max_exposure(&self) -> f32 {
        0.0
    }

    fn compose(&self, params: &RawParameters, feather_radius: u32) -> Result<Array2<f32>> {
        self.record(format!("compose {feather_radius}"));
        if self.entries.is_empty() {
            return Err(HdrMergeError::EmptyStack);
        }
        Ok(Array2::from_elem(
            (params.height as usize, params.width as usize),
            0.5,
        ))
    }
}

/// Only the stage names, without insertion details.
pub fn stages(log: &CallLog) -> Vec<String> {
    log.lock()
        .expect("lock")
        .iter()
        .filter(|c| !c.starts_with("insert") && *c != "clear")
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Writer and reporter
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeWriter {
    /// (bits per sample, preview size) of every call.
    pub calls: Mutex<Vec<(u8, Option<(u32, u32)>)>>,
}

impl OutputWriter for FakeWriter {
    fn write(
        &self,
        _image: &Array2<f32>,
        _params: &RawParameters,
        bits_per_sample: u8,
        preview: Option<&GrayImage>,
    ) -> Result<Vec<u8>> {
        self.calls
            .lock()
            .expect("lock")
            .push((bits_per_sample, preview.map(|p| p.dimensions())));
        Ok(b"fake container".to_vec())
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<(u8, String)>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<(u8, String)> {
        self.events.lock().expect("lock").clone()
    }
}

impl ProgressReporter for RecordingReporter {
    fn load_progress(&self, percent: u8, stage: &LoadStage) {
        self.events
            .lock()
            .expect("lock")
            .push((percent, stage.to_string()));
    }

    fn save_progress(&self, stage: SaveStage) {
        self.events
            .lock()
            .expect("lock")
            .push((stage.percent(), stage.to_string()));
    }
}

// ---------------------------------------------------------------------------
// SER files
// ---------------------------------------------------------------------------

/// Synthetic 16-bit-container SER recording.
pub struct SerBuilder {
    width: u32,
    height: u32,
    bit_depth: u32,
    color_id: i32,
    observer: String,
    instrument: String,
    telescope: String,
    utc: Option<DateTime<Utc>>,
    frames: Vec<Vec<u16>>,
    timestamps: Vec<DateTime<Utc>>,
}

impl SerBuilder {
    /// 12-bit RGGB recording.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bit_depth: 12,
            color_id: 8,
            observer: String::new(),
            instrument: String::new(),
            telescope: String::new(),
            utc: None,
            frames: Vec::new(),
            timestamps: Vec::new(),
        }
    }

    pub fn color_id(mut self, color_id: i32) -> Self {
        self.color_id = color_id;
        self
    }

    pub fn bit_depth(mut self, bit_depth: u32) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    pub fn observer(mut self, observer: &str) -> Self {
        self.observer = observer.into();
        self
    }

    pub fn instrument(mut self, instrument: &str) -> Self {
        self.instrument = instrument.into();
        self
    }

    pub fn telescope(mut self, telescope: &str) -> Self {
        self.telescope = telescope.into();
        self
    }

    pub fn utc(mut self, time: DateTime<Utc>) -> Self {
        self.utc = Some(time);
        self
    }

    pub fn frame_fn(mut self, f: impl Fn(usize, usize) -> u16) -> Self {
        let (w, h) = (self.width as usize, self.height as usize);
        self.frames
            .push((0..h * w).map(|i| f(i / w, i % w)).collect());
        self
    }

    pub fn timestamp(mut self, time: DateTime<Utc>) -> Self {
        self.timestamps.push(time);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SER_HEADER_SIZE);
        buf.extend_from_slice(b"LUCAM-RECORDER");
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&self.color_id.to_le_bytes());
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&(self.width as i32).to_le_bytes());
        buf.extend_from_slice(&(self.height as i32).to_le_bytes());
        buf.extend_from_slice(&(self.bit_depth as i32).to_le_bytes());
        buf.extend_from_slice(&(self.frames.len() as i32).to_le_bytes());
        for text in [&self.observer, &self.instrument, &self.telescope] {
            let mut field = [0u8; 40];
            let n = text.len().min(40);
            field[..n].copy_from_slice(&text.as_bytes()[..n]);
            buf.extend_from_slice(&field);
        }
        let ticks = self.utc.as_ref().map(datetime_to_ticks).unwrap_or(0);
        buf.extend_from_slice(&ticks.to_le_bytes());
        buf.extend_from_slice(&ticks.to_le_bytes());
        assert_eq!(buf.len(), SER_HEADER_SIZE);

        for frame in &self.frames {
            for &v in frame {
                if self.bit_depth <= 8 {
                    buf.push(v as u8);
                } else {
                    buf.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
        for t in &self.timestamps {
            buf.extend_from_slice(&datetime_to_ticks(t).to_le_bytes());
        }
        buf
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).expect("write SER file");
        path
    }
}

