use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::consts::{MAX_FRAMES_PER_FILE, PARALLEL_DECODE_THRESHOLD};
use crate::error::{HdrMergeError, LoadError, Result};
use crate::frame::{DecodedExposure, Exposure, ExposureId, RawParameters};
use crate::io::{render_preview, save_mask, ExposureDecoder, OutputWriter};
use crate::metadata::{transfer, FusionReport, MetadataBackend, DEFAULT_RULES};
use crate::naming::{default_pattern, FileNameIndex, OutputPathResolver};
use crate::stack::{ExposureStack, HdrStack};

use super::config::{LoadOptions, SaveOptions};
use super::types::{LoadStage, LoadSummary, ProgressReporter, SaveStage};

/// Outcome of a successful [`ImageIo::save`].
#[derive(Debug)]
pub struct SaveSummary {
    pub output: PathBuf,
    pub width: usize,
    pub height: usize,
    /// Metadata transplant; a failed final write is reported here.
    pub metadata: FusionReport,
    /// Mask file, when one was requested and written.
    pub mask: Option<PathBuf>,
}

/// Owns one exposure stack and the descriptors of its exposures.
///
/// Descriptors live in an arena indexed by [`ExposureId`] (load order); the
/// stack holds only identifiers, so stack order is read back from the stack
/// instead of being mirrored by hand.
pub struct ImageIo {
    stack: Box<dyn ExposureStack>,
    descriptors: Vec<RawParameters>,
}

impl Default for ImageIo {
    fn default() -> Self {
        Self::new(Box::new(HdrStack::new()))
    }
}

impl ImageIo {
    pub fn new(stack: Box<dyn ExposureStack>) -> Self {
        Self {
            stack,
            descriptors: Vec::new(),
        }
    }

    pub fn num_images(&self) -> usize {
        self.stack.len()
    }

    pub fn stack(&self) -> &dyn ExposureStack {
        self.stack.as_ref()
    }

    pub fn descriptor(&self, id: ExposureId) -> Option<&RawParameters> {
        self.descriptors.get(id.0)
    }

    /// Descriptor of the exposure at stack position `position`.
    pub fn descriptor_at(&self, position: usize) -> Option<&RawParameters> {
        self.stack.id_at(position).and_then(|id| self.descriptor(id))
    }

    /// Descriptors in stack order.
    pub fn descriptors(&self) -> Vec<&RawParameters> {
        self.stack
            .ids()
            .into_iter()
            .filter_map(|id| self.descriptor(id))
            .collect()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
        self.descriptors.clear();
    }

    /// Load a batch of exposures and prepare the stack for composition.
    ///
    /// A single input file may hold up to [`MAX_FRAMES_PER_FILE`] frames,
    /// which are loaded as separate exposures; a frame count outside that
    /// range loads nothing and succeeds with zero images. Any failure
    /// discards the whole batch.
    pub fn load(
        &mut self,
        options: &LoadOptions,
        decoder: &dyn ExposureDecoder,
        reporter: &dyn ProgressReporter,
    ) -> std::result::Result<LoadSummary, LoadError> {
        self.clear();

        let jobs: Vec<(&Path, usize)> = match options.file_names.as_slice() {
            [single] => {
                let frames = decoder.probe_frame_count(single);
                if !(1..=MAX_FRAMES_PER_FILE).contains(&frames) {
                    warn!(file = %single.display(), frames, "No usable frames");
                    return Ok(LoadSummary {
                        images: 0,
                        aligned: false,
                        cropped: false,
                    });
                }
                (0..frames).map(|frame| (single.as_path(), frame)).collect()
            }
            files => files.iter().map(|f| (f.as_path(), 0)).collect(),
        };

        let step = 100 / (jobs.len() + 1);
        let percent = |done: usize| (done * step).min(100) as u8;

        // Decoding may run concurrently; insertion below stays in input order.
        let mut pre_decoded = if jobs.len() >= PARALLEL_DECODE_THRESHOLD {
            debug!(inputs = jobs.len(), "Decoding in parallel");
            jobs.par_iter()
                .map(|&(path, frame)| decoder.decode(path, frame))
                .collect::<Vec<_>>()
                .into_iter()
        } else {
            Vec::new().into_iter()
        };

        for (index, &(path, frame)) in jobs.iter().enumerate() {
            reporter.load_progress(percent(index), &LoadStage::Loading(path.to_path_buf()));
            let decoded = pre_decoded
                .next()
                .unwrap_or_else(|| decoder.decode(path, frame));
            if let Err(e) = self.push(index, path, decoded) {
                self.clear();
                return Err(e);
            }
        }

        reporter.load_progress(percent(jobs.len()), &LoadStage::ProcessingStack);
        let summary = self.process_stack(options);
        reporter.load_progress(100, &LoadStage::Done);
        Ok(summary)
    }

    fn push(
        &mut self,
        index: usize,
        path: &Path,
        decoded: Result<DecodedExposure>,
    ) -> std::result::Result<(), LoadError> {
        let decoded = match decoded {
            Ok(d) if d.is_usable() => d,
            Ok(_) => {
                warn!(index, file = %path.display(), "Decoder returned no usable buffer");
                return Err(LoadError::DecodeFailed { index });
            }
            Err(e) => {
                warn!(index, file = %path.display(), error = %e, "Decode failed");
                return Err(LoadError::DecodeFailed { index });
            }
        };

        if let Some(first) = self.descriptors.first() {
            if !first.is_same_format(&decoded.params) {
                warn!(index, file = %path.display(), "Format differs from the first exposure");
                return Err(LoadError::FormatMismatch { index });
            }
        }

        let DecodedExposure { samples, params } = decoded;
        let id = ExposureId(self.descriptors.len());
        let exposure = Exposure {
            id,
            samples,
            black: params.black,
        };
        self.descriptors.push(params);
        let position = self.stack.insert(exposure);
        debug!(index, position, file = %path.display(), "Inserted exposure");
        Ok(())
    }

    fn process_stack(&mut self, options: &LoadOptions) -> LoadSummary {
        let images = self.stack.len();
        let mut summary = LoadSummary {
            images,
            aligned: false,
            cropped: false,
        };
        if images == 0 {
            return summary;
        }

        if options.use_custom_wl {
            for params in &mut self.descriptors {
                params.white = params.white.min(options.custom_wl);
            }
        }

        let Some(reference) = self.descriptor_at(0).cloned() else {
            return summary;
        };
        self.stack.set_flip(reference.flip);
        self.stack
            .calculate_saturation_level(&reference, options.use_custom_wl);

        if options.align {
            if !reference.can_align() {
                info!(layout = %reference.layout, "Layout cannot be aligned, skipping alignment");
            } else {
                match self.stack.align() {
                    Ok(()) => {
                        summary.aligned = true;
                        if options.crop {
                            self.stack.crop();
                            summary.cropped = self.stack.is_cropped();
                        }
                    }
                    Err(e) => warn!(error = %e, "Alignment failed, continuing unaligned"),
                }
            }
        }

        self.stack.compute_response_functions();
        self.stack.generate_mask();
        info!(
            images,
            width = self.stack.width(),
            height = self.stack.height(),
            aligned = summary.aligned,
            cropped = summary.cropped,
            "Stack ready"
        );
        summary
    }

    /// Compose the stack, write it to `options.file_name` with metadata
    /// taken from the last exposure's source, and optionally save the mask.
    pub fn save(
        &self,
        options: &SaveOptions,
        writer: &dyn OutputWriter,
        metadata: &dyn MetadataBackend,
        reporter: &dyn ProgressReporter,
    ) -> Result<SaveSummary> {
        let last = self
            .num_images()
            .checked_sub(1)
            .and_then(|p| self.descriptor_at(p))
            .ok_or(HdrMergeError::EmptyStack)?;
        let mut params = last.clone();
        let (width, height) = (self.stack.width(), self.stack.height());
        params.width = width as u32;
        params.height = height as u32;

        reporter.save_progress(SaveStage::RenderingImage);
        let image = self.stack.compose(&params, options.feather_radius)?;

        reporter.save_progress(SaveStage::RenderingPreview);
        let preview = render_preview(&image, options.preview_size, self.stack.max_exposure());

        reporter.save_progress(SaveStage::WritingOutput);
        let bytes = writer.write(&image, &params, options.bps, preview.as_ref())?;
        let output = PathBuf::from(&options.file_name);
        let report = transfer(metadata, &DEFAULT_RULES, params.file_name(), &bytes, &output)?;

        let mask = if options.save_mask {
            self.write_mask(options)
        } else {
            None
        };

        reporter.save_progress(SaveStage::Done);
        Ok(SaveSummary {
            output,
            width,
            height,
            metadata: report,
            mask,
        })
    }

    fn write_mask(&self, options: &SaveOptions) -> Option<PathBuf> {
        let mask = self.stack.mask()?;
        let path = PathBuf::from(self.replace_arguments(&options.mask_file_name, &options.file_name));
        match save_mask(mask, self.num_images(), &path) {
            Ok(()) => {
                info!(file = %path.display(), "Saved mask");
                Some(path)
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Cannot save mask");
                None
            }
        }
    }

    fn file_name_index(&self) -> FileNameIndex {
        FileNameIndex::new(self.descriptors.iter().map(|d| d.file_name()))
    }

    /// Expand the tokens of `pattern` against the loaded input names.
    pub fn replace_arguments(&self, pattern: &str, output_file_name: &str) -> String {
        OutputPathResolver::new(self.file_name_index()).resolve(pattern, output_file_name)
    }

    /// Output path used when no pattern is given.
    pub fn build_output_file_name(&self) -> String {
        self.replace_arguments(default_pattern(self.num_images()), "")
    }

    /// Directory of the first exposure in stack order, or an empty string.
    pub fn input_path(&self) -> String {
        self.descriptor_at(0)
            .map(|d| FileNameIndex::new([d.file_name()]).dir_name(0))
            .unwrap_or_default()
    }
}
