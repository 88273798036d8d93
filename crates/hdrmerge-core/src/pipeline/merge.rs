use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::{HdrMergeError, Result};
use crate::io::{ExposureDecoder, OutputWriter};
use crate::metadata::MetadataBackend;
use crate::naming::with_output_extension;

use super::batch::bracketed_sets;
use super::config::{LoadOptions, SaveOptions};
use super::orchestrator::{ImageIo, SaveSummary};
use super::types::ProgressReporter;

/// Collaborators used by [`automatic_merge`].
#[derive(Clone, Copy)]
pub struct Backends<'a> {
    pub decoder: &'a dyn ExposureDecoder,
    pub writer: &'a dyn OutputWriter,
    pub metadata: &'a dyn MetadataBackend,
    pub reporter: &'a dyn ProgressReporter,
}

#[derive(Debug)]
pub enum SetResult {
    /// Single-image set left out because singles were not requested.
    Skipped,
    Merged(SaveSummary),
    Failed(HdrMergeError),
}

/// Outcome of one bracketed set.
#[derive(Debug)]
pub struct SetOutcome {
    pub files: Vec<PathBuf>,
    pub result: SetResult,
}

#[derive(Debug, Default)]
pub struct MergeReport {
    pub sets: Vec<SetOutcome>,
}

impl MergeReport {
    pub fn merged(&self) -> usize {
        self.count(|r| matches!(r, SetResult::Merged(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| matches!(r, SetResult::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|r| matches!(r, SetResult::Skipped))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&SetResult) -> bool) -> usize {
        self.sets.iter().filter(|s| pred(&s.result)).count()
    }
}

/// Merge every set of `load` without user interaction.
///
/// With `load.batch` the inputs are split into bracketed sets first. Sets
/// holding a single file are skipped unless `load.with_singles` is set. A
/// failing set is recorded and the remaining sets are still merged.
pub fn automatic_merge(
    io: &mut ImageIo,
    load: &LoadOptions,
    save: &SaveOptions,
    backends: Backends<'_>,
) -> MergeReport {
    let sets = if load.batch {
        bracketed_sets(load, backends.decoder)
    } else {
        vec![load.clone()]
    };

    let mut report = MergeReport::default();
    for set in sets {
        let result = if set.file_names.len() == 1 && !load.with_singles {
            info!(file = %set.file_names[0].display(), "Skipping single image");
            SetResult::Skipped
        } else {
            match merge_set(io, &set, save, backends) {
                Ok(summary) => SetResult::Merged(summary),
                Err(e) => {
                    warn!("{e}");
                    SetResult::Failed(e)
                }
            }
        };
        report.sets.push(SetOutcome {
            files: set.file_names,
            result,
        });
    }
    report
}

fn merge_set(
    io: &mut ImageIo,
    set: &LoadOptions,
    save: &SaveOptions,
    backends: Backends<'_>,
) -> Result<SaveSummary> {
    let summary = io
        .load(set, backends.decoder, backends.reporter)
        .map_err(|source| {
            // A single file is split into frames; its index names a frame.
            let file = if set.file_names.len() == 1 {
                set.file_names[0].clone()
            } else {
                set.file_names
                    .get(source.index())
                    .cloned()
                    .unwrap_or_default()
            };
            HdrMergeError::LoadFailed { file, source }
        })?;

    if summary.images == 0 {
        let file = set.file_names.first().cloned().unwrap_or_default();
        return Err(HdrMergeError::NoUsableFrames(file));
    }

    let file_name = if save.file_name.is_empty() {
        io.build_output_file_name()
    } else {
        with_output_extension(io.replace_arguments(&save.file_name, ""))
    };
    info!(images = summary.images, output = %file_name, "Writing result");

    let options = SaveOptions {
        file_name,
        ..save.clone()
    };
    let mut saved = io.save(
        &options,
        backends.writer,
        backends.metadata,
        backends.reporter,
    )?;
    if let Some(e) = saved.metadata.write_error.take() {
        return Err(e.into());
    }
    Ok(saved)
}
