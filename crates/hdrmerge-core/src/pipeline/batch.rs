use std::path::PathBuf;

use tracing::debug;

use crate::frame::CreationInterval;
use crate::io::ExposureDecoder;

use super::config::LoadOptions;

/// Split `options.file_names` into bracketed sets by capture time.
///
/// Files without a creation interval form a set of their own. The rest are
/// sorted by interval, and a new set starts whenever the gap to the previous
/// file exceeds `options.batch_gap` seconds. Every returned set carries the
/// remaining options unchanged.
pub fn bracketed_sets(options: &LoadOptions, decoder: &dyn ExposureDecoder) -> Vec<LoadOptions> {
    let with_files = |file_names: Vec<PathBuf>| LoadOptions {
        file_names,
        ..options.clone()
    };

    let mut sets = Vec::new();
    let mut dated: Vec<(CreationInterval, PathBuf)> = Vec::new();
    for name in &options.file_names {
        match decoder.probe_creation_interval(name) {
            Some(interval) => dated.push((interval, name.clone())),
            None => {
                debug!(file = %name.display(), "No capture time, merging on its own");
                sets.push(with_files(vec![name.clone()]));
            }
        }
    }
    dated.sort();

    let mut current: Vec<PathBuf> = Vec::new();
    let mut last: Option<CreationInterval> = None;
    for (interval, name) in dated {
        let starts_set = last.map_or(true, |prev| prev.gap_to(&interval) > options.batch_gap);
        if starts_set && !current.is_empty() {
            sets.push(with_files(std::mem::take(&mut current)));
        }
        current.push(name);
        last = Some(interval);
    }
    if !current.is_empty() {
        sets.push(with_files(current));
    }

    debug!(inputs = options.file_names.len(), sets = sets.len(), "Bracketed sets");
    sets
}
