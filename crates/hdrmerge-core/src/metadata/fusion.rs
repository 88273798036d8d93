use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::MetadataError;

use super::rules::FusionRules;
use super::{MetadataBackend, MetadataSets, MetadataValue};

/// Counts of records changed by one fusion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FusionStats {
    pub xmp_copied: usize,
    pub iptc_copied: usize,
    pub exif_forced: usize,
    pub exif_copied: usize,
}

impl FusionStats {
    pub fn total(&self) -> usize {
        self.xmp_copied + self.iptc_copied + self.exif_forced + self.exif_copied
    }
}

/// Outcome of [`transfer`]. Failures after the destination was opened are
/// carried here instead of aborting.
#[derive(Debug)]
pub struct FusionReport {
    /// Destination metadata as persisted (or as it would have been).
    pub metadata: MetadataSets,
    pub stats: FusionStats,
    /// Set when the source could not be read; only the primary flag was applied.
    pub source_error: Option<MetadataError>,
    /// Set when the fused container could not be written.
    pub write_error: Option<MetadataError>,
}

impl FusionReport {
    pub fn is_complete(&self) -> bool {
        self.source_error.is_none() && self.write_error.is_none()
    }
}

/// Merge `src` into `dst` following `rules`.
///
/// With no source only the primary-image flag is applied. Applying the same
/// source twice changes nothing the second time.
pub fn fuse_sets(
    dst: &mut MetadataSets,
    src: Option<&MetadataSets>,
    rules: &FusionRules,
) -> FusionStats {
    let mut stats = FusionStats::default();

    if let Some(src) = src {
        for (key, value) in &src.xmp {
            if !rules.is_xmp_excluded(key) && !dst.xmp.contains_key(key) {
                dst.xmp.insert(key.clone(), value.clone());
                stats.xmp_copied += 1;
            }
        }

        for (key, value) in &src.iptc {
            if !dst.iptc.contains_key(key) {
                dst.iptc.insert(key.clone(), value.clone());
                stats.iptc_copied += 1;
            }
        }

        for key in rules.exif.force_copy {
            if let Some(value) = src.exif.get(*key) {
                if dst.exif.get(*key) != Some(value) {
                    dst.exif.insert((*key).to_string(), value.clone());
                    stats.exif_forced += 1;
                }
            }
        }
    }

    dst.exif.insert(
        rules.exif.primary_flag_key.to_string(),
        MetadataValue::Integer(rules.exif.primary_flag_value),
    );

    if let Some(src) = src {
        for (key, value) in &src.exif {
            if !rules.exif.is_excluded(key) && !dst.exif.contains_key(key) {
                dst.exif.insert(key.clone(), value.clone());
                stats.exif_copied += 1;
            }
        }
    }

    stats
}

/// Copy the metadata of `source` into the container `bytes` and write the
/// result to `dest`.
///
/// Only an unreadable destination container is an error. An unreadable
/// source or a failed write is reported in the returned [`FusionReport`].
pub fn transfer(
    backend: &dyn MetadataBackend,
    rules: &FusionRules,
    source: &Path,
    bytes: &[u8],
    dest: &Path,
) -> std::result::Result<FusionReport, MetadataError> {
    let mut metadata = backend.read_container(bytes)?;

    let (src, source_error) = match backend.read_file(source) {
        Ok(sets) => (Some(sets), None),
        Err(e) => {
            warn!("Error loading metadata from {}: {e}", source.display());
            (None, Some(e))
        }
    };

    let stats = fuse_sets(&mut metadata, src.as_ref(), rules);
    debug!(
        xmp = stats.xmp_copied,
        iptc = stats.iptc_copied,
        exif_forced = stats.exif_forced,
        exif = stats.exif_copied,
        "Fused metadata"
    );

    let write_error = match persist(backend, bytes, &metadata, dest) {
        Ok(()) => {
            info!("Wrote {} ({} metadata records)", dest.display(), metadata.len());
            None
        }
        Err(e) => {
            warn!("Error writing {}: {e}", dest.display());
            Some(e)
        }
    };

    Ok(FusionReport {
        metadata,
        stats,
        source_error,
        write_error,
    })
}

fn persist(
    backend: &dyn MetadataBackend,
    bytes: &[u8],
    metadata: &MetadataSets,
    dest: &Path,
) -> std::result::Result<(), MetadataError> {
    let out = backend.write_container(bytes, metadata)?;
    std::fs::write(dest, out).map_err(|e| MetadataError::WriteFailed {
        path: dest.to_path_buf(),
        reason: e.to_string(),
    })
}
