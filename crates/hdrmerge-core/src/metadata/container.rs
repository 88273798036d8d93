use std::path::Path;

use tracing::debug;

use crate::error::MetadataError;
use crate::io::ser::{SerReader, SER_MAGIC};

use super::{MetadataBackend, MetadataSets, MetadataValue};

/// Marks the end of a metadata trailer.
pub const TRAILER_MAGIC: &[u8; 8] = b"HDRMETA1";
const TRAILER_FOOTER_LEN: usize = 8 + TRAILER_MAGIC.len();

/// Metadata backend storing records as a JSON trailer after the image
/// payload:
///
/// ```text
/// [payload][json records][json length: u64 LE][HDRMETA1]
/// ```
///
/// Readers of the payload format ignore the trailer. SER recordings without
/// a trailer expose their header fields as tag-coded records.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrailerBackend;

impl TrailerBackend {
    /// Split `bytes` into payload and trailer records, if a trailer is present.
    pub fn split(bytes: &[u8]) -> std::result::Result<(&[u8], Option<MetadataSets>), String> {
        let Some(footer_start) = bytes.len().checked_sub(TRAILER_FOOTER_LEN) else {
            return Ok((bytes, None));
        };
        if &bytes[bytes.len() - TRAILER_MAGIC.len()..] != TRAILER_MAGIC {
            return Ok((bytes, None));
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&bytes[footer_start..footer_start + 8]);
        let json_len = usize::try_from(u64::from_le_bytes(len_bytes))
            .map_err(|_| "trailer length overflow".to_string())?;
        let json_start = footer_start
            .checked_sub(json_len)
            .ok_or_else(|| format!("trailer length {json_len} exceeds container"))?;

        let sets = serde_json::from_slice(&bytes[json_start..footer_start])
            .map_err(|e| format!("malformed trailer: {e}"))?;
        Ok((&bytes[..json_start], Some(sets)))
    }
}

impl MetadataBackend for TrailerBackend {
    fn read_file(&self, path: &Path) -> std::result::Result<MetadataSets, MetadataError> {
        let unreadable = |reason: String| MetadataError::SourceUnreadable {
            path: path.to_path_buf(),
            reason,
        };

        let bytes = std::fs::read(path).map_err(|e| unreadable(e.to_string()))?;
        match Self::split(&bytes).map_err(unreadable)? {
            (_, Some(sets)) => Ok(sets),
            (payload, None) if payload.starts_with(SER_MAGIC) => {
                let reader = SerReader::open(path).map_err(|e| unreadable(e.to_string()))?;
                let sets = ser_metadata(&reader);
                debug!(file = %path.display(), records = sets.len(), "Read SER header metadata");
                Ok(sets)
            }
            (_, None) => Err(unreadable("unrecognised container format".into())),
        }
    }

    fn read_container(&self, bytes: &[u8]) -> std::result::Result<MetadataSets, MetadataError> {
        if bytes.is_empty() {
            return Err(MetadataError::DestinationUnreadable("empty container".into()));
        }
        let (_, sets) = Self::split(bytes).map_err(MetadataError::DestinationUnreadable)?;
        Ok(sets.unwrap_or_default())
    }

    fn write_container(
        &self,
        bytes: &[u8],
        sets: &MetadataSets,
    ) -> std::result::Result<Vec<u8>, MetadataError> {
        let (payload, _) =
            Self::split(bytes).map_err(MetadataError::DestinationUnreadable)?;
        let json = serde_json::to_vec(sets)
            .map_err(|e| MetadataError::DestinationUnreadable(e.to_string()))?;

        let mut out = Vec::with_capacity(payload.len() + json.len() + TRAILER_FOOTER_LEN);
        out.extend_from_slice(payload);
        out.extend_from_slice(&json);
        out.extend_from_slice(&(json.len() as u64).to_le_bytes());
        out.extend_from_slice(TRAILER_MAGIC);
        Ok(out)
    }
}

/// Tag-coded records derived from a SER header.
pub fn ser_metadata(reader: &SerReader) -> MetadataSets {
    let header = &reader.header;
    let mut sets = MetadataSets::default();

    for (key, value) in [
        ("Exif.Image.Artist", &header.observer),
        ("Exif.Image.Model", &header.instrument),
        ("Exif.Photo.LensModel", &header.telescope),
    ] {
        if !value.is_empty() {
            sets.exif
                .insert(key.to_string(), MetadataValue::Text(value.clone()));
        }
    }

    sets.exif.insert(
        "Exif.Image.BitsPerSample".to_string(),
        MetadataValue::Integer(i64::from(header.pixel_depth)),
    );

    if let Some(time) = reader.frame_time(0).or_else(|| header.capture_time()) {
        sets.exif.insert(
            "Exif.Photo.DateTimeOriginal".to_string(),
            MetadataValue::Text(time.format("%Y:%m:%d %H:%M:%S").to_string()),
        );
        sets.xmp.insert(
            "Xmp.xmp.CreateDate".to_string(),
            MetadataValue::Text(time.to_rfc3339()),
        );
    }

    sets
}
