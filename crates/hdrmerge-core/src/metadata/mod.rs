pub mod container;
pub mod fusion;
pub mod rules;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MetadataError;

pub use container::TrailerBackend;
pub use fusion::{fuse_sets, transfer, FusionReport, FusionStats};
pub use rules::{ExifRules, FusionRules, DEFAULT_RULES};

/// Value of a single metadata record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum MetadataValue {
    Text(String),
    Integer(i64),
    Rational(i64, i64),
    Bytes(Vec<u8>),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Rational(n, d) => write!(f, "{n}/{d}"),
            Self::Bytes(b) => write!(f, "({} bytes)", b.len()),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

/// Records of one namespace, keyed by their fully qualified name.
pub type RecordSet = BTreeMap<String, MetadataValue>;

/// The three metadata namespaces carried by an image.
///
/// Keys are dot-qualified: `Xmp.<prefix>.<name>`, `Iptc.<record>.<name>`
/// and `Exif.<group>.<tag>`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataSets {
    /// Hierarchical records.
    #[serde(default)]
    pub xmp: RecordSet,
    /// Flat press records.
    #[serde(default)]
    pub iptc: RecordSet,
    /// Tag-coded records.
    #[serde(default)]
    pub exif: RecordSet,
}

impl MetadataSets {
    pub fn is_empty(&self) -> bool {
        self.xmp.is_empty() && self.iptc.is_empty() && self.exif.is_empty()
    }

    pub fn len(&self) -> usize {
        self.xmp.len() + self.iptc.len() + self.exif.len()
    }
}

/// Group label of a qualified key: the second dot-separated segment.
pub fn group_name(key: &str) -> &str {
    key.split('.').nth(1).unwrap_or("")
}

/// Boundary to the metadata library that reads and writes containers.
pub trait MetadataBackend: Send + Sync {
    /// Read the metadata of a file on disk.
    fn read_file(&self, path: &Path) -> std::result::Result<MetadataSets, MetadataError>;

    /// Read the metadata of an in-memory container.
    fn read_container(&self, bytes: &[u8]) -> std::result::Result<MetadataSets, MetadataError>;

    /// Return `bytes` with its metadata replaced by `sets`.
    fn write_container(
        &self,
        bytes: &[u8],
        sets: &MetadataSets,
    ) -> std::result::Result<Vec<u8>, MetadataError>;
}
