use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_BATCH_GAP_SECS, DEFAULT_CUSTOM_WHITE_LEVEL, DEFAULT_FEATHER_RADIUS};

/// Options for one ingestion batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Input paths, in load order.
    pub file_names: Vec<PathBuf>,
    pub align: bool,
    pub crop: bool,
    /// Clamp the decoded white level to `custom_wl`.
    pub use_custom_wl: bool,
    pub custom_wl: u32,
    /// Split the inputs into bracketed sets by capture time.
    pub batch: bool,
    /// Largest gap, in seconds, between two exposures of one set.
    pub batch_gap: f64,
    /// Also merge sets holding a single exposure.
    pub with_singles: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            file_names: Vec::new(),
            align: true,
            crop: true,
            use_custom_wl: false,
            custom_wl: DEFAULT_CUSTOM_WHITE_LEVEL,
            batch: false,
            batch_gap: DEFAULT_BATCH_GAP_SECS,
            with_singles: false,
        }
    }
}

/// Size of the preview embedded next to the merged image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewSize {
    None,
    Half,
    #[default]
    Full,
}

impl PreviewSize {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::None),
            1 => Some(Self::Half),
            2 => Some(Self::Full),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Half => 1,
            Self::Full => 2,
        }
    }
}

impl fmt::Display for PreviewSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Half => write!(f, "half"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// Options for composing and writing one merged image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Bits per sample of the output: 16, 24 or 32.
    pub bps: u8,
    pub feather_radius: u32,
    pub preview_size: PreviewSize,
    pub save_mask: bool,
    /// Pattern of the mask file; `%of`/`%od` refer to `file_name`.
    pub mask_file_name: String,
    /// Output pattern, or the resolved output path once a set is saved.
    pub file_name: String,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            bps: 16,
            feather_radius: DEFAULT_FEATHER_RADIUS,
            preview_size: PreviewSize::default(),
            save_mask: false,
            mask_file_name: String::new(),
            file_name: String::new(),
        }
    }
}

/// Configuration file layout: one table per option group.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub load: LoadOptions,
    pub save: SaveOptions,
}
