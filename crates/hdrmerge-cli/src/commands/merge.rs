use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use hdrmerge_core::consts::SUPPORTED_BITS_PER_SAMPLE;
use hdrmerge_core::io::{SerDecoder, TiffWriter};
use hdrmerge_core::metadata::TrailerBackend;
use hdrmerge_core::pipeline::{
    automatic_merge, Backends, ImageIo, LoadOptions, MergeConfig, PreviewSize, SaveOptions,
};
use tracing::debug;

use crate::progress::BarReporter;
use crate::summary::{print_merge_report, print_merge_summary};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PreviewArg {
    Full,
    Half,
    None,
}

impl From<PreviewArg> for PreviewSize {
    fn from(arg: PreviewArg) -> Self {
        match arg {
            PreviewArg::Full => PreviewSize::Full,
            PreviewArg::Half => PreviewSize::Half,
            PreviewArg::None => PreviewSize::None,
        }
    }
}

#[derive(Args)]
pub struct MergeArgs {
    /// Input raw files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Merge config file (TOML); flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output file name pattern (%if[n], %iF[n], %id[n], %in[n], %%)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Save the exposure mask to this pattern (%of, %od refer to the output)
    #[arg(short, long)]
    pub mask: Option<String>,

    /// Do not align the exposures
    #[arg(long)]
    pub no_align: bool,

    /// Do not crop the result to the common area
    #[arg(long)]
    pub no_crop: bool,

    /// Split the inputs into bracketed sets by capture time
    #[arg(short = 'B', long)]
    pub batch: bool,

    /// Largest gap in seconds between two exposures of one set
    #[arg(short = 'g', long)]
    pub gap: Option<f64>,

    /// Also merge sets holding a single file, such as one multi-frame recording
    #[arg(long)]
    pub single: bool,

    /// Bits per sample of the output
    #[arg(short = 'b', long, value_parser = parse_bps)]
    pub bps: Option<u8>,

    /// Use this white level instead of the decoded one, if lower
    #[arg(short = 'w', long)]
    pub white_level: Option<u32>,

    /// Feather radius of the exposure mask, in pixels
    #[arg(short = 'r', long)]
    pub radius: Option<u32>,

    /// Preview size
    #[arg(short = 'p', long, value_enum)]
    pub preview: Option<PreviewArg>,

    /// Do not draw a progress bar
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

fn parse_bps(s: &str) -> std::result::Result<u8, String> {
    let bps: u8 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if SUPPORTED_BITS_PER_SAMPLE.contains(&bps) {
        Ok(bps)
    } else {
        Err(format!("expected one of {SUPPORTED_BITS_PER_SAMPLE:?}"))
    }
}

pub fn run(args: &MergeArgs) -> Result<ExitCode> {
    let config = match args.config {
        Some(ref path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            toml::from_str(&contents).context("Invalid merge config")?
        }
        None => MergeConfig::default(),
    };
    let (load, save) = apply_args(config, args);
    debug!(?load, ?save, "Merge options");

    print_merge_summary(&load, &save);

    let reporter = BarReporter::new(args.quiet)?;
    let decoder = SerDecoder;
    let writer = TiffWriter;
    let metadata = TrailerBackend;
    let backends = Backends {
        decoder: &decoder,
        writer: &writer,
        metadata: &metadata,
        reporter: &reporter,
    };

    let mut io = ImageIo::default();
    let report = automatic_merge(&mut io, &load, &save, backends);
    reporter.finish();

    print_merge_report(&report);

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn apply_args(config: MergeConfig, args: &MergeArgs) -> (LoadOptions, SaveOptions) {
    let MergeConfig { mut load, mut save } = config;

    load.file_names = args.files.clone();
    if args.no_align {
        load.align = false;
    }
    if args.no_crop {
        load.crop = false;
    }
    if args.batch {
        load.batch = true;
    }
    if let Some(gap) = args.gap {
        load.batch_gap = gap;
    }
    if args.single {
        load.with_singles = true;
    }
    if let Some(wl) = args.white_level {
        load.use_custom_wl = true;
        load.custom_wl = wl;
    }

    if let Some(ref output) = args.output {
        save.file_name = output.clone();
    }
    if let Some(ref mask) = args.mask {
        save.save_mask = true;
        save.mask_file_name = mask.clone();
    }
    if let Some(bps) = args.bps {
        save.bps = bps;
    }
    if let Some(radius) = args.radius {
        save.feather_radius = radius;
    }
    if let Some(preview) = args.preview {
        save.preview_size = preview.into();
    }

    (load, save)
}
