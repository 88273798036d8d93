use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hdrmerge_core::io::{ExposureDecoder, SerDecoder, SerReader};

#[derive(Args)]
pub struct InfoArgs {
    /// Input raw file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let decoder = SerDecoder;
    let frames = decoder.probe_frame_count(&args.file);
    let reader = SerReader::open(&args.file)
        .with_context(|| format!("Cannot open {}", args.file.display()))?;
    let params = reader.raw_parameters(&args.file, 0)?;

    println!("File:        {}", args.file.display());
    println!("Frames:      {}", frames);
    println!("Dimensions:  {}x{}", params.raw_width, params.raw_height);
    println!("Bit depth:   {}", reader.header.pixel_depth);
    println!("CFA layout:  {}", params.layout);
    println!("White level: {}", params.white);

    let header = &reader.header;
    for (label, value) in [
        ("Observer:   ", &header.observer),
        ("Instrument: ", &header.instrument),
        ("Telescope:  ", &header.telescope),
    ] {
        if !value.is_empty() {
            println!("{label} {value}");
        }
    }

    match decoder.probe_creation_interval(&args.file) {
        Some(interval) => println!(
            "Captured:    {} .. {}",
            interval.start.format("%Y-%m-%d %H:%M:%S%.3f"),
            interval.end.format("%Y-%m-%d %H:%M:%S%.3f")
        ),
        None => println!("Captured:    unknown"),
    }

    Ok(())
}
