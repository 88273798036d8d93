/// Largest number of logical frames a single multi-frame raw file may carry.
pub const MAX_FRAMES_PER_FILE: usize = 4;

/// Minimum file count to decode a batch with Rayon parallelism.
pub const PARALLEL_DECODE_THRESHOLD: usize = 3;

/// Minimum row count to use row-level Rayon parallelism in the stack.
pub const PARALLEL_ROW_THRESHOLD: usize = 64;

/// Extension appended to output names that lack it.
pub const OUTPUT_EXTENSION: &str = ".dng";

/// Output pattern for a batch holding a single exposure.
pub const DEFAULT_SINGLE_PATTERN: &str = "%id[-1]/%iF[0].dng";

/// Output pattern for a batch holding several exposures.
pub const DEFAULT_MULTI_PATTERN: &str = "%id[-1]/%iF[0]-%in[-1].dng";

/// Default maximum gap, in seconds, between two shots of one bracketed set.
pub const DEFAULT_BATCH_GAP_SECS: f64 = 2.0;

/// Default mask blur radius in pixels.
pub const DEFAULT_FEATHER_RADIUS: u32 = 3;

/// Default user white level when none is given.
pub const DEFAULT_CUSTOM_WHITE_LEVEL: u32 = 16383;

/// Bits per sample accepted by the output writer.
pub const SUPPORTED_BITS_PER_SAMPLE: [u8; 3] = [16, 24, 32];

/// Fraction of the white level above which a sample counts as saturated.
pub const SATURATION_FRACTION: f32 = 0.99;

/// Samples below this fraction of the usable range are too noisy to fit a
/// response against.
pub const RESPONSE_NOISE_FLOOR: f32 = 0.02;

/// Largest alignment search, as a fraction of the proxy image size.
pub const MAX_ALIGN_FRACTION: f64 = 0.25;

/// Number of .NET ticks (100 ns) between 0001-01-01 and the Unix epoch.
pub const DOTNET_EPOCH_TICKS: u64 = 621_355_968_000_000_000;
