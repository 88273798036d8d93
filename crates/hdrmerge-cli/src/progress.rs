use hdrmerge_core::pipeline::{LoadStage, ProgressReporter, SaveStage};
use indicatif::{ProgressBar, ProgressStyle};

/// Drives a single percentage bar from load and save events.
pub struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    pub fn new(hidden: bool) -> anyhow::Result<Self> {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(100)
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg:30!} [{bar:40}] {pos:>3}%")?
                .progress_chars("=> "),
        );
        Ok(Self { bar })
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for BarReporter {
    fn load_progress(&self, percent: u8, stage: &LoadStage) {
        let message = match stage {
            LoadStage::Loading(path) => format!(
                "Loading {}",
                path.file_name()
                    .map(|n| n.to_string_lossy())
                    .unwrap_or_else(|| path.to_string_lossy())
            ),
            other => other.to_string(),
        };
        self.bar.set_message(message);
        self.bar.set_position(u64::from(percent));
    }

    fn save_progress(&self, stage: SaveStage) {
        self.bar.set_message(stage.to_string());
        self.bar.set_position(u64::from(stage.percent()));
    }
}
