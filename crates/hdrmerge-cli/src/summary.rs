use console::Style;
use hdrmerge_core::pipeline::{LoadOptions, MergeReport, SaveOptions, SetResult};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    disabled: Style,
    path: Style,
    ok: Style,
    error: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            ok: Style::new().green(),
            error: Style::new().red().bold(),
        }
    }

    fn flag(&self, on: bool) -> String {
        if on {
            self.ok.apply_to("on").to_string()
        } else {
            self.disabled.apply_to("off").to_string()
        }
    }
}

pub fn print_merge_summary(load: &LoadOptions, save: &SaveOptions) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("HDR Merge"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(9)));
    println!();

    println!("  {}", s.header.apply_to("Inputs"));
    for file in &load.file_names {
        println!("    {}", s.path.apply_to(file.display()));
    }
    println!();

    println!("  {}", s.header.apply_to("Loading"));
    println!("    {:<14}{}", s.label.apply_to("Align"), s.flag(load.align));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Crop"),
        s.flag(load.align && load.crop)
    );
    if load.use_custom_wl {
        println!(
            "    {:<14}{}",
            s.label.apply_to("White level"),
            s.value.apply_to(load.custom_wl)
        );
    }
    if load.batch {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Batch gap"),
            s.value.apply_to(format!("{:.1} s", load.batch_gap))
        );
        println!(
            "    {:<14}{}",
            s.label.apply_to("Singles"),
            s.flag(load.with_singles)
        );
    } else {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Batch"),
            s.disabled.apply_to("off")
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Output"));
    let pattern = if save.file_name.is_empty() {
        s.disabled.apply_to("default").to_string()
    } else {
        s.path.apply_to(&save.file_name).to_string()
    };
    println!("    {:<14}{}", s.label.apply_to("Pattern"), pattern);
    println!(
        "    {:<14}{}",
        s.label.apply_to("Bits"),
        s.value.apply_to(save.bps)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Feather"),
        s.value.apply_to(format!("{} px", save.feather_radius))
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Preview"),
        s.value.apply_to(save.preview_size)
    );
    if save.save_mask {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Mask"),
            s.path.apply_to(&save.mask_file_name)
        );
    }
    println!();
}

pub fn print_merge_report(report: &MergeReport) {
    let s = Styles::new();

    for set in &report.sets {
        match &set.result {
            SetResult::Merged(saved) => {
                println!(
                    "  {} {} ({}x{}, {} inputs)",
                    s.ok.apply_to("Wrote"),
                    s.path.apply_to(saved.output.display()),
                    saved.width,
                    saved.height,
                    set.files.len()
                );
                if let Some(ref mask) = saved.mask {
                    println!(
                        "    {:<10}{}",
                        s.label.apply_to("Mask"),
                        s.path.apply_to(mask.display())
                    );
                }
                if let Some(ref e) = saved.metadata.source_error {
                    println!("    {:<10}{}", s.label.apply_to("Metadata"), s.disabled.apply_to(e));
                }
            }
            SetResult::Failed(e) => println!("  {}", s.error.apply_to(e)),
            SetResult::Skipped => {
                if let Some(file) = set.files.first() {
                    println!(
                        "  {} {}",
                        s.disabled.apply_to("Skipping single image"),
                        s.path.apply_to(file.display())
                    );
                }
            }
        }
    }

    println!();
    println!(
        "  {} merged, {} failed, {} skipped",
        s.value.apply_to(report.merged()),
        s.value.apply_to(report.failed()),
        s.value.apply_to(report.skipped())
    );
}
