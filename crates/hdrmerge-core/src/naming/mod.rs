mod file_names;
mod template;

pub use file_names::FileNameIndex;
pub use template::{default_pattern, with_output_extension, OutputPathResolver};
