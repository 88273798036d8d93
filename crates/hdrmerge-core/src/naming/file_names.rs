use std::path::Path;

/// Sorted view over the input file names of a batch.
///
/// Indices may be negative: `-1` is the last name, `-2` the one before it.
/// Every query on an index outside the batch yields an empty string.
#[derive(Clone, Debug, Default)]
pub struct FileNameIndex {
    names: Vec<String>,
}

impl FileNameIndex {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut names: Vec<String> = paths
            .into_iter()
            .map(|p| p.as_ref().to_string_lossy().into_owned())
            .collect();
        names.sort();
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn adjust_index(&self, index: i64) -> Option<usize> {
        let count = self.names.len() as i64;
        let i = if index < 0 { count.checked_add(index)? } else { index };
        if (0..count).contains(&i) {
            Some(i as usize)
        } else {
            None
        }
    }

    fn name_at(&self, index: i64) -> Option<&str> {
        self.adjust_index(index).map(|i| self.names[i].as_str())
    }

    /// File name of input `index`, without its directory.
    pub fn base_name(&self, index: i64) -> String {
        self.name_at(index).map(base_name).unwrap_or_default()
    }

    /// Base name without the text from its last `.` on.
    pub fn base_name_no_ext(&self, index: i64) -> String {
        strip_extension(&self.base_name(index)).to_string()
    }

    /// Directory containing input `index`.
    pub fn dir_name(&self, index: i64) -> String {
        self.name_at(index).map(dir_name).unwrap_or_default()
    }

    /// Trailing run of ASCII digits of the extension-less base name, e.g.
    /// `1234` for `IMG_1234.CR2`.
    pub fn number_suffix(&self, index: i64) -> String {
        let name = self.base_name_no_ext(index);
        let digits = name
            .bytes()
            .rev()
            .take_while(|b| b.is_ascii_digit())
            .count();
        name[name.len() - digits..].to_string()
    }
}

pub(crate) fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Directory of `path`, made absolute when it exists on disk.
pub(crate) fn dir_name(path: &str) -> String {
    let parent = match Path::new(path).parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::canonicalize(parent)
        .unwrap_or_else(|_| parent.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) => &name[..pos],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_extension_without_dot() {
        assert_eq!(strip_extension("README"), "README");
        assert_eq!(strip_extension("a.b.c"), "a.b");
        assert_eq!(strip_extension(".hidden"), "");
    }

    #[test]
    fn test_adjust_index_extremes() {
        let index = FileNameIndex::new(["/a/x.ser"]);
        assert_eq!(index.adjust_index(i64::MIN), None);
        assert_eq!(index.adjust_index(i64::MAX), None);
        assert_eq!(index.adjust_index(-1), Some(0));
    }
}
