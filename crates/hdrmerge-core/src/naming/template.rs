use crate::consts::{DEFAULT_MULTI_PATTERN, DEFAULT_SINGLE_PATTERN, OUTPUT_EXTENSION};

use super::file_names::{base_name, dir_name, FileNameIndex};

/// Which property of an input file a token asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputField {
    BaseName,
    BaseNameNoExt,
    Dir,
    NumberSuffix,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Token {
    Percent,
    OutputBaseName,
    OutputDir,
    /// `index` is `None` when the literal does not fit an `i64`; such a
    /// token can never name an input.
    Input { field: InputField, index: Option<i64> },
}

/// Expands `%` tokens in output-name patterns.
///
/// | Token    | Replacement                                   |
/// |----------|-----------------------------------------------|
/// | `%%`     | a literal `%`                                 |
/// | `%if[n]` | base name of input `n`                        |
/// | `%iF[n]` | base name of input `n` without extension      |
/// | `%id[n]` | directory of input `n`                        |
/// | `%in[n]` | numeric suffix of input `n`                   |
/// | `%of`    | base name of the output file (if one is set)  |
/// | `%od`    | directory of the output file (if one is set)  |
///
/// Inputs are sorted by full path; `n` may be negative to count from the
/// end. Anything else starting with `%` is copied verbatim.
#[derive(Clone, Debug)]
pub struct OutputPathResolver {
    index: FileNameIndex,
}

impl OutputPathResolver {
    pub fn new(index: FileNameIndex) -> Self {
        Self { index }
    }

    /// Expand `pattern`. `output_file_name` enables `%of`/`%od` when non-empty.
    pub fn resolve(&self, pattern: &str, output_file_name: &str) -> String {
        let with_output = !output_file_name.is_empty();
        let mut result = String::with_capacity(pattern.len());
        let mut rest = pattern;

        while let Some(pos) = rest.find('%') {
            result.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            match parse_token(tail, with_output) {
                Some((token, len)) => {
                    result.push_str(&self.expand(token, output_file_name));
                    rest = &tail[len..];
                }
                None => {
                    result.push('%');
                    rest = &tail[1..];
                }
            }
        }
        result.push_str(rest);
        result
    }

    fn expand(&self, token: Token, output_file_name: &str) -> String {
        match token {
            Token::Percent => "%".to_string(),
            Token::OutputBaseName => base_name(output_file_name),
            Token::OutputDir => dir_name(output_file_name),
            Token::Input { index: None, .. } => String::new(),
            Token::Input {
                field,
                index: Some(i),
            } => match field {
                InputField::BaseName => self.index.base_name(i),
                InputField::BaseNameNoExt => self.index.base_name_no_ext(i),
                InputField::Dir => self.index.dir_name(i),
                InputField::NumberSuffix => self.index.number_suffix(i),
            },
        }
    }
}

/// Recognise the token at the start of `s` (which begins with `%`) and
/// return it with its length in bytes.
fn parse_token(s: &str, with_output: bool) -> Option<(Token, usize)> {
    let bytes = s.as_bytes();
    match bytes.get(1)? {
        b'%' => Some((Token::Percent, 2)),
        b'o' if with_output => match bytes.get(2)? {
            b'f' => Some((Token::OutputBaseName, 3)),
            b'd' => Some((Token::OutputDir, 3)),
            _ => None,
        },
        b'i' => {
            let field = match bytes.get(2)? {
                b'f' => InputField::BaseName,
                b'F' => InputField::BaseNameNoExt,
                b'd' => InputField::Dir,
                b'n' => InputField::NumberSuffix,
                _ => return None,
            };
            if *bytes.get(3)? != b'[' {
                return None;
            }
            let start = 4;
            let mut end = start;
            if bytes.get(end) == Some(&b'-') {
                end += 1;
            }
            let digits_start = end;
            while bytes.get(end).is_some_and(u8::is_ascii_digit) {
                end += 1;
            }
            if end == digits_start || bytes.get(end) != Some(&b']') {
                return None;
            }
            let index = s[start..end].parse::<i64>().ok();
            Some((Token::Input { field, index }, end + 1))
        }
        _ => None,
    }
}

/// Pattern used when the user gives no output name.
pub fn default_pattern(num_images: usize) -> &'static str {
    if num_images > 1 {
        DEFAULT_MULTI_PATTERN
    } else {
        DEFAULT_SINGLE_PATTERN
    }
}

/// Append the output extension unless `name` already ends with it.
pub fn with_output_extension(mut name: String) -> String {
    if !name.ends_with(OUTPUT_EXTENSION) {
        name.push_str(OUTPUT_EXTENSION);
    }
    name
}
