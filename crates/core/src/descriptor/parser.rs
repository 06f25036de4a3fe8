use modstore_api::{Descriptor, DescriptorParser, ParseError};
use std::io::Read;

/// Parser for the main section of a JAR-style manifest.
#[derive(Debug, Default, Clone)]
pub struct ManifestParser;

impl ManifestParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse already-decoded manifest text.
    pub fn parse_str(&self, text: &str) -> Result<Descriptor, ParseError> {
        let mut descriptor = Descriptor::new();
        let mut current: Option<(String, String, usize)> = None;

        for (idx, line) in split_lines(text).enumerate() {
            let line_no = idx + 1;

            if line.is_empty() {
                if current.is_some() || !descriptor.is_empty() {
                    // End of the main section; per-entry sections are not consumed
                    break;
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix(' ') {
                match current.as_mut() {
                    Some((_, value, _)) => value.push_str(rest),
                    None => {
                        return Err(syntax(line_no, "continuation line without a header"));
                    }
                }
                continue;
            }

            if let Some((name, value, at)) = current.take() {
                put(&mut descriptor, name, value, at)?;
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(syntax(line_no, "expected 'Name: value'"));
            };
            let name = name.trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(syntax(line_no, format!("invalid header name \"{}\"", name)));
            }

            current = Some((name.to_string(), value.trim_start().to_string(), line_no));
        }

        if let Some((name, value, at)) = current {
            put(&mut descriptor, name, value, at)?;
        }

        Ok(descriptor)
    }
}

impl DescriptorParser for ManifestParser {
    fn parse(&self, input: &mut dyn Read) -> Result<Descriptor, ParseError> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        let text = String::from_utf8(bytes).map_err(|e| {
            ParseError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        self.parse_str(&text)
    }
}

fn put(descriptor: &mut Descriptor, name: String, value: String, line: usize) -> Result<(), ParseError> {
    if descriptor.contains(&name) {
        return Err(syntax(line, format!("duplicate header \"{}\"", name)));
    }
    descriptor.insert(name, value.trim_end().to_string());
    Ok(())
}

fn syntax(line: usize, message: impl Into<String>) -> ParseError {
    ParseError::Syntax {
        line,
        message: message.into(),
    }
}

/// Split on `\r\n`, `\n` or `\r`.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(text);
    std::iter::from_fn(move || {
        let s = rest?;
        match s.find(['\r', '\n']) {
            Some(pos) => {
                let line = &s[..pos];
                let skip = if s[pos..].starts_with("\r\n") { 2 } else { 1 };
                rest = Some(&s[pos + skip..]);
                Some(line)
            }
            None => {
                rest = None;
                if s.is_empty() { None } else { Some(s) }
            }
        }
    })
}
