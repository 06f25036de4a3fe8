//! Header value grammar: `value[;value]*[;attr=x][;dir:=y], ...`

use modstore_api::HeaderError;

/// One comma-separated clause of a header value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderElement {
    /// The clause values joined with `;`.
    pub value: String,
    pub attributes: Vec<(String, String)>,
    pub directives: Vec<(String, String)>,
}

impl HeaderElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        lookup(&self.attributes, name)
    }

    pub fn directive(&self, name: &str) -> Option<&str> {
        lookup(&self.directives, name)
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Split a header value into its elements.
pub fn parse_header(header: &str, value: &str) -> Result<Vec<HeaderElement>, HeaderError> {
    let fail = |reason: &str| HeaderError::new(header, value, reason);

    if value.trim().is_empty() {
        return Err(fail("empty header"));
    }

    let mut elements = Vec::new();
    for clause in split_unquoted(value, ',').map_err(|r| fail(r))? {
        let mut element = HeaderElement::default();
        let mut values: Vec<&str> = Vec::new();

        for part in split_unquoted(clause, ';').map_err(|r| fail(r))? {
            let part = part.trim();
            match part.find('=') {
                None => {
                    if !element.attributes.is_empty() || !element.directives.is_empty() {
                        return Err(fail("value after parameter"));
                    }
                    if part.is_empty() {
                        return Err(fail("empty value"));
                    }
                    values.push(part);
                }
                Some(eq) => {
                    let (name, is_directive) = match part[..eq].strip_suffix(':') {
                        Some(name) => (name.trim(), true),
                        None => (part[..eq].trim(), false),
                    };
                    if name.is_empty() {
                        return Err(fail("parameter without a name"));
                    }
                    let param = (name.to_string(), unquote(part[eq + 1..].trim()));
                    if is_directive {
                        element.directives.push(param);
                    } else {
                        element.attributes.push(param);
                    }
                }
            }
        }

        if values.is_empty() {
            return Err(fail("clause without a value"));
        }
        element.value = values.join(";");
        elements.push(element);
    }

    Ok(elements)
}

/// Split on `sep`, ignoring separators inside double quotes.
fn split_unquoted(s: &str, sep: char) -> Result<Vec<&str>, &'static str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, c) in s.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == sep && !in_quotes {
            parts.push(&s[start..idx]);
            start = idx + c.len_utf8();
        }
    }

    if in_quotes {
        return Err("unterminated quoted string");
    }
    parts.push(&s[start..]);
    Ok(parts)
}

fn unquote(s: &str) -> String {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
        .to_string()
}
