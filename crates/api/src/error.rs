use thiserror::Error;

/// Failure while turning a raw descriptor stream into headers.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error while reading descriptor: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

/// Failure while interpreting the value of a single header.
#[derive(Debug, Error)]
#[error("invalid {header} header \"{value}\": {reason}")]
pub struct HeaderError {
    pub header: String,
    pub value: String,
    pub reason: String,
}

impl HeaderError {
    pub fn new(header: &str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            header: header.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
