//! Descriptor (manifest) grammar.
//!
//! - [`ManifestParser`]: main-section `Name: value` headers with continuation lines
//! - [`parse_header`]: clause/attribute/directive splitting of a header value
//! - [`Version`]: `major.minor.micro.qualifier` versions

pub mod header;
pub mod parser;
pub mod version;

pub use header::{HeaderElement, parse_header};
pub use parser::ManifestParser;
pub use version::Version;
