use crate::error::ParseError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Parsed module descriptor: header name -> value.
///
/// Insertion order is preserved. Lookups ignore ASCII case, as descriptor
/// header names do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    headers: IndexMap<String, String>,
}

impl Descriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any existing header with the same name
    /// (ignoring case). Returns the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.index_of(&name) {
            Some(idx) => {
                let (_, existing) = self.headers.get_index_mut(idx)?;
                Some(std::mem::replace(existing, value))
            }
            None => {
                self.headers.insert(name, value);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.headers.get(name) {
            return Some(value.as_str());
        }
        self.index_of(name)
            .and_then(|idx| self.headers.get_index(idx))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.headers
            .keys()
            .position(|k| k.eq_ignore_ascii_case(name))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Descriptor {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut descriptor = Descriptor::new();
        for (k, v) in iter {
            descriptor.insert(k, v);
        }
        descriptor
    }
}

/// Turns a raw descriptor stream into a [`Descriptor`].
pub trait DescriptorParser: Send + Sync {
    fn parse(&self, input: &mut dyn Read) -> Result<Descriptor, ParseError>;
}
