use crate::descriptor::{Version, parse_header};
use modstore_api::headers::{
    BUNDLE_ACTIVATOR, BUNDLE_CLASSPATH, BUNDLE_REQUIREDEXECUTIONENVIRONMENT, BUNDLE_SYMBOLICNAME,
    BUNDLE_VERSION, DYNAMICIMPORT_PACKAGE, FRAGMENT_HOST,
};
use modstore_api::{Descriptor, HeaderError};
use tracing::debug;

/// Values a record caches from its descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorFields {
    pub symbolic_name: Option<String>,
    pub version: Version,
    pub activator: Option<String>,
    pub class_path: Option<String>,
    pub execution_environment: Option<String>,
    pub dynamic_imports: Option<String>,
    /// True iff a `Fragment-Host` header is present.
    pub fragment: bool,
}

impl DescriptorFields {
    /// Extract the cached values. Only a malformed version fails; a malformed
    /// symbolic name leaves `symbolic_name` unset.
    pub fn from_descriptor(descriptor: &Descriptor) -> Result<Self, HeaderError> {
        let owned = |name: &str| descriptor.get(name).map(str::to_string);

        Ok(Self {
            symbolic_name: parse_symbolic_name(descriptor),
            version: Version::parse_optional(descriptor.get(BUNDLE_VERSION))?,
            activator: owned(BUNDLE_ACTIVATOR),
            class_path: owned(BUNDLE_CLASSPATH),
            execution_environment: owned(BUNDLE_REQUIREDEXECUTIONENVIRONMENT),
            dynamic_imports: owned(DYNAMICIMPORT_PACKAGE),
            fragment: descriptor.contains(FRAGMENT_HOST),
        })
    }
}

/// Value of the first `Bundle-SymbolicName` element, if the header parses.
pub fn parse_symbolic_name(descriptor: &Descriptor) -> Option<String> {
    let value = descriptor.get(BUNDLE_SYMBOLICNAME)?;
    match parse_header(BUNDLE_SYMBOLICNAME, value) {
        Ok(elements) => elements.into_iter().next().map(|e| e.value),
        Err(e) => {
            debug!("Ignoring malformed symbolic name: {}", e);
            None
        }
    }
}
