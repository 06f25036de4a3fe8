use modstore_api::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("descriptor entry {entry} not found in module {location}")]
    DescriptorNotFound { entry: String, location: String },
    #[error("failed to parse descriptor of module {location}: {source}")]
    DescriptorParse {
        location: String,
        #[source]
        source: ParseError,
    },
    #[error("failed to load descriptor of module {location}: {reason}")]
    DescriptorLoad { location: String, reason: String },
    #[error("native code {path} could not be extracted")]
    NativeCodeExtraction { path: String },
    #[error("no free generation left for module {id}")]
    GenerationExhausted { id: u64 },
    #[error("data area is not configured")]
    DataAreaUnavailable,
    #[error("generation {generation} of module {id} is in use")]
    GenerationInUse { id: u64, generation: u32 },
    #[error("module {0} not found")]
    ModuleNotFound(u64),
    #[error("snapshot error: {0}")]
    Snapshot(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn load(location: &str, err: impl std::fmt::Display) -> Self {
        StoreError::DescriptorLoad {
            location: location.to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<rmp_serde::encode::Error> for StoreError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        StoreError::Snapshot(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for StoreError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        StoreError::Snapshot(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
