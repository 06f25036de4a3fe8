pub mod archive;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod logging;
pub mod record;
pub mod services;
pub mod storage;
pub mod store;

pub use config::{PersistenceMode, StoreConfig};
pub use error::{Result, StoreError};
pub use record::{DescriptorFields, ModuleRecord, RecordBuilder};
pub use services::StorageServices;
pub use storage::{GenerationStore, RecordSnapshot, SnapshotStore};
pub use store::ModuleStore;
