use crate::archive::DefaultArchiveFactory;
use crate::descriptor::ManifestParser;
use crate::storage::GenerationStore;
use modstore_api::{
    AffixNaming, ArchiveFactory, DescriptorParser, FileNameMapper, LibraryNaming, LocationMapper,
};
use std::sync::Arc;

/// Collaborators every module record is constructed with.
#[derive(Clone)]
pub struct StorageServices {
    pub layout: GenerationStore,
    pub parser: Arc<dyn DescriptorParser>,
    pub archives: Arc<dyn ArchiveFactory>,
    pub locations: Arc<dyn LocationMapper>,
    pub libraries: Arc<dyn LibraryNaming>,
}

impl StorageServices {
    /// Services with the default manifest parser, archive factory and naming
    /// conventions of the host platform.
    pub fn new(layout: GenerationStore) -> Self {
        Self {
            layout,
            parser: Arc::new(ManifestParser::new()),
            archives: Arc::new(DefaultArchiveFactory),
            locations: Arc::new(FileNameMapper),
            libraries: Arc::new(AffixNaming::host()),
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn DescriptorParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_archive_factory(mut self, archives: Arc<dyn ArchiveFactory>) -> Self {
        self.archives = archives;
        self
    }

    pub fn with_location_mapper(mut self, locations: Arc<dyn LocationMapper>) -> Self {
        self.locations = locations;
        self
    }

    pub fn with_library_naming(mut self, libraries: Arc<dyn LibraryNaming>) -> Self {
        self.libraries = libraries;
        self
    }
}
