//! Descriptor header names consumed by the storage core.

/// Archive-relative location of the module descriptor.
pub const MODULE_MANIFEST: &str = "META-INF/MANIFEST.MF";

pub const BUNDLE_SYMBOLICNAME: &str = "Bundle-SymbolicName";
pub const BUNDLE_VERSION: &str = "Bundle-Version";
pub const BUNDLE_CLASSPATH: &str = "Bundle-ClassPath";
pub const BUNDLE_ACTIVATOR: &str = "Bundle-Activator";
pub const BUNDLE_REQUIREDEXECUTIONENVIRONMENT: &str = "Bundle-RequiredExecutionEnvironment";
pub const BUNDLE_NATIVECODE: &str = "Bundle-NativeCode";
pub const FRAGMENT_HOST: &str = "Fragment-Host";
pub const DYNAMICIMPORT_PACKAGE: &str = "DynamicImport-Package";

/// URL scheme used when handing out entry locators.
pub const ENTRY_URL_SCHEME: &str = "bundleentry";
