pub mod registry;
/// Markdown serialization for units.
pub mod unit_file;

pub use registry::{
    AddTaskForceError, AddUnitError, Loaded, META_DIR, PersistError, RebuildUnitsError, Registry,
    RegistryLoadError, ReparentUnitError, Unloaded,
};
pub use unit_file::{LoadError, UnitFile, unit_path};
