//! A filesystem backed store of units
//!
//! The [`Registry`] provides a way to manage units stored in a directory of
//! markdown files. It is a wrapper around the filesystem agnostic
//! [`Forest`].

use std::{
    ffi::OsStr,
    fmt, io,
    path::{Path, PathBuf},
};

use nonempty::NonEmpty;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use walkdir::WalkDir;

use crate::{
    Unit,
    domain::{
        Config, Echelon, EchelonViolation, Forest, InsertError, RebuildError, RebuildOutcome,
        ReparentError, ReparentOutcome, Uic, UicError,
    },
    storage::unit_file::{LoadError, UnitFile, unit_path},
};

/// Name of the metadata directory under the registry root.
pub const META_DIR: &str = ".orbat";

/// State of a registry whose units have been read into memory.
#[derive(Debug, Clone)]
pub struct Loaded {
    forest: Forest,
    config: Config,
}

/// State of a registry that has not yet been read from disk.
#[derive(Debug, PartialEq, Eq)]
pub struct Unloaded;

/// A filesystem backed store of units.
///
/// Mutations are transactional at the directory level: the in-memory forest
/// is updated first, then every touched unit file is rewritten atomically. If
/// any file fails to persist, the forest is rolled back to its pre-operation
/// state and the error reports which paths failed.
#[derive(Debug)]
pub struct Registry<S> {
    /// The root of the directory units are stored in.
    root: PathBuf,
    state: S,
}

impl Registry<Unloaded> {
    /// Opens a registry at the given path.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self {
            root,
            state: Unloaded,
        }
    }

    /// Initialises a new registry root: creates the directory, the metadata
    /// directory, and a default config file (unless one already exists).
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created or the config
    /// file cannot be written.
    pub fn init(root: &Path) -> io::Result<Config> {
        std::fs::create_dir_all(root.join(META_DIR))?;

        let path = config_path(root);
        if path.exists() {
            return Config::load(&path).map_err(io::Error::other);
        }

        let config = Config::default();
        config.save(&path).map_err(io::Error::other)?;
        Ok(config)
    }

    /// Load all units from disk
    ///
    /// # Errors
    ///
    /// This method has different behaviour depending on the configuration
    /// file in the registry root. If `allow_unrecognised` is `true`, then any
    /// files with names that are not valid UICs, or any files that cannot be
    /// parsed as units, are skipped. If `allow_unrecognised` is `false` (the
    /// default), then any unrecognised or invalid markdown files in the
    /// directory will return an error.
    ///
    /// Also fails if two files declare the same UIC, if a unit names a parent
    /// that does not exist, or if the parent pointers contain a cycle.
    pub fn load_all(self) -> Result<Registry<Loaded>, RegistryLoadError> {
        let config = load_config(&self.root);
        let md_paths = collect_markdown_paths(&self.root);

        let (units, unrecognised_paths): (Vec<_>, Vec<_>) = md_paths
            .par_iter()
            .map(|path| try_load_unit(path))
            .partition(Result::is_ok);

        let units: Vec<_> = units.into_iter().map(Result::unwrap).collect();
        let unrecognised_paths: Vec<_> = unrecognised_paths
            .into_iter()
            .map(Result::unwrap_err)
            .collect();

        if !config.allow_unrecognised && !unrecognised_paths.is_empty() {
            return Err(RegistryLoadError::UnrecognisedFiles(unrecognised_paths));
        }

        let mut forest = Forest::with_capacity(units.len());
        for unit in units {
            forest.insert_detached(unit).map_err(|e| match e {
                InsertError::Duplicate(uic) | InsertError::ParentNotFound(uic) => {
                    RegistryLoadError::Duplicate(uic)
                }
            })?;
        }
        forest.resolve()?;

        Ok(Registry {
            root: self.root,
            state: Loaded { forest, config },
        })
    }
}

/// Errors that can occur when loading a registry from disk.
#[derive(Debug, thiserror::Error)]
pub enum RegistryLoadError {
    /// Markdown files that could not be parsed as units.
    UnrecognisedFiles(Vec<PathBuf>),
    /// Two files declared the same UIC.
    Duplicate(Uic),
    /// The parent pointers on disk are inconsistent.
    Rebuild(#[from] RebuildError),
}

impl fmt::Display for RegistryLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognisedFiles(paths) => {
                write!(f, "Unrecognised files: ")?;
                for (i, path) in paths.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", path.display())?;
                }
                Ok(())
            }
            Self::Duplicate(uic) => write!(f, "duplicate unit file for {uic}"),
            Self::Rebuild(e) => write!(f, "{e}"),
        }
    }
}

fn config_path(root: &Path) -> PathBuf {
    root.join(META_DIR).join("config.toml")
}

fn load_config(root: &Path) -> Config {
    Config::load(&config_path(root)).unwrap_or_else(|e| {
        tracing::debug!("Failed to load config: {e}");
        Config::default()
    })
}

fn collect_markdown_paths(root: &PathBuf) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            // Skip the metadata directory
            !entry.path().components().any(|c| c.as_os_str() == META_DIR)
        })
        .filter(|entry| entry.path().extension() == Some(OsStr::new("md")))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn try_load_unit(path: &Path) -> Result<Unit, PathBuf> {
    match UnitFile::load_from_path(path) {
        Ok(file) => Ok(file.into()),
        Err(e) => {
            tracing::debug!("Failed to load unit from {}: {:?}", path.display(), e);
            Err(path.to_path_buf())
        }
    }
}

impl Registry<Loaded> {
    /// The loaded unit forest.
    #[must_use]
    pub const fn forest(&self) -> &Forest {
        &self.state.forest
    }

    /// The registry's configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.state.config
    }

    /// The registry root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Add a new unit to the registry.
    ///
    /// The unit is inserted into the forest (which validates the UIC is new
    /// and the parent exists) and its file is written, along with the files
    /// of every ancestor whose `as_of` stamp advanced.
    ///
    /// # Errors
    ///
    /// This method can fail if:
    ///
    /// - a unit with the same UIC already exists
    /// - the named parent cannot be found
    /// - the configured echelon ordering forbids the pairing
    /// - the unit files cannot be written to
    pub fn add_unit(
        &mut self,
        uic: Uic,
        name: String,
        echelon: Echelon,
        parent: Option<Uic>,
        notes: String,
    ) -> Result<Unit, AddUnitError> {
        let mut unit = Unit::new(uic, name, echelon).with_notes(notes);
        if let Some(parent) = parent {
            self.check_echelon_order(unit.uic(), unit.echelon(), &parent)
                .map_err(AddUnitError::EchelonOrder)?;
            unit = unit.with_parent(parent);
        }

        let checkpoint = self.state.forest.clone();
        let outcome = self.state.forest.insert(unit.clone())?;
        self.commit(checkpoint, &outcome.touched)?;

        tracing::info!("Added unit: {}", outcome.uic);

        unit.as_of = outcome.as_of;
        Ok(unit)
    }

    /// Add a new task force to the registry, generating its UIC.
    ///
    /// The serial is one past the highest serial among existing generated
    /// task-force UICs, starting from 1.
    ///
    /// # Errors
    ///
    /// This method can fail if:
    ///
    /// - the serial space is exhausted for the configured digit width
    /// - the named parent cannot be found
    /// - the unit files cannot be written to
    pub fn add_task_force(
        &mut self,
        name: String,
        parent: Option<Uic>,
        notes: String,
    ) -> Result<Unit, AddTaskForceError> {
        let next_serial = self
            .state
            .forest
            .iter()
            .filter_map(|unit| unit.uic().task_force_serial())
            .max()
            .map_or(1, |serial| serial + 1);

        let uic = Uic::task_force(next_serial, self.state.config.task_force_digits())?;
        let unit = self.add_unit(uic, name, Echelon::TaskForce, parent, notes)?;
        Ok(unit)
    }

    /// Move a unit under a new parent (or detach it to a root).
    ///
    /// The forest applies the move and restores closure consistency; every
    /// unit whose state changed (the moved subtree plus the old and new
    /// ancestor chains) is then rewritten to disk. If `expected_as_of` is
    /// given, the move is rejected when the unit has been updated since the
    /// caller read it.
    ///
    /// # Errors
    ///
    /// This method can fail if:
    ///
    /// - either the unit or the new parent cannot be found
    /// - the move would create a cycle
    /// - the configured echelon ordering forbids the pairing
    /// - the unit's `as_of` no longer matches `expected_as_of`
    /// - the unit files cannot be written to
    ///
    /// On error, neither the forest nor the files are modified. Persistence
    /// failures are not fail-fast: every touched file is attempted, then the
    /// forest is rolled back, the touched files are rewritten from the
    /// restored state, and the error is returned.
    pub fn reparent_unit(
        &mut self,
        uic: &Uic,
        new_parent: Option<&Uic>,
        expected_as_of: Option<u64>,
    ) -> Result<ReparentOutcome, ReparentUnitError> {
        if let Some(parent) = new_parent {
            // A missing unit falls through to the forest's own lookup error.
            if let Some(unit) = self.state.forest.find(uic) {
                self.check_echelon_order(uic, unit.echelon(), parent)
                    .map_err(ReparentUnitError::EchelonOrder)?;
            }
        }

        let checkpoint = self.state.forest.clone();
        let outcome = self.state.forest.reparent(uic, new_parent, expected_as_of)?;
        self.commit(checkpoint, &outcome.touched)?;

        Ok(outcome)
    }

    /// Recompute every closure from the serialized parent pointers and
    /// persist any corrections.
    ///
    /// # Errors
    ///
    /// This method can fail if the parent pointers are inconsistent (dangling
    /// or cyclic), or if the corrected unit files cannot be written to. On
    /// error the forest is rolled back.
    pub fn rebuild(&mut self) -> Result<RebuildOutcome, RebuildUnitsError> {
        let checkpoint = self.state.forest.clone();
        let outcome = self.state.forest.rebuild()?;
        self.commit(checkpoint, &outcome.changed)?;

        Ok(outcome)
    }

    /// Rejects a prospective child/parent pairing when the configuration
    /// enforces echelon ordering and the child's ranked echelon is not
    /// strictly below the parent's.
    ///
    /// Missing parents pass; the forest reports those itself.
    fn check_echelon_order(
        &self,
        child: &Uic,
        child_echelon: Echelon,
        parent: &Uic,
    ) -> Result<(), EchelonViolation> {
        if !self.state.config.enforce_echelon_order {
            return Ok(());
        }
        let Some(parent_unit) = self.state.forest.find(parent) else {
            return Ok(());
        };
        if child_echelon.may_subordinate_to(parent_unit.echelon()) {
            Ok(())
        } else {
            Err(EchelonViolation {
                child: child.clone(),
                child_echelon,
                parent: parent.clone(),
                parent_echelon: parent_unit.echelon(),
            })
        }
    }

    /// Persists a mutation's touched files, or rolls the mutation back.
    ///
    /// If any file fails to write, the forest is restored to the checkpoint
    /// and the touched files are rewritten from the restored state (files of
    /// units the checkpoint does not contain are removed), so a later reload
    /// does not observe the abandoned mutation. The restoration is
    /// best-effort; its own failures are reported alongside the originals.
    fn commit(&mut self, checkpoint: Forest, touched: &[Uic]) -> Result<(), PersistError> {
        let Err(mut error) = self.persist(touched) else {
            return Ok(());
        };
        self.state.forest = checkpoint;
        error.push_all(self.restore_files(touched));
        Err(error)
    }

    /// Rewrites the given units' files from the in-memory forest, removing
    /// the files of units the forest does not contain. Returns the paths that
    /// could not be restored.
    fn restore_files(&self, uics: &[Uic]) -> Vec<(PathBuf, io::Error)> {
        uics.iter()
            .filter_map(|uic| {
                let path = unit_path(&self.root, uic);
                let result = match self.state.forest.find(uic) {
                    Some(unit) => UnitFile::from(unit).save(&self.root),
                    None => match std::fs::remove_file(&path) {
                        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                        _ => Ok(()),
                    },
                };
                result.err().map(|e| (path, e))
            })
            .collect()
    }

    /// Rewrites the files of the given units.
    ///
    /// Does not fail fast: every file is attempted before failures are
    /// reported.
    fn persist(&self, uics: &[Uic]) -> Result<(), PersistError> {
        let failures: Vec<_> = uics
            .iter()
            .filter_map(|uic| {
                let unit = self.state.forest.find(uic)?;
                UnitFile::from(unit)
                    .save(&self.root)
                    .err()
                    .map(|e| (unit_path(&self.root, uic), e))
            })
            .collect();

        NonEmpty::from_vec(failures).map_or(Ok(()), |failures| Err(PersistError { failures }))
    }

    /// Loads a single unit directly from its file, bypassing the forest.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be found or parsed.
    pub fn load_unit(&self, uic: &Uic) -> Result<Unit, LoadError> {
        UnitFile::load(&self.root, uic).map(Unit::from)
    }
}

/// Errors that can occur when adding a unit.
#[derive(Debug, thiserror::Error)]
#[error("failed to add unit: {0}")]
pub enum AddUnitError {
    /// The forest rejected the unit.
    Insert(#[from] InsertError),
    /// The configured echelon ordering forbids the pairing.
    EchelonOrder(EchelonViolation),
    /// The unit files could not be written.
    Persist(#[from] PersistError),
}

/// Errors that can occur when adding a task force.
#[derive(Debug, thiserror::Error)]
#[error("failed to add task force: {0}")]
pub enum AddTaskForceError {
    /// A UIC could not be generated at the configured digit width.
    Uic(#[from] UicError),
    /// The generated unit could not be added.
    Add(#[from] AddUnitError),
}

/// Errors that can occur when moving a unit.
#[derive(Debug, thiserror::Error)]
#[error("failed to move unit: {0}")]
pub enum ReparentUnitError {
    /// The forest rejected the move.
    Reparent(#[from] ReparentError),
    /// The configured echelon ordering forbids the pairing.
    EchelonOrder(EchelonViolation),
    /// The unit files could not be written.
    Persist(#[from] PersistError),
}

/// Errors that can occur when rebuilding the registry's closures.
#[derive(Debug, thiserror::Error)]
#[error("failed to rebuild: {0}")]
pub enum RebuildUnitsError {
    /// The parent pointers are inconsistent.
    Rebuild(#[from] RebuildError),
    /// The corrected unit files could not be written.
    Persist(#[from] PersistError),
}

/// One or more unit files failed to save.
#[derive(Debug, thiserror::Error)]
pub struct PersistError {
    failures: NonEmpty<(PathBuf, io::Error)>,
}

impl PersistError {
    fn push_all(&mut self, failures: Vec<(PathBuf, io::Error)>) {
        for failure in failures {
            self.failures.push(failure);
        }
    }
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MAX_DISPLAY: usize = 5;

        write!(f, "failed to save unit files: ")?;

        let total = self.failures.len();

        let displayed_paths: Vec<String> = self
            .failures
            .iter()
            .take(MAX_DISPLAY)
            .map(|(p, _e)| p.display().to_string())
            .collect();

        let msg = displayed_paths.join(", ");

        if total <= MAX_DISPLAY {
            write!(f, "{msg}")
        } else {
            write!(f, "{msg}... (and {} more)", total - MAX_DISPLAY)
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn uic(s: &str) -> Uic {
        Uic::new(s.to_string()).unwrap()
    }

    fn setup_temp_registry() -> (TempDir, Registry<Loaded>) {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let path = tmp.path().to_path_buf();
        (tmp, Registry::new(path).load_all().unwrap())
    }

    fn add(
        registry: &mut Registry<Loaded>,
        code: &str,
        echelon: Echelon,
        parent: Option<&str>,
    ) -> Unit {
        registry
            .add_unit(
                uic(code),
                format!("Unit {code}"),
                echelon,
                parent.map(uic),
                String::new(),
            )
            .unwrap()
    }

    #[test]
    fn can_add_unit() {
        let (_tmp, mut registry) = setup_temp_registry();
        let unit = add(&mut registry, "WBDE01", Echelon::Brigade, None);

        assert_eq!(unit.uic(), &uic("WBDE01"));

        let loaded = registry.load_unit(unit.uic()).unwrap();
        assert_eq!(loaded, unit);
    }

    #[test]
    fn add_rejects_duplicate_uic() {
        let (_tmp, mut registry) = setup_temp_registry();
        add(&mut registry, "WBDE01", Echelon::Brigade, None);

        let err = registry
            .add_unit(
                uic("WBDE01"),
                "Again".to_string(),
                Echelon::Brigade,
                None,
                String::new(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            AddUnitError::Insert(InsertError::Duplicate(_))
        ));
    }

    #[test]
    fn add_rejects_missing_parent() {
        let (_tmp, mut registry) = setup_temp_registry();
        let err = registry
            .add_unit(
                uic("WBN001"),
                "Orphan".to_string(),
                Echelon::Battalion,
                Some(uic("WZZ999")),
                String::new(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            AddUnitError::Insert(InsertError::ParentNotFound(_))
        ));
        assert!(registry.forest().is_empty());
    }

    #[test]
    fn task_force_uics_increment() {
        let (_tmp, mut registry) = setup_temp_registry();
        add(&mut registry, "WBDE01", Echelon::Brigade, None);

        let tf1 = registry
            .add_task_force("TF Spartan".to_string(), Some(uic("WBDE01")), String::new())
            .unwrap();
        let tf2 = registry
            .add_task_force("TF Falcon".to_string(), Some(uic("WBDE01")), String::new())
            .unwrap();

        assert_eq!(tf1.uic().to_string(), "TF0001");
        assert_eq!(tf2.uic().to_string(), "TF0002");
        assert_eq!(tf1.echelon(), Echelon::TaskForce);
    }

    #[test]
    fn reparent_persists_pointer_and_stamps() {
        let (_tmp, mut registry) = setup_temp_registry();
        add(&mut registry, "WBDE01", Echelon::Brigade, None);
        add(&mut registry, "WBDE02", Echelon::Brigade, None);
        add(&mut registry, "WBN001", Echelon::Battalion, Some("WBDE01"));

        let outcome = registry
            .reparent_unit(&uic("WBN001"), Some(&uic("WBDE02")), None)
            .unwrap();

        // The pointer and the new stamp survive a reload from disk.
        let reloaded = registry.load_unit(&uic("WBN001")).unwrap();
        assert_eq!(reloaded.parent(), Some(&uic("WBDE02")));
        assert_eq!(reloaded.as_of(), outcome.as_of);

        // Old and new parents were rewritten too.
        for parent in ["WBDE01", "WBDE02"] {
            assert_eq!(registry.load_unit(&uic(parent)).unwrap().as_of(), outcome.as_of);
        }
    }

    #[test]
    fn rejected_reparent_leaves_disk_untouched() {
        let (_tmp, mut registry) = setup_temp_registry();
        add(&mut registry, "WBDE01", Echelon::Brigade, None);
        add(&mut registry, "WBN001", Echelon::Battalion, Some("WBDE01"));

        let before = std::fs::read_to_string(unit_path(registry.root(), &uic("WBDE01"))).unwrap();

        let err = registry
            .reparent_unit(&uic("WBDE01"), Some(&uic("WBN001")), None)
            .unwrap_err();
        assert!(matches!(
            err,
            ReparentUnitError::Reparent(ReparentError::Cycle { .. })
        ));

        let after = std::fs::read_to_string(unit_path(registry.root(), &uic("WBDE01"))).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn failed_persist_restores_files_from_checkpoint() {
        let (_tmp, mut registry) = setup_temp_registry();
        add(&mut registry, "WBDE01", Echelon::Brigade, None);
        add(&mut registry, "WBDE02", Echelon::Brigade, None);
        let before = add(&mut registry, "WBN001", Echelon::Battalion, Some("WBDE01"));

        // Block the old parent's file with a directory so its rewrite fails.
        let blocked = unit_path(registry.root(), &uic("WBDE01"));
        std::fs::remove_file(&blocked).unwrap();
        std::fs::create_dir(&blocked).unwrap();

        let err = registry
            .reparent_unit(&uic("WBN001"), Some(&uic("WBDE02")), None)
            .unwrap_err();
        assert!(matches!(err, ReparentUnitError::Persist(_)));

        // The forest rolled back.
        assert_eq!(
            registry.forest().ancestors_of(&uic("WBN001")).unwrap(),
            vec![uic("WBDE01")]
        );

        // The moved unit's file was rewritten from the checkpoint, so a
        // reload does not apply the abandoned move.
        let reloaded = registry.load_unit(&uic("WBN001")).unwrap();
        assert_eq!(reloaded.parent(), Some(&uic("WBDE01")));
        assert_eq!(reloaded.as_of(), before.as_of());
    }

    #[test]
    fn failed_persist_removes_partially_added_unit_file() {
        let (_tmp, mut registry) = setup_temp_registry();
        add(&mut registry, "WBDE01", Echelon::Brigade, None);

        let blocked = unit_path(registry.root(), &uic("WBDE01"));
        std::fs::remove_file(&blocked).unwrap();
        std::fs::create_dir(&blocked).unwrap();

        let err = registry
            .add_unit(
                uic("WBN001"),
                "Orphaned write".to_string(),
                Echelon::Battalion,
                Some(uic("WBDE01")),
                String::new(),
            )
            .unwrap_err();
        assert!(matches!(err, AddUnitError::Persist(_)));

        assert!(registry.forest().find(&uic("WBN001")).is_none());
        assert!(!unit_path(registry.root(), &uic("WBN001")).exists());
    }

    #[test]
    fn stale_as_of_is_rejected_through_the_registry() {
        let (_tmp, mut registry) = setup_temp_registry();
        add(&mut registry, "WBDE01", Echelon::Brigade, None);
        add(&mut registry, "WBDE02", Echelon::Brigade, None);
        let read = add(&mut registry, "WBN001", Echelon::Battalion, Some("WBDE01"));

        registry
            .reparent_unit(&uic("WBN001"), Some(&uic("WBDE02")), None)
            .unwrap();

        let err = registry
            .reparent_unit(&uic("WBN001"), Some(&uic("WBDE01")), Some(read.as_of()))
            .unwrap_err();
        assert!(matches!(
            err,
            ReparentUnitError::Reparent(ReparentError::VersionConflict { .. })
        ));
    }

    #[test]
    fn load_all_reads_all_saved_units() {
        let (tmp, mut registry) = setup_temp_registry();
        add(&mut registry, "WBDE01", Echelon::Brigade, None);
        add(&mut registry, "WBN001", Echelon::Battalion, Some("WBDE01"));
        add(&mut registry, "WCO001", Echelon::Company, Some("WBN001"));

        let reloaded = Registry::new(tmp.path().to_path_buf()).load_all().unwrap();

        assert_eq!(reloaded.forest().len(), 3);
        assert_eq!(
            reloaded.forest().ancestors_of(&uic("WCO001")).unwrap(),
            vec![uic("WBN001"), uic("WBDE01")]
        );
        assert!(reloaded.forest().verify_closure().is_empty());
    }

    #[test]
    fn unrecognised_files_rejected_by_default() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("notes.md"), "just some notes").unwrap();

        let err = Registry::new(tmp.path().to_path_buf())
            .load_all()
            .unwrap_err();
        assert!(matches!(err, RegistryLoadError::UnrecognisedFiles(_)));
    }

    #[test]
    fn unrecognised_files_skipped_when_allowed() {
        let tmp = TempDir::new().unwrap();
        Registry::init(tmp.path()).unwrap();
        let mut config = Config::default();
        config.allow_unrecognised = true;
        config.save(&config_path(tmp.path())).unwrap();
        std::fs::write(tmp.path().join("notes.md"), "just some notes").unwrap();

        let registry = Registry::new(tmp.path().to_path_buf()).load_all().unwrap();
        assert!(registry.forest().is_empty());
        assert!(registry.config().allow_unrecognised);
    }

    #[test]
    fn load_all_rejects_dangling_parent() {
        let (tmp, mut registry) = setup_temp_registry();
        add(&mut registry, "WBDE01", Echelon::Brigade, None);
        add(&mut registry, "WBN001", Echelon::Battalion, Some("WBDE01"));

        // Remove the parent's file out from under the registry.
        std::fs::remove_file(unit_path(tmp.path(), &uic("WBDE01"))).unwrap();

        let err = Registry::new(tmp.path().to_path_buf())
            .load_all()
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryLoadError::Rebuild(RebuildError::UnknownParent { .. })
        ));
    }

    #[test]
    fn init_creates_config_once() {
        let tmp = TempDir::new().unwrap();
        let first = Registry::init(tmp.path()).unwrap();
        assert_eq!(first, Config::default());

        let mut config = Config::default();
        config.enforce_echelon_order = true;
        config.save(&config_path(tmp.path())).unwrap();

        // A second init leaves the existing config in place.
        let second = Registry::init(tmp.path()).unwrap();
        assert!(second.enforce_echelon_order);
    }

    #[test]
    fn enforced_echelon_order_rejects_inverted_pairing() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        std::fs::create_dir_all(root.join(META_DIR)).unwrap();
        std::fs::write(
            config_path(&root),
            "_version = \"1\"\nenforce_echelon_order = true\n",
        )
        .unwrap();

        let mut registry = Registry::new(root).load_all().unwrap();
        add(&mut registry, "WCO001", Echelon::Company, None);

        let err = registry
            .add_unit(
                uic("WBDE01"),
                "Backwards".to_string(),
                Echelon::Brigade,
                Some(uic("WCO001")),
                String::new(),
            )
            .unwrap_err();
        assert!(matches!(err, AddUnitError::EchelonOrder(_)));

        // Task forces sit outside the ordering and are exempt.
        registry
            .add_task_force("TF Anvil".to_string(), Some(uic("WCO001")), String::new())
            .unwrap();

        // Moves are checked as well.
        add(&mut registry, "WBN001", Echelon::Battalion, None);
        let err = registry
            .reparent_unit(&uic("WBN001"), Some(&uic("WCO001")), None)
            .unwrap_err();
        assert!(matches!(err, ReparentUnitError::EchelonOrder(_)));
    }
}
