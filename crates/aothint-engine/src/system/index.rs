//! Classpath package index
//!
//! Built once when a [`super::TypeSystem`] is created: every directory and
//! archive on the classpath is listed a single time and each package is
//! mapped to the locations that contain it, in classpath order. Lookups then
//! touch only the locations that can hold the requested name.
//!
//! Archives stay open for the lifetime of the index; each handle sits behind
//! its own lock because reading an entry needs `&mut ZipArchive`.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::TypeError;
use crate::names::package_of;

const CLASS_SUFFIX: &str = ".class";

/// Upper bound on the buffer reserved from an archive entry's declared size
const MAX_PREALLOCATION: usize = 1 << 20;

/// One classpath entry
enum Location {
    Directory {
        root: PathBuf,
        class_names: Vec<String>,
    },
    Archive {
        path: PathBuf,
        archive: Mutex<ZipArchive<File>>,
        class_names: Vec<String>,
    },
}

impl Location {
    /// Open an application location and list its units
    fn open(path: &Path) -> Result<Self, TypeError> {
        Self::open_with(path, true)
    }

    /// Open a system location that is only searched by exact path
    fn open_unlisted(path: &Path) -> Result<Self, TypeError> {
        Self::open_with(path, false)
    }

    fn open_with(path: &Path, listed: bool) -> Result<Self, TypeError> {
        if path.is_dir() {
            let class_names = if listed { list_directory(path)? } else { Vec::new() };
            Ok(Self::Directory {
                root: path.to_path_buf(),
                class_names,
            })
        } else {
            let file = File::open(path).map_err(|e| storage(path, e))?;
            let mut archive = ZipArchive::new(file).map_err(|e| storage(path, e))?;
            let class_names = if listed {
                list_archive(&mut archive, path)?
            } else {
                Vec::new()
            };
            Ok(Self::Archive {
                path: path.to_path_buf(),
                archive: Mutex::new(archive),
                class_names,
            })
        }
    }

    fn class_names(&self) -> &[String] {
        match self {
            Self::Directory { class_names, .. } | Self::Archive { class_names, .. } => class_names,
        }
    }

    fn path(&self) -> &Path {
        match self {
            Self::Directory { root, .. } => root,
            Self::Archive { path, .. } => path,
        }
    }

    /// Bytes of `name`'s class file, if this location has it
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, TypeError> {
        let relative = format!("{name}{CLASS_SUFFIX}");
        match self {
            Self::Directory { root, .. } => {
                let file = root.join(&relative);
                if !file.is_file() {
                    return Ok(None);
                }
                fs::read(&file).map(Some).map_err(|e| storage(&file, e))
            }
            Self::Archive { path, archive, .. } => {
                let mut archive = archive.lock();
                let mut entry = match archive.by_name(&relative) {
                    Ok(entry) => entry,
                    Err(ZipError::FileNotFound) => return Ok(None),
                    Err(e) => return Err(storage(path, e)),
                };
                let mut bytes = Vec::with_capacity(preallocation(entry.size()));
                entry.read_to_end(&mut bytes).map_err(|e| storage(path, e))?;
                Ok(Some(bytes))
            }
        }
    }
}

/// Buffer size to reserve for an entry whose header declares `declared`
/// bytes; the header is untrusted, so the reservation is capped
fn preallocation(declared: u64) -> usize {
    usize::try_from(declared).map_or(MAX_PREALLOCATION, |size| size.min(MAX_PREALLOCATION))
}

fn storage(path: &Path, error: impl std::fmt::Display) -> TypeError {
    TypeError::Storage {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}

fn is_indexable(name: &str) -> bool {
    !name.starts_with("META-INF/") && !name.ends_with("module-info")
}

fn list_directory(root: &Path) -> Result<Vec<String>, TypeError> {
    let mut names = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| storage(&dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| storage(&dir, e))?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if let Some(name) = relative.strip_suffix(CLASS_SUFFIX) {
                if is_indexable(name) {
                    names.push(name.to_string());
                }
            }
        }
    }
    names.sort();
    Ok(names)
}

fn list_archive(archive: &mut ZipArchive<File>, path: &Path) -> Result<Vec<String>, TypeError> {
    let mut names = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(|e| storage(path, e))?;
        if let Some(name) = entry.name().strip_suffix(CLASS_SUFFIX) {
            if is_indexable(name) {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

/// Package to location mapping over the application classpath, plus
/// unindexed fallback locations searched by exact path
#[derive(Default)]
pub(crate) struct PackageIndex {
    locations: Vec<Location>,
    packages: FxHashMap<String, Vec<usize>>,
    fallback: Vec<Location>,
}

impl PackageIndex {
    /// Index `classpath` and open `system_locations` without listing them
    ///
    /// Entries that cannot be read are skipped with a warning; they do not
    /// prevent the rest of the classpath from being indexed.
    pub(crate) fn build(classpath: &[PathBuf], system_locations: &[PathBuf]) -> Self {
        let mut index = Self::default();
        for path in classpath {
            match Location::open(path) {
                Ok(location) => index.add(location),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping classpath entry"),
            }
        }
        for path in system_locations {
            match Location::open_unlisted(path) {
                Ok(location) => index.fallback.push(location),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping system location"),
            }
        }
        debug!(
            locations = index.locations.len(),
            packages = index.packages.len(),
            fallback = index.fallback.len(),
            "indexed classpath"
        );
        index
    }

    fn add(&mut self, location: Location) {
        let slot = self.locations.len();
        let mut seen = FxHashSet::default();
        for name in location.class_names() {
            let package = package_of(name);
            if seen.insert(package) {
                self.packages.entry(package.to_string()).or_default().push(slot);
            }
        }
        self.locations.push(location);
    }

    /// Number of indexed application locations
    pub(crate) fn location_count(&self) -> usize {
        self.locations.len()
    }

    /// Read the class file for an internal name
    ///
    /// Locations indexed for the name's package are tried in classpath
    /// order, then the fallback locations.
    pub(crate) fn read(&self, name: &str) -> Result<Option<Vec<u8>>, TypeError> {
        if let Some(slots) = self.packages.get(package_of(name)) {
            for &slot in slots {
                if let Some(bytes) = self.locations[slot].read(name)? {
                    return Ok(Some(bytes));
                }
            }
        }
        for location in &self.fallback {
            if let Some(bytes) = location.read(name)? {
                debug!(name, location = %location.path().display(), "found in system location");
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }

    /// Every unit name in the application locations, first occurrence wins
    pub(crate) fn class_names(&self) -> Vec<String> {
        let mut seen = FxHashSet::default();
        self.locations
            .iter()
            .flat_map(Location::class_names)
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect()
    }
}
