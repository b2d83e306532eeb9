//! Module for searching for inputmapper profile files

use std::{
    collections::HashSet,
    fs::{self, DirEntry},
    path::{Path, PathBuf},
};

/// Base system fallback path to use if one cannot be found with XDG
const FALLBACK_BASE_PATH: &str = "/usr/share/inputmapper";

/// Directory for administrator supplied profiles that override shipped ones
const SYSTEM_PROFILES_PATH: &str = "/etc/inputmapper/profiles.d";

/// Returns the base path for configuration data
pub fn get_base_path() -> PathBuf {
    let Ok(base_dirs) = xdg::BaseDirectories::with_prefix("inputmapper") else {
        log::warn!("Unable to determine config base path. Using fallback path.");
        return PathBuf::from(FALLBACK_BASE_PATH);
    };

    // Get the data directories in preference order
    for dir in base_dirs.get_data_dirs() {
        if dir.exists() {
            return dir;
        }
    }

    log::warn!("Config base path not found. Using fallback path.");
    PathBuf::from(FALLBACK_BASE_PATH)
}

/// Returns a list of directories in load order to find profiles.
/// E.g. ["/etc/inputmapper/profiles.d", "/usr/share/inputmapper/profiles"]
pub fn get_profiles_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from(SYSTEM_PROFILES_PATH),
        get_base_path().join("profiles"),
    ]
}

/// Returns the YAML files found in the given directories sorted by file name.
/// When the same file name exists in more than one directory, only the one
/// from the earliest directory is returned.
pub fn get_profile_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut entries: Vec<DirEntry> = Vec::new();
    for path in paths {
        log::trace!("Checking {path:?} for profiles");
        let files = match fs::read_dir(path) {
            Ok(files) => files,
            Err(e) => {
                log::debug!("Unable to read directory: {path:?}: {e}");
                continue;
            }
        };
        for entry in files.flatten() {
            if !is_yaml(&entry.path()) {
                continue;
            }
            if seen.insert(entry.file_name()) {
                entries.push(entry);
            }
        }
    }

    entries.sort_by_key(|entry| entry.file_name());
    entries.into_iter().map(|entry| entry.path()).collect()
}

/// Find the profile file with the given name (without extension) in the
/// given directories.
pub fn find_profile_in(paths: &[PathBuf], name: &str) -> Option<PathBuf> {
    get_profile_files(paths)
        .into_iter()
        .find(|path| path.file_stem().is_some_and(|stem| stem == name))
}

/// Find the profile file with the given name in the default locations
pub fn find_profile(name: &str) -> Option<PathBuf> {
    find_profile_in(&get_profiles_paths(), name)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}
