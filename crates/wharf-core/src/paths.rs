//! Pure path derivation for component installs.
//!
//! Everything a component touches on disk lives under one `Extensions`
//! directory inside the host's user-data root. No function here touches
//! the filesystem.

use std::path::{Path, PathBuf};

use crate::component::Component;

/// Directory under the user-data root holding all component installs.
pub const EXTENSIONS_DIR: &str = "Extensions";

/// Subdirectory of [`EXTENSIONS_DIR`] holding downloaded archives.
pub const DOWNLOADS_DIR: &str = "downloads";

/// Durable id -> location record, stored inside [`EXTENSIONS_DIR`].
pub const MAPPING_FILE: &str = "mapping.json";

/// Handle on the host's user-data root directory.
#[derive(Debug, Clone)]
pub struct ExtensionsRoot {
    data_dir: PathBuf,
}

impl ExtensionsRoot {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The user-data root itself.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Absolute path of the Extensions directory.
    pub fn extensions_dir(&self) -> PathBuf {
        self.data_dir.join(EXTENSIONS_DIR)
    }

    /// Absolute path of the mapping file.
    pub fn mapping_file(&self) -> PathBuf {
        self.extensions_dir().join(MAPPING_FILE)
    }

    /// Resolve a location recorded relative to the user-data root.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.data_dir.join(relative)
    }

    /// Derive the three install paths for a component, or `None` when the
    /// component carries no package info.
    ///
    /// Pure and deterministic. Identifier sanitization is not performed
    /// here; the asset server enforces containment on the read side and
    /// [`is_managed_location`] guards the delete side.
    pub fn paths_for(&self, component: &Component) -> Option<ComponentPaths> {
        let info = component.content.package_info.as_ref()?;
        let relative_path = format!("{}/{}", EXTENSIONS_DIR, info.identifier);
        Some(ComponentPaths {
            download_path: self
                .extensions_dir()
                .join(DOWNLOADS_DIR)
                .join(format!("{}.zip", component.content.name)),
            absolute_path: self.data_dir.join(&relative_path),
            relative_path,
        })
    }
}

/// Derived install locations for one component.
#[derive(Debug, Clone)]
pub struct ComponentPaths {
    /// Where the downloaded archive is written.
    pub download_path: PathBuf,
    /// Install location relative to the user-data root (`Extensions/<id>`).
    pub relative_path: String,
    /// Absolute install location.
    pub absolute_path: PathBuf,
}

/// True when a recorded mapping location points at a directory the manager
/// owns: a relative path strictly inside the Extensions directory. A
/// mapping file tampered with to point elsewhere must never be deleted.
pub fn is_managed_location(location: &str) -> bool {
    use std::path::Component as Seg;

    let mut segments = Path::new(location).components();
    match segments.next() {
        Some(Seg::Normal(first)) if first.to_str() == Some(EXTENSIONS_DIR) => {}
        _ => return false,
    }

    let rest: Vec<_> = segments.collect();
    !rest.is_empty() && rest.iter().all(|seg| matches!(seg, Seg::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentContent, PackageInfo};

    fn component(identifier: &str, name: &str) -> Component {
        Component {
            uuid: "u".to_string(),
            deleted: false,
            content: ComponentContent {
                name: name.to_string(),
                package_info: Some(PackageInfo {
                    identifier: identifier.to_string(),
                    download_url: None,
                    latest_url: None,
                    version: None,
                }),
                local_url: None,
                autoupdate_disabled: false,
            },
        }
    }

    #[test]
    fn test_paths_are_confined_to_extensions_root() {
        let root = ExtensionsRoot::new("/data");
        let paths = root.paths_for(&component("ext-a", "Editor")).unwrap();

        assert_eq!(paths.relative_path, "Extensions/ext-a");
        assert_eq!(paths.absolute_path, PathBuf::from("/data/Extensions/ext-a"));
        assert!(paths.absolute_path.starts_with(root.extensions_dir()));
        assert_eq!(
            paths.download_path,
            PathBuf::from("/data/Extensions/downloads/Editor.zip")
        );
    }

    #[test]
    fn test_paths_for_requires_package_info() {
        let root = ExtensionsRoot::new("/data");
        let mut component = component("ext-a", "Editor");
        component.content.package_info = None;
        assert!(root.paths_for(&component).is_none());
    }

    #[test]
    fn test_mapping_file_location() {
        let root = ExtensionsRoot::new("/data");
        assert_eq!(
            root.mapping_file(),
            PathBuf::from("/data/Extensions/mapping.json")
        );
    }

    #[test]
    fn test_is_managed_location() {
        assert!(is_managed_location("Extensions/ext-a"));
        assert!(is_managed_location("Extensions/ext-a/nested"));

        // Never the Extensions directory itself, nor anything outside it.
        assert!(!is_managed_location("Extensions"));
        assert!(!is_managed_location(""));
        assert!(!is_managed_location("/etc/passwd"));
        assert!(!is_managed_location("Extensions/../secrets"));
        assert!(!is_managed_location("Documents/notes"));
    }
}
