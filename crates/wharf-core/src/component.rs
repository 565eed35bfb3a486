//! Component model shared with the host application.
//!
//! A component is a plugin-like package the host syncs down as part of its
//! desired state. Only components carrying `package_info` are backed by a
//! downloadable archive; everything else is ignored by the manager.

use serde::{Deserialize, Serialize};

/// Entry point used when an installed package declares none.
pub const DEFAULT_MAIN: &str = "index.html";

/// URL scheme for component-local asset references.
pub const LOCAL_URL_SCHEME: &str = "sn";

/// A user-installable component as synced by the host application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    /// Opaque stable identifier, unique across the desired set.
    pub uuid: String,
    /// Marks the component for removal.
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub content: ComponentContent,
}

/// Rich component content. Absent fields default so a deleted component
/// that syncs with nothing but its uuid still deserializes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentContent {
    /// Display name; derives the download filename.
    #[serde(default)]
    pub name: String,
    /// Package metadata; absence means the component is not a
    /// package-backed extension and is skipped entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_info: Option<PackageInfo>,
    /// Set after a successful install; points into the Extensions root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_url: Option<String>,
    #[serde(default, rename = "autoupdateDisabled")]
    pub autoupdate_disabled: bool,
}

/// Package metadata for components backed by a downloadable archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Builds the install subpath (`Extensions/<identifier>`).
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Optional endpoint for version polling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// `package.json` found inside an extracted archive. The entry point is
/// nested under an `sn` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageDescriptor {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub sn: Option<SnSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnSection {
    #[serde(default)]
    pub main: Option<String>,
}

impl PackageDescriptor {
    /// Entry point declared by the package, if any.
    pub fn main(&self) -> Option<&str> {
        self.sn.as_ref().and_then(|sn| sn.main.as_deref())
    }
}

/// Payload returned by a component's `latest_url` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LatestPayload {
    pub version: String,
    #[serde(default)]
    pub download_url: Option<String>,
}
