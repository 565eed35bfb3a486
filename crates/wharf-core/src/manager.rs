//! Component lifecycle manager.
//!
//! Maps the host's desired component set to filesystem actions: install,
//! update-check, skip or uninstall. Install locations are recorded in the
//! mapping store so components can be removed later when only their uuid
//! is left, and every install attempt is reported back to the host.

use semver::Version;
use tracing::{debug, info, warn};

use crate::component::{Component, LatestPayload, DEFAULT_MAIN, LOCAL_URL_SCHEME};
use crate::error::InstallError;
use crate::events::{self, HostEvent, HostEventReceiver, HostEventSender, HostRequest};
use crate::mapping::MappingStore;
use crate::paths::{is_managed_location, ComponentPaths, ExtensionsRoot};
use crate::pipeline;

pub struct ComponentManager {
    root: ExtensionsRoot,
    client: reqwest::Client,
    mapping: MappingStore,
    events: HostEventSender,
}

impl ComponentManager {
    pub fn new(root: ExtensionsRoot) -> Self {
        let mapping = MappingStore::new(root.mapping_file());
        Self::with_mapping(root, mapping)
    }

    /// Construct with an externally built mapping store (custom debounce).
    pub fn with_mapping(root: ExtensionsRoot, mapping: MappingStore) -> Self {
        Self {
            root,
            client: reqwest::Client::new(),
            mapping,
            events: events::channel().0,
        }
    }

    /// Mapping store shared with this manager.
    pub fn mapping(&self) -> &MappingStore {
        &self.mapping
    }

    /// Subscribe to host notifications.
    pub fn subscribe(&self) -> HostEventReceiver {
        self.events.subscribe()
    }

    /// Dispatch one inbound host request. Fire-and-forget; outcomes reach
    /// the host through the notification channel.
    pub async fn handle(&self, request: HostRequest) {
        match request {
            HostRequest::InstallComponent(component) => {
                let _ = self.install(component).await;
            }
            HostRequest::SyncComponents(components) => self.sync(components).await,
        }
    }

    /// Reconcile the full desired component set. Every component is
    /// handled concurrently and independently; one component's failure
    /// never blocks or rolls back a sibling's reconciliation.
    pub async fn sync(&self, components: Vec<Component>) {
        info!(count = components.len(), "Syncing components");

        let tasks = components
            .into_iter()
            .map(|component| self.reconcile(component));
        futures::future::join_all(tasks).await;
    }

    async fn reconcile(&self, component: Component) {
        if component.deleted {
            self.uninstall(&component).await;
            return;
        }
        let Some(paths) = self.root.paths_for(&component) else {
            debug!(uuid = %component.uuid, "No package info, skipping");
            return;
        };

        let exists = tokio::fs::try_exists(&paths.absolute_path)
            .await
            .unwrap_or(false);
        if !exists || component.content.local_url.is_none() {
            let _ = self.install(component).await;
        } else if !component.content.autoupdate_disabled {
            self.check_for_update(component).await;
        } else {
            debug!(name = %component.content.name, "Already installed, auto-update disabled");
        }
    }

    /// Install one component: download, extract, normalize, record.
    ///
    /// Resolves immediately when the component has no download URL. Every
    /// attempt that proceeds notifies the host exactly once, success or
    /// failure, carrying either the updated component or the failure tag.
    pub async fn install(&self, component: Component) -> Result<Component, InstallError> {
        let Some(paths) = self.root.paths_for(&component) else {
            return Ok(component);
        };
        let Some(download_url) = component
            .content
            .package_info
            .as_ref()
            .and_then(|info| info.download_url.clone())
        else {
            debug!(uuid = %component.uuid, "No download URL, skipping install");
            return Ok(component);
        };

        info!(name = %component.content.name, url = %download_url, "Installing component");
        let outcome = self
            .run_pipeline(component.clone(), &paths, &download_url)
            .await;

        let event = match &outcome {
            Ok(updated) => HostEvent::InstallComponentComplete {
                component: updated.clone(),
                error: None,
            },
            Err(tag) => HostEvent::InstallComponentComplete {
                component,
                error: Some(*tag),
            },
        };
        let _ = self.events.send(event);
        outcome
    }

    async fn run_pipeline(
        &self,
        mut component: Component,
        paths: &ComponentPaths,
        download_url: &str,
    ) -> Result<Component, InstallError> {
        if let Err(e) = pipeline::download(&self.client, download_url, &paths.download_path).await {
            warn!(name = %component.content.name, error = %e, "Component download failed");
            return Err(InstallError::Downloading);
        }

        // Clear any previous install so updates start from a clean
        // directory. Best effort: extraction overwrites what remains.
        match tokio::fs::remove_dir_all(&paths.absolute_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %paths.absolute_path.display(), error = %e, "Failed to clear previous install")
            }
        }

        if let Err(e) = pipeline::extract(&paths.download_path, &paths.absolute_path).await {
            warn!(name = %component.content.name, error = %e, "Component archive extraction failed");
            return Err(InstallError::Unzipping);
        }

        if let Err(e) = pipeline::unnest(&paths.absolute_path).await {
            warn!(path = %paths.absolute_path.display(), error = %e, "Failed to unnest archive contents");
        }

        let descriptor = pipeline::read_descriptor(&paths.absolute_path).await;
        let main = descriptor
            .as_ref()
            .and_then(|d| d.main())
            .unwrap_or(DEFAULT_MAIN);
        if let Some(version) = descriptor.as_ref().and_then(|d| d.version.clone()) {
            if let Some(info) = component.content.package_info.as_mut() {
                info.version = Some(version);
            }
        }
        component.content.local_url = Some(format!(
            "{}://{}/{}",
            LOCAL_URL_SCHEME, paths.relative_path, main
        ));

        self.mapping
            .record(&component.uuid, &paths.relative_path)
            .await;
        info!(name = %component.content.name, location = %paths.relative_path, "Component installed");
        Ok(component)
    }

    /// Poll the component's latest-version endpoint and reinstall when a
    /// strictly newer version is available. Best effort: missing
    /// endpoints, non-success responses and unparseable versions all
    /// resolve as "nothing to do", never as errors.
    pub async fn check_for_update(&self, mut component: Component) {
        let Some(latest_url) = component
            .content
            .package_info
            .as_ref()
            .and_then(|info| info.latest_url.clone())
        else {
            debug!(name = %component.content.name, "No latest URL, skipping update check");
            return;
        };

        let response = match self.client.get(&latest_url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(name = %component.content.name, status = %response.status(), "Update check returned non-success");
                return;
            }
            Err(e) => {
                debug!(name = %component.content.name, error = %e, "Update check request failed");
                return;
            }
        };
        let payload: LatestPayload = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                debug!(name = %component.content.name, error = %e, "Unparseable update payload");
                return;
            }
        };

        let installed = self.installed_version(&component).await;
        debug!(
            name = %component.content.name,
            latest = %payload.version,
            installed = installed.as_deref().unwrap_or("none"),
            "Checked for update"
        );
        let Some(installed) = installed else {
            return;
        };
        if !version_is_newer(&payload.version, &installed) {
            return;
        }

        info!(name = %component.content.name, version = %payload.version, "Newer component version available");
        if let Some(info) = component.content.package_info.as_mut() {
            if payload.download_url.is_some() {
                info.download_url = payload.download_url;
            }
            info.version = Some(payload.version);
        }
        let _ = self.install(component).await;
    }

    /// Device-local installed version, read from the component's own
    /// installed `package.json` rather than the synced package metadata:
    /// each device tracks what it actually has on disk.
    async fn installed_version(&self, component: &Component) -> Option<String> {
        let paths = self.root.paths_for(component)?;
        pipeline::read_descriptor(&paths.absolute_path).await?.version
    }

    /// Remove a component's installed directory using the recorded mapping
    /// location, then drop the mapping entry. Unknown components are a
    /// no-op with no mapping write.
    pub async fn uninstall(&self, component: &Component) {
        let Some(location) = self.mapping.location_of(&component.uuid).await else {
            debug!(uuid = %component.uuid, "No recorded install location, nothing to uninstall");
            return;
        };
        if !is_managed_location(&location) {
            warn!(uuid = %component.uuid, location = %location, "Refusing to remove location outside the Extensions directory");
            return;
        }

        info!(uuid = %component.uuid, location = %location, "Uninstalling component");
        let path = self.root.resolve(&location);
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove installed directory")
            }
        }
        self.mapping.remove(&component.uuid).await;
    }
}

/// Strict "newer than" comparison under semantic-version ordering.
/// Unparseable versions never trigger a reinstall.
fn version_is_newer(candidate: &str, installed: &str) -> bool {
    match (Version::parse(candidate), Version::parse(installed)) {
        (Ok(candidate), Ok(installed)) => candidate > installed,
        _ => false,
    }
}
