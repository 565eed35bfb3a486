//! Component lifecycle management for a host application.
//!
//! Wharf keeps a declarative set of user-installable components present on
//! disk: it downloads and extracts their archives, normalizes the
//! extracted layout, polls for updates, and removes components the host
//! no longer wants. Install locations are tracked in a durable mapping
//! file so a component known only by its uuid can still be uninstalled.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wharf_core::{ComponentManager, ExtensionsRoot};
//!
//! let root = ExtensionsRoot::new("/path/to/user-data");
//! let manager = Arc::new(ComponentManager::new(root));
//! let mut events = manager.subscribe();
//!
//! manager.sync(desired_components).await;
//! while let Ok(event) = events.try_recv() {
//!     println!("{event:?}");
//! }
//! ```

pub mod component;
pub mod error;
pub mod events;
pub mod manager;
pub mod mapping;
pub mod paths;
pub mod pipeline;

pub use component::{Component, ComponentContent, LatestPayload, PackageDescriptor, PackageInfo};
pub use error::{InstallError, PackError};
pub use events::{HostEvent, HostEventReceiver, HostEventSender, HostRequest};
pub use manager::ComponentManager;
pub use mapping::{MappingEntry, MappingStore};
pub use paths::{ComponentPaths, ExtensionsRoot, EXTENSIONS_DIR};
