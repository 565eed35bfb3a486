//! Download, extraction and on-disk normalization for component archives.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::component::PackageDescriptor;
use crate::error::Result;

/// Download the archive at `url` to `dest`, creating parent directories.
pub async fn download(client: &reqwest::Client, url: &str, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let response = client.get(url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    debug!(url, bytes = bytes.len(), "Downloaded component archive");
    tokio::fs::write(dest, &bytes).await?;
    Ok(())
}

/// Extract the zip archive at `archive` into `dest`, overwriting existing
/// files. Runs on the blocking pool.
pub async fn extract(archive: &Path, dest: &Path) -> Result<()> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let file = std::fs::File::open(&archive)?;
        let mut zip = zip::ZipArchive::new(file)?;
        zip.extract(&dest)?;
        Ok(())
    })
    .await??;
    Ok(())
}

/// If `dir` contains exactly one entry and that entry is a directory, move
/// its contents up one level into `dir`. Applied at most once; archives
/// produced by source-export tooling commonly wrap everything in a single
/// top-level folder.
pub async fn unnest(dir: &Path) -> Result<()> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut children: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        children.push(entry.path());
    }

    let [wrapper] = children.as_slice() else {
        return Ok(());
    };
    if !tokio::fs::metadata(wrapper).await?.is_dir() {
        return Ok(());
    }

    // Rename the wrapper aside first so a child sharing its name cannot
    // collide on the way up.
    let staging = dir.join(".unnest");
    tokio::fs::rename(wrapper, &staging).await?;
    let mut inner = tokio::fs::read_dir(&staging).await?;
    while let Some(entry) = inner.next_entry().await? {
        tokio::fs::rename(entry.path(), dir.join(entry.file_name())).await?;
    }
    tokio::fs::remove_dir(&staging).await?;
    debug!(dir = %dir.display(), "Unnested single-folder archive");
    Ok(())
}

/// Read `package.json` from an installed directory. Best effort: a missing
/// or unreadable descriptor yields `None`, never an error.
pub async fn read_descriptor(dir: &Path) -> Option<PackageDescriptor> {
    let path = dir.join("package.json");
    let bytes = tokio::fs::read(&path).await.ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(descriptor) => Some(descriptor),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Unreadable package descriptor");
            None
        }
    }
}
