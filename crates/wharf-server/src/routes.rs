//! Asset routes for installed component files.
//!
//! Requests are resolved lexically against the Extensions directory and
//! rejected unless the resolved path stays inside it. Failures of any
//! kind collapse into one fixed 404 response so the host UI always shows
//! the same recovery message.

use std::path::{Component as PathComponent, Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Path as RoutePath, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::debug;

use wharf_core::{ExtensionsRoot, EXTENSIONS_DIR};

/// Shown for every request that cannot be served, whatever the cause.
const NOT_FOUND_MESSAGE: &str = "Unable to load extension. Please restart the application and \
     try again. If the issue persists, try uninstalling then reinstalling the extension.";

pub fn create_router(root: Arc<ExtensionsRoot>) -> Router {
    Router::new()
        .route("/", get(not_found))
        .route("/*path", get(serve_asset))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(root)
}

async fn serve_asset(
    State(root): State<Arc<ExtensionsRoot>>,
    RoutePath(path): RoutePath<String>,
) -> impl IntoResponse {
    let Some(resolved) = resolve_request_path(&root.extensions_dir(), &path) else {
        debug!(request = %path, "Rejected asset path outside the Extensions directory");
        return not_found().await.into_response();
    };

    let is_file = tokio::fs::metadata(&resolved)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        return not_found().await.into_response();
    }

    match tokio::fs::read(&resolved).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&resolved).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, format!("{mime}; charset=utf-8"))],
                bytes,
            )
                .into_response()
        }
        Err(e) => {
            debug!(path = %resolved.display(), error = %e, "Failed to read asset");
            not_found().await.into_response()
        }
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
}

/// Map a request path onto the Extensions directory.
///
/// Leading `Extensions` segments are dropped so both `/a/index.html` and
/// `/Extensions/a/index.html` address the same file. The remainder is
/// normalized lexically, joined onto the Extensions directory and only
/// accepted when the result is still contained in it.
fn resolve_request_path(extensions_dir: &Path, request: &str) -> Option<PathBuf> {
    let relative = normalize(Path::new(request.trim_start_matches('/')));
    let mut stripped = relative.as_path();
    while let Ok(rest) = stripped.strip_prefix(EXTENSIONS_DIR) {
        stripped = rest;
    }

    let resolved = normalize(&extensions_dir.join(stripped));
    resolved.starts_with(extensions_dir).then_some(resolved)
}

/// Lexical normalization: collapse `.` and apply `..` without touching the
/// filesystem. `..` segments that climb past the start are kept, so the
/// containment check after joining still sees them.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            PathComponent::CurDir => {}
            PathComponent::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PathBuf {
        PathBuf::from("/data/Extensions")
    }

    #[test]
    fn test_resolves_plain_asset_path() {
        assert_eq!(
            resolve_request_path(&base(), "ext-a/index.html"),
            Some(PathBuf::from("/data/Extensions/ext-a/index.html"))
        );
    }

    #[test]
    fn test_extensions_prefix_is_tolerated() {
        assert_eq!(
            resolve_request_path(&base(), "Extensions/ext-a/index.html"),
            Some(PathBuf::from("/data/Extensions/ext-a/index.html"))
        );
        assert_eq!(
            resolve_request_path(&base(), "Extensions/Extensions/ext-a/index.html"),
            Some(PathBuf::from("/data/Extensions/ext-a/index.html"))
        );
    }

    #[test]
    fn test_internal_dot_segments_collapse() {
        assert_eq!(
            resolve_request_path(&base(), "ext-a/./sub/../index.html"),
            Some(PathBuf::from("/data/Extensions/ext-a/index.html"))
        );
    }

    #[test]
    fn test_traversal_above_root_is_rejected() {
        assert_eq!(resolve_request_path(&base(), "../secrets.txt"), None);
        assert_eq!(
            resolve_request_path(&base(), "ext-a/../../../etc/passwd"),
            None
        );
        assert_eq!(
            resolve_request_path(&base(), "Extensions/../../mapping.json"),
            None
        );
    }

    #[test]
    fn test_escape_to_sibling_of_root_is_rejected() {
        // Lands back under /data but outside /data/Extensions.
        assert_eq!(
            resolve_request_path(&base(), "ext-a/../../mapping.json"),
            None
        );
    }

    #[test]
    fn test_extensions_dir_itself_is_contained() {
        // Resolves to the directory itself; the handler's is_file check
        // turns this into a 404.
        assert_eq!(resolve_request_path(&base(), "Extensions"), Some(base()));
    }
}
