//! Project readiness

use rapp_protocol::BackendStatus;
use serde_json::Value;
use std::path::Path;

const DEPENDENCY_TABLES: [&str; 3] = ["dependencies", "devDependencies", "peerDependencies"];

/// Inspect `package.json` under `root` for a dependency on `library`
///
/// An unreadable or invalid `package.json` counts as no project.
pub async fn detect_status(root: &Path, library: &str) -> BackendStatus {
    let path = root.join("package.json");
    let Ok(text) = tokio::fs::read_to_string(&path).await else {
        return BackendStatus::NoProject;
    };
    let package: Value = match serde_json::from_str(&text) {
        Ok(package) => package,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "invalid package.json");
            return BackendStatus::NoProject;
        }
    };

    let project = root.display().to_string();
    let depends = DEPENDENCY_TABLES
        .iter()
        .filter_map(|table| package.get(table)?.as_object())
        .any(|deps| deps.contains_key(library));
    if depends {
        BackendStatus::Ready { path: project }
    } else {
        BackendStatus::MissingDependencies { path: project }
    }
}
