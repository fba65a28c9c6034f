//! Snapshot file loading and persistence.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use switcher_core::error::SwitcherError;
use switcher_core::snapshot::{Snapshot, SnapshotDocument};

fn snapshot_path(location: &str, environment: &str) -> PathBuf {
    Path::new(location).join(format!("{environment}.json"))
}

/// Load the domain for `environment` from `<location>/<environment>.json`.
///
/// When the file is absent a placeholder `{data: {domain: {version: 0}}}`
/// document is used; if `location` is nonempty the placeholder is also
/// written to disk (creating parent directories).
pub fn load_domain(location: &str, environment: &str) -> Result<Snapshot, SwitcherError> {
    let path = snapshot_path(location, environment);

    let document = if path.exists() {
        let raw = fs::read_to_string(&path)
            .map_err(|e| SwitcherError::SnapshotFile(format!("{}: {e}", path.display())))?;
        serde_json::from_str::<SnapshotDocument>(&raw)
            .map_err(|e| SwitcherError::SnapshotFile(format!("{}: {e}", path.display())))?
    } else {
        let placeholder = SnapshotDocument::default();
        if !location.is_empty() {
            fs::create_dir_all(location)
                .map_err(|e| SwitcherError::SnapshotFile(format!("{location}: {e}")))?;
            let raw = serde_json::to_string_pretty(&placeholder)
                .map_err(|e| SwitcherError::SnapshotFile(e.to_string()))?;
            fs::write(&path, raw)
                .map_err(|e| SwitcherError::SnapshotFile(format!("{}: {e}", path.display())))?;
            debug!(path = %path.display(), "wrote placeholder snapshot");
        }
        placeholder
    };

    Ok(Snapshot::from_document(document))
}

/// Persist a snapshot to `<location>/<environment>.json`.
pub fn save_snapshot(
    snapshot: &Snapshot,
    location: &str,
    environment: &str,
) -> Result<(), SwitcherError> {
    let path = snapshot_path(location, environment);
    fs::create_dir_all(location)
        .map_err(|e| SwitcherError::SnapshotFile(format!("{location}: {e}")))?;

    let raw = serde_json::to_string_pretty(&snapshot.to_document())
        .map_err(|e| SwitcherError::SnapshotFile(e.to_string()))?;
    fs::write(&path, raw)
        .map_err(|e| SwitcherError::SnapshotFile(format!("{}: {e}", path.display())))?;
    debug!(path = %path.display(), version = snapshot.version(), "snapshot saved");
    Ok(())
}
