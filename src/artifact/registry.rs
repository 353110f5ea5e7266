//! Artifact registry
//!
//! Reacts to artifact-loaded notifications from the compiler side: each
//! notification carries a source id and the raw artifact bytes, which parse
//! into exactly one registry entry keyed by the derived artifact id. A
//! malformed payload fails that single notification, never the registry.

use crate::artifact::{ArtifactError, CompiledArtifact, RawArtifact};
use crate::session::SessionStore;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One artifact-loaded notification from the compiler boundary
#[derive(Debug, Clone)]
pub struct ArtifactNotification {
    /// Stable identifier of the artifact's source location
    pub source_id: String,
    /// Raw artifact JSON bytes
    pub bytes: Vec<u8>,
}

/// Maintains the artifact table of the session store
pub struct ArtifactRegistry {
    store: Arc<SessionStore>,
}

impl ArtifactRegistry {
    /// Create a registry writing into the given store
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Parse a notification payload and write/overwrite one registry entry
    pub fn on_artifact_loaded(
        &self,
        source_id: &str,
        bytes: &[u8],
    ) -> Result<CompiledArtifact, ArtifactError> {
        let raw: RawArtifact = serde_json::from_slice(bytes)?;
        let artifact = CompiledArtifact::from_raw(source_id, raw)?;
        self.store.insert_artifact(artifact.clone());
        log::info!("Loaded artifact {} ({})", artifact.name, artifact.id);
        Ok(artifact)
    }

    /// Seed the registry from a directory of `.json` artifact files.
    ///
    /// File names (relative to the directory) become source ids. Malformed
    /// files are skipped with a log line, matching the per-notification
    /// failure policy. Returns the number of artifacts loaded.
    pub fn load_dir(&self, dir: &Path) -> std::io::Result<usize> {
        let mut loaded = 0;
        let mut entries: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
            .collect();
        entries.sort();

        for path in entries {
            let source_id = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let bytes = std::fs::read(&path)?;
            match self.on_artifact_loaded(&source_id, &bytes) {
                Ok(_) => loaded += 1,
                Err(e) => log::error!("Skipping artifact {}: {}", source_id, e),
            }
        }
        Ok(loaded)
    }

    /// Spawn a task draining a notification channel into the registry.
    ///
    /// Notifications are processed in arrival order; the last notification
    /// per source id wins. Parse failures are logged and dropped.
    pub fn spawn_listener(
        self: Arc<Self>,
        mut notifications: mpsc::Receiver<ArtifactNotification>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                if let Err(e) =
                    self.on_artifact_loaded(&notification.source_id, &notification.bytes)
                {
                    log::error!("Artifact {} rejected: {}", notification.source_id, e);
                }
            }
            log::debug!("Artifact notification channel closed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN_JSON: &[u8] = br#"{
        "contractName": "Token",
        "abi": [{"name": "totalSupply", "outputs": [{"name": "supply", "type": "uint256"}]}],
        "bytecode": "0x6060"
    }"#;

    fn registry() -> (ArtifactRegistry, Arc<SessionStore>) {
        let store = Arc::new(SessionStore::new("0xme"));
        (ArtifactRegistry::new(store.clone()), store)
    }

    #[test]
    fn test_notification_creates_one_entry() {
        let (registry, store) = registry();
        let artifact = registry
            .on_artifact_loaded("contracts/Token.json", TOKEN_JSON)
            .unwrap();

        let artifacts = store.artifacts();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[&artifact.id].contract_name, "Token");
    }

    #[test]
    fn test_reload_overwrites_same_entry() {
        let (registry, store) = registry();
        let first = registry
            .on_artifact_loaded("contracts/Token.json", TOKEN_JSON)
            .unwrap();

        // Recompiled artifact: same source + name, new bytecode
        let recompiled = br#"{"contractName": "Token", "abi": [], "bytecode": "0xbeef"}"#;
        let second = registry
            .on_artifact_loaded("contracts/Token.json", recompiled)
            .unwrap();

        assert_eq!(first.id, second.id);
        let artifacts = store.artifacts();
        assert_eq!(artifacts.len(), 1);
        // Most recent notification wins
        assert_eq!(artifacts[&first.id].bytecode, vec![0xbe, 0xef]);
    }

    #[test]
    fn test_malformed_payload_fails_only_that_notification() {
        let (registry, store) = registry();
        assert!(registry.on_artifact_loaded("bad.json", b"not json").is_err());
        assert!(store.artifacts().is_empty());

        // The registry keeps working afterwards
        registry
            .on_artifact_loaded("contracts/Token.json", TOKEN_JSON)
            .unwrap();
        assert_eq!(store.artifacts().len(), 1);
    }

    #[test]
    fn test_load_dir_skips_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Token.json"), TOKEN_JSON).unwrap();
        std::fs::write(dir.path().join("broken.json"), b"{").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let (registry, store) = registry();
        let loaded = registry.load_dir(dir.path()).unwrap();

        assert_eq!(loaded, 1);
        assert_eq!(store.artifacts().len(), 1);
    }

    #[tokio::test]
    async fn test_listener_drains_notifications_in_order() {
        let (registry, store) = registry();
        let registry = Arc::new(registry);
        let (tx, rx) = mpsc::channel(8);
        let handle = registry.spawn_listener(rx);

        tx.send(ArtifactNotification {
            source_id: "contracts/Token.json".to_string(),
            bytes: TOKEN_JSON.to_vec(),
        })
        .await
        .unwrap();
        tx.send(ArtifactNotification {
            source_id: "contracts/Token.json".to_string(),
            bytes: br#"{"contractName": "Token", "abi": [], "bytecode": "0xbeef"}"#.to_vec(),
        })
        .await
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        let artifacts = store.artifacts();
        assert_eq!(artifacts.len(), 1);
        let artifact = artifacts.values().next().unwrap();
        assert_eq!(artifact.bytecode, vec![0xbe, 0xef]);
    }
}
