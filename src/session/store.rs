//! Session store
//!
//! The single shared source of truth for the workbench: compiled artifacts,
//! deployed instances, transaction history and the active account. Each
//! top-level field lives in a `watch` channel holding an immutable snapshot;
//! mutation clones the snapshot, applies the change and replaces the whole
//! field. Readers therefore always observe a fully-formed previous or next
//! value, and observers subscribe to per-field change notifications instead
//! of polling.

use crate::artifact::CompiledArtifact;
use crate::session::history::{TransactionRecord, TxBroadcaster};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Snapshot of the artifact registry
pub type ArtifactMap = Arc<HashMap<String, CompiledArtifact>>;
/// Snapshot of the deployed-instance table
pub type InstanceMap = Arc<HashMap<String, DeployedInstance>>;
/// Snapshot of the transaction history
pub type History = Arc<Vec<TransactionRecord>>;

/// A contract artifact bound to a deployed on-chain address
#[derive(Debug, Clone, PartialEq)]
pub struct DeployedInstance {
    /// The artifact this instance was deployed from
    pub artifact: CompiledArtifact,
    /// On-chain address
    pub address: String,
    /// Cached outputs of past invocations, keyed by function name. A key is
    /// present only if the function produced at least one visible output.
    pub state: HashMap<String, Vec<Value>>,
}

impl DeployedInstance {
    /// Create a freshly deployed instance with empty derived state
    pub fn new(artifact: CompiledArtifact, address: String) -> Self {
        Self {
            artifact,
            address,
            state: HashMap::new(),
        }
    }

    /// Artifact id this instance is keyed by
    pub fn id(&self) -> &str {
        &self.artifact.id
    }
}

/// Shared mutable session state with snapshot-replace semantics
#[derive(Debug)]
pub struct SessionStore {
    artifacts: watch::Sender<ArtifactMap>,
    instances: watch::Sender<InstanceMap>,
    history: watch::Sender<History>,
    account: watch::Sender<String>,
    transactions: TxBroadcaster,
}

impl SessionStore {
    /// Create an empty store for the given active account
    pub fn new(account: &str) -> Self {
        Self {
            artifacts: watch::Sender::new(Arc::new(HashMap::new())),
            instances: watch::Sender::new(Arc::new(HashMap::new())),
            history: watch::Sender::new(Arc::new(Vec::new())),
            account: watch::Sender::new(account.to_string()),
            transactions: TxBroadcaster::new(),
        }
    }

    // ------------------------------------------------------------------
    // Artifacts
    // ------------------------------------------------------------------

    /// Current artifact snapshot
    pub fn artifacts(&self) -> ArtifactMap {
        self.artifacts.borrow().clone()
    }

    /// Look up one artifact by id
    pub fn artifact(&self, id: &str) -> Option<CompiledArtifact> {
        self.artifacts.borrow().get(id).cloned()
    }

    /// Insert or overwrite the artifact keyed by its derived id
    pub fn insert_artifact(&self, artifact: CompiledArtifact) {
        let mut map: HashMap<_, _> = (**self.artifacts.borrow()).clone();
        map.insert(artifact.id.clone(), artifact);
        self.artifacts.send_replace(Arc::new(map));
    }

    /// Watch for artifact-field replacements
    pub fn subscribe_artifacts(&self) -> watch::Receiver<ArtifactMap> {
        self.artifacts.subscribe()
    }

    // ------------------------------------------------------------------
    // Instances
    // ------------------------------------------------------------------

    /// Current instance snapshot
    pub fn instances(&self) -> InstanceMap {
        self.instances.borrow().clone()
    }

    /// Look up one deployed instance by artifact id
    pub fn instance(&self, id: &str) -> Option<DeployedInstance> {
        self.instances.borrow().get(id).cloned()
    }

    /// Insert or overwrite a deployed instance
    pub fn insert_instance(&self, instance: DeployedInstance) {
        let mut map: HashMap<_, _> = (**self.instances.borrow()).clone();
        map.insert(instance.id().to_string(), instance);
        self.instances.send_replace(Arc::new(map));
    }

    /// Apply a mutation to an existing instance; returns false if the id is
    /// not deployed (the store is left untouched)
    pub fn update_instance<F>(&self, id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut DeployedInstance),
    {
        let mut map: HashMap<_, _> = (**self.instances.borrow()).clone();
        match map.get_mut(id) {
            Some(instance) => {
                mutate(instance);
                self.instances.send_replace(Arc::new(map));
                true
            }
            None => false,
        }
    }

    /// Remove an instance; missing ids are a no-op
    pub fn remove_instance(&self, id: &str) {
        if !self.instances.borrow().contains_key(id) {
            return;
        }
        let mut map: HashMap<_, _> = (**self.instances.borrow()).clone();
        map.remove(id);
        self.instances.send_replace(Arc::new(map));
    }

    /// Clear one function's cached outputs; missing id or function is a no-op
    pub fn clear_instance_state(&self, id: &str, fn_name: &str) {
        let has_entry = self
            .instances
            .borrow()
            .get(id)
            .map(|i| i.state.contains_key(fn_name))
            .unwrap_or(false);
        if !has_entry {
            return;
        }
        self.update_instance(id, |instance| {
            instance.state.remove(fn_name);
        });
    }

    /// Watch for instance-field replacements
    pub fn subscribe_instances(&self) -> watch::Receiver<InstanceMap> {
        self.instances.subscribe()
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Current history snapshot
    pub fn history(&self) -> History {
        self.history.borrow().clone()
    }

    /// Append one record (completion order) and push it to subscribers
    pub fn append_history(&self, record: TransactionRecord) {
        let mut log: Vec<_> = (**self.history.borrow()).clone();
        log.push(record.clone());
        self.history.send_replace(Arc::new(log));
        self.transactions.broadcast(record);
    }

    /// Watch for history-field replacements
    pub fn subscribe_history(&self) -> watch::Receiver<History> {
        self.history.subscribe()
    }

    /// Subscribe to individual appended records
    pub fn subscribe_transactions(&self) -> broadcast::Receiver<TransactionRecord> {
        self.transactions.subscribe()
    }

    // ------------------------------------------------------------------
    // Account
    // ------------------------------------------------------------------

    /// Active account identity
    pub fn account(&self) -> String {
        self.account.borrow().clone()
    }

    /// Replace the active account
    pub fn set_account(&self, account: &str) {
        self.account.send_replace(account.to_string());
    }

    /// Watch for account replacements
    pub fn subscribe_account(&self) -> watch::Receiver<String> {
        self.account.subscribe()
    }
}
