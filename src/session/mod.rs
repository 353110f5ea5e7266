//! Contract session management
//!
//! The heart of the workbench: a shared session store with snapshot-replace
//! semantics, an append-only transaction history with a push-based event
//! stream, per-id serialization locks and the manager that orchestrates
//! deploys and invocations through them.

pub mod history;
pub mod locks;
pub mod manager;
pub mod store;

pub use history::{TransactionRecord, TxBroadcaster, TxStatus};
pub use locks::InstanceLocks;
pub use manager::{DeployOutcome, InvokeOutcome, SessionConfig, SessionError, SessionManager};
pub use store::{ArtifactMap, DeployedInstance, History, InstanceMap, SessionStore};
