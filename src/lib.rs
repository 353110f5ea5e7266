//! Contract Workbench: an interactive session manager for smart contracts
//!
//! This crate manages the lifecycle of compiled contract artifacts against a
//! blockchain-like execution backend, featuring:
//! - An artifact registry fed by compiler notifications, keyed by ids that
//!   stay stable across recompilation
//! - Deployment of compiled bytecode with constructor parameters
//! - Read (`call`) and state-changing (`tx`) invocations, with invocation
//!   outputs merged into per-instance derived state
//! - Per-instance serialization so concurrent operations never lose updates
//! - An append-only transaction history exposed as a push-based event stream
//! - A shared session store with atomic snapshot-replace semantics
//! - A REST API with WebSocket transaction updates
//!
//! # Example
//!
//! ```rust
//! use contract_workbench::artifact::ArtifactRegistry;
//! use contract_workbench::chain::DevChain;
//! use contract_workbench::session::{SessionManager, SessionStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SessionStore::new("0xme"));
//! let registry = ArtifactRegistry::new(store.clone());
//! let manager = SessionManager::new(store.clone(), Arc::new(DevChain::new()));
//!
//! // Load an artifact from a compiler notification
//! let artifact = registry.on_artifact_loaded(
//!     "contracts/Token.json",
//!     br#"{"contractName": "Token", "abi": [], "bytecode": "0x6060"}"#,
//! )?;
//!
//! // Deploy it and watch the history grow
//! let outcome = manager.deploy(&artifact.id, &[]).await?;
//! println!("Deployed at {}", outcome.address);
//! assert_eq!(store.history().len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod artifact;
pub mod chain;
pub mod cli;
pub mod crypto;
pub mod session;

// Re-export commonly used types
pub use api::{create_router, ApiState, WsBroadcaster};
pub use artifact::{ArtifactError, ArtifactRegistry, CompiledArtifact, FunctionAbi};
pub use chain::{ChainClient, ChainError, DeployReceipt, DevChain, InvokeReceipt};
pub use session::{
    DeployedInstance, SessionConfig, SessionError, SessionManager, SessionStore,
    TransactionRecord, TxStatus,
};
