//! Contract artifacts
//!
//! Parsing, identity and registry of compiled contract artifacts. Artifacts
//! arrive from the compiler boundary as `{contractName, abi, bytecode}` JSON
//! notifications and are keyed by an id derived from source location plus
//! contract name, stable across recompilation.

pub mod abi;
pub mod artifact;
pub mod registry;

pub use abi::{AbiKind, AbiParam, FunctionAbi};
pub use artifact::{artifact_id, display_name, ArtifactError, CompiledArtifact, RawArtifact};
pub use registry::{ArtifactNotification, ArtifactRegistry};
