//! Compiled artifact model
//!
//! An artifact is the compiler's output for one contract: name, ABI and
//! bytecode. Artifacts arrive as JSON notifications and are keyed by an id
//! derived from their source location plus contract name, so recompiling the
//! same source maps onto the same id and keeps deployed instances attached.

use crate::artifact::abi::FunctionAbi;
use crate::crypto::sha256_hex;
use serde::Deserialize;
use thiserror::Error;

/// Length of the derived artifact id (hex chars)
const ARTIFACT_ID_LEN: usize = 16;

/// Artifact errors
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Malformed artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid bytecode hex: {0}")]
    Bytecode(#[from] hex::FromHexError),
    #[error("Artifact has empty bytecode")]
    EmptyBytecode,
}

/// The minimal artifact shape emitted by the compiler
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawArtifact {
    /// Declared contract name
    pub contract_name: String,
    /// Callable surface description
    #[serde(default)]
    pub abi: Vec<FunctionAbi>,
    /// Hex-encoded deployment bytecode, with or without a "0x" prefix
    pub bytecode: String,
}

/// A compiled contract ready for deployment
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArtifact {
    /// Stable id derived from source location + contract name
    pub id: String,
    /// Human-readable display name
    pub name: String,
    /// Declared contract name
    pub contract_name: String,
    /// Source location the artifact was compiled from
    pub source: String,
    /// Callable surface description
    pub abi: Vec<FunctionAbi>,
    /// Decoded deployment bytecode
    pub bytecode: Vec<u8>,
}

impl CompiledArtifact {
    /// Build a compiled artifact from a parsed notification payload
    pub fn from_raw(source_id: &str, raw: RawArtifact) -> Result<Self, ArtifactError> {
        let bytecode = hex::decode(raw.bytecode.trim_start_matches("0x"))?;
        if bytecode.is_empty() {
            return Err(ArtifactError::EmptyBytecode);
        }

        Ok(Self {
            id: artifact_id(source_id, &raw.contract_name),
            name: display_name(&raw.contract_name, source_id),
            contract_name: raw.contract_name,
            source: source_id.to_string(),
            abi: raw.abi,
            bytecode,
        })
    }

    /// Look up a callable function by name
    pub fn function(&self, name: &str) -> Option<&FunctionAbi> {
        self.abi.iter().find(|f| f.is_function() && f.name == name)
    }

    /// The constructor entry, if the ABI declares one
    pub fn constructor(&self) -> Option<&FunctionAbi> {
        self.abi.iter().find(|f| f.is_constructor())
    }

    /// Constructor input types (empty when no constructor is declared)
    pub fn constructor_types(&self) -> Vec<String> {
        self.constructor()
            .map(|c| c.input_types())
            .unwrap_or_default()
    }
}

/// Derive the stable artifact id from source location and contract name.
///
/// Recompiling the same source yields the same id, so re-deploys and reloads
/// do not orphan instances keyed by an older id.
pub fn artifact_id(source_id: &str, contract_name: &str) -> String {
    let input = format!("{}:{}", source_id, contract_name);
    sha256_hex(input.as_bytes())[..ARTIFACT_ID_LEN].to_string()
}

/// Combine contract name and a shortened source path into a display name
pub fn display_name(contract_name: &str, source_id: &str) -> String {
    let parts: Vec<&str> = source_id.split('/').collect();
    let short = if parts.len() > 2 {
        parts[parts.len() - 2..].join("/")
    } else {
        source_id.to_string()
    };
    format!("{} ({})", contract_name, short)
}
