//! Contract ABI data model
//!
//! Describes the callable surface of a compiled contract: functions, the
//! constructor, and their typed inputs/outputs. Only the entry kinds the
//! workbench acts on are modeled explicitly; anything else (events, custom
//! entries) parses into `Other` and is ignored.

use serde::{Deserialize, Serialize};

/// A single named, typed parameter of a function or constructor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    /// Parameter name (may be empty for unnamed outputs)
    #[serde(default)]
    pub name: String,
    /// Declared type, e.g. "uint256" or "address"
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Kind of an ABI entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbiKind {
    Function,
    Constructor,
    Fallback,
    /// Entry kinds the workbench does not act on (events etc.)
    #[serde(other)]
    Other,
}

impl Default for AbiKind {
    fn default() -> Self {
        AbiKind::Function
    }
}

/// One entry of a contract ABI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionAbi {
    /// Function name (empty for the constructor and fallback)
    #[serde(default)]
    pub name: String,
    /// Entry kind; ABI JSON omits "type" for plain functions
    #[serde(rename = "type", default)]
    pub kind: AbiKind,
    /// Typed input parameters
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    /// Typed output parameters
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
    /// True for read-only functions
    #[serde(default)]
    pub constant: bool,
}

impl FunctionAbi {
    /// Whether this entry is the contract constructor
    pub fn is_constructor(&self) -> bool {
        self.kind == AbiKind::Constructor
    }

    /// Whether this entry is callable by name
    pub fn is_function(&self) -> bool {
        self.kind == AbiKind::Function
    }

    /// Declared input types, in order
    pub fn input_types(&self) -> Vec<String> {
        self.inputs.iter().map(|p| p.type_name.clone()).collect()
    }

    /// Declared output types, in order
    pub fn output_types(&self) -> Vec<String> {
        self.outputs.iter().map(|p| p.type_name.clone()).collect()
    }
}
