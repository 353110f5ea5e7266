//! Chain interface
//!
//! The execution backend boundary. The workbench only needs three
//! operations, each asynchronous and fallible: deploy bytecode, invoke a
//! read-only `call`, invoke a state-changing `tx`. Everything behind this
//! trait (networking, signing, gas pricing) belongs to the backend.

pub mod dev;

use crate::artifact::FunctionAbi;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

pub use dev::DevChain;

/// Chain interface errors
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Chain rejected the operation: {reason}")]
    Rejected { reason: String },
    #[error("Chain transport failure: {0}")]
    Transport(String),
}

/// Result of a successful deployment
#[derive(Debug, Clone, PartialEq)]
pub struct DeployReceipt {
    /// Address the contract was deployed at
    pub address: String,
    /// Execution cost
    pub cost: u64,
    /// Transaction hash
    pub hash: String,
}

/// Result of a successful call/tx invocation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InvokeReceipt {
    /// Execution cost
    pub cost: u64,
    /// Transaction hash
    pub hash: String,
    /// Named outputs returned by the function
    pub result: HashMap<String, Value>,
}

/// Asynchronous execution backend for deploys and invocations
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Deploy contract bytecode with constructor parameters
    async fn deploy_contract(
        &self,
        account: &str,
        bytecode: &[u8],
        constructor_types: &[String],
        params: &[Value],
    ) -> Result<DeployReceipt, ChainError>;

    /// Read-only invocation of a deployed contract function
    async fn call(
        &self,
        account: &str,
        address: &str,
        function: &FunctionAbi,
        output_types: &[String],
        params: &[Value],
    ) -> Result<InvokeReceipt, ChainError>;

    /// State-changing invocation of a deployed contract function
    async fn tx(
        &self,
        account: &str,
        address: &str,
        function: &FunctionAbi,
        output_types: &[String],
        params: &[Value],
    ) -> Result<InvokeReceipt, ChainError>;
}
