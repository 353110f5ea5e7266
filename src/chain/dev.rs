//! In-process development chain
//!
//! A stand-in execution backend for local experimentation. Addresses and
//! transaction hashes are derived deterministically from a deployment nonce,
//! and invocations echo their parameters back onto the function's declared
//! outputs, which makes deploy/invoke round trips observable without a real
//! node.

use crate::artifact::FunctionAbi;
use crate::chain::{ChainClient, ChainError, DeployReceipt, InvokeReceipt};
use crate::crypto::sha256_hex;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Base cost charged for a deployment
const DEPLOY_BASE_COST: u64 = 32_000;
/// Additional deployment cost per bytecode byte
const DEPLOY_BYTE_COST: u64 = 200;
/// Cost charged for a state-changing invocation
const TX_COST: u64 = 21_000;

/// Deterministic in-process chain backend
#[derive(Debug, Default)]
pub struct DevChain {
    nonce: AtomicU64,
}

impl DevChain {
    /// Create a new dev chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a contract address from deployer and nonce
    fn generate_address(&self, deployer: &str, nonce: u64) -> String {
        let input = format!("{}:{}", deployer, nonce);
        let hex = sha256_hex(input.as_bytes());
        format!("0x{}", &hex[..40])
    }

    fn generate_hash(&self, nonce: u64) -> String {
        format!("0x{}", sha256_hex(format!("tx:{}", nonce).as_bytes()))
    }

    /// Echo parameters back onto the declared output names, in order
    fn echo_outputs(function: &FunctionAbi, params: &[Value]) -> HashMap<String, Value> {
        function
            .outputs
            .iter()
            .enumerate()
            .map(|(i, out)| {
                let value = params.get(i).cloned().unwrap_or(Value::Null);
                (out.name.clone(), value)
            })
            .collect()
    }
}

#[async_trait]
impl ChainClient for DevChain {
    async fn deploy_contract(
        &self,
        account: &str,
        bytecode: &[u8],
        _constructor_types: &[String],
        _params: &[Value],
    ) -> Result<DeployReceipt, ChainError> {
        if bytecode.is_empty() {
            return Err(ChainError::Rejected {
                reason: "empty bytecode".to_string(),
            });
        }

        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        Ok(DeployReceipt {
            address: self.generate_address(account, nonce),
            cost: DEPLOY_BASE_COST + DEPLOY_BYTE_COST * bytecode.len() as u64,
            hash: self.generate_hash(nonce),
        })
    }

    async fn call(
        &self,
        _account: &str,
        _address: &str,
        function: &FunctionAbi,
        _output_types: &[String],
        params: &[Value],
    ) -> Result<InvokeReceipt, ChainError> {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        Ok(InvokeReceipt {
            cost: 0,
            hash: self.generate_hash(nonce),
            result: Self::echo_outputs(function, params),
        })
    }

    async fn tx(
        &self,
        _account: &str,
        _address: &str,
        function: &FunctionAbi,
        _output_types: &[String],
        params: &[Value],
    ) -> Result<InvokeReceipt, ChainError> {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        Ok(InvokeReceipt {
            cost: TX_COST,
            hash: self.generate_hash(nonce),
            result: Self::echo_outputs(function, params),
        })
    }
}
