//! Transaction history records and event stream
//!
//! Every completed deploy, call and tx appends exactly one record to the
//! session history, in completion order. Appends are also pushed onto a
//! broadcast channel so observers can react incrementally instead of
//! re-reading the whole log.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Maximum number of records to buffer per subscriber
const BROADCAST_CAPACITY: usize = 256;

/// Outcome status recorded for state-changing operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Error,
}

/// One completed deploy/call/tx operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Contract the operation targeted
    pub contract_name: String,
    /// Account that issued the operation
    pub from: String,
    /// Deployed address the operation hit (or produced, for deploys)
    pub to: String,
    /// Execution cost reported by the chain
    pub cost: u64,
    /// Transaction hash reported by the chain
    pub hash: String,
    /// Set for deploys and state-changing invocations, unset for pure reads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TxStatus>,
    /// Invoked function; a deploy has none
    #[serde(rename = "fn", skip_serializing_if = "Option::is_none")]
    pub fn_name: Option<String>,
}

impl TransactionRecord {
    /// Record for a successful deployment
    pub fn deploy(contract_name: &str, from: &str, address: &str, cost: u64, hash: &str) -> Self {
        Self {
            contract_name: contract_name.to_string(),
            from: from.to_string(),
            to: address.to_string(),
            cost,
            hash: hash.to_string(),
            status: Some(TxStatus::Success),
            fn_name: None,
        }
    }

    /// Record for a completed invocation; `state_changing` decides whether a
    /// status is set
    pub fn invoke(
        contract_name: &str,
        from: &str,
        address: &str,
        fn_name: &str,
        cost: u64,
        hash: &str,
        state_changing: bool,
    ) -> Self {
        Self {
            contract_name: contract_name.to_string(),
            from: from.to_string(),
            to: address.to_string(),
            cost,
            hash: hash.to_string(),
            status: state_changing.then_some(TxStatus::Success),
            fn_name: Some(fn_name.to_string()),
        }
    }
}

/// Broadcaster for transaction events
#[derive(Debug)]
pub struct TxBroadcaster {
    sender: broadcast::Sender<TransactionRecord>,
}

impl TxBroadcaster {
    /// Create a new broadcaster
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    /// Push a record to all subscribers
    pub fn broadcast(&self, record: TransactionRecord) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(record);
    }

    /// Subscribe to appended records
    pub fn subscribe(&self) -> broadcast::Receiver<TransactionRecord> {
        self.sender.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for TxBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_record_shape() {
        let record = TransactionRecord::deploy("Token", "0xme", "0xABC", 21000, "0xdeadbeef");
        assert_eq!(record.to, "0xABC");
        assert_eq!(record.status, Some(TxStatus::Success));
        assert!(record.fn_name.is_none());
    }

    #[test]
    fn test_read_invocation_has_no_status() {
        let record = TransactionRecord::invoke("Token", "0xme", "0xABC", "balanceOf", 0, "0x1", false);
        assert!(record.status.is_none());
        assert_eq!(record.fn_name.as_deref(), Some("balanceOf"));

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("status"));
        assert!(json.contains(r#""fn":"balanceOf""#));
    }

    #[test]
    fn test_broadcast_with_no_subscribers() {
        let broadcaster = TxBroadcaster::new();
        assert_eq!(broadcaster.subscriber_count(), 0);
        // Should not panic even with no subscribers
        broadcaster.broadcast(TransactionRecord::deploy("T", "a", "b", 0, "h"));
    }

    #[tokio::test]
    async fn test_subscribers_receive_appends_in_order() {
        let broadcaster = TxBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.broadcast(TransactionRecord::deploy("A", "me", "0x1", 1, "h1"));
        broadcaster.broadcast(TransactionRecord::deploy("B", "me", "0x2", 2, "h2"));

        assert_eq!(rx.recv().await.unwrap().contract_name, "A");
        assert_eq!(rx.recv().await.unwrap().contract_name, "B");
    }
}
