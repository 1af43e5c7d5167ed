//! Harvestable resource nodes.
//!
//! Nodes are neutral entities without a state machine. Workers withdraw
//! from them; the ledger is only credited when a worker returns the load.

use serde::{Deserialize, Serialize};

/// Resource type used when none is specified.
pub const DEFAULT_RESOURCE_TYPE: &str = "Mineral";

/// A deposit that workers gather from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceNode {
    /// Ledger resource name credited for this node.
    pub resource_type: String,
    /// Amount the node started with.
    pub initial_amount: i32,
    /// Amount left.
    pub remaining: i32,
    /// Most a worker can pull in one gather tick.
    pub amount_per_gather_tick: i32,
}

impl Default for ResourceNode {
    fn default() -> Self {
        Self::new(DEFAULT_RESOURCE_TYPE, 1000, 10)
    }
}

impl ResourceNode {
    /// Full node.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, amount: i32, amount_per_gather_tick: i32) -> Self {
        let amount = amount.max(0);
        Self {
            resource_type: resource_type.into(),
            initial_amount: amount,
            remaining: amount,
            amount_per_gather_tick: amount_per_gather_tick.max(0),
        }
    }

    /// Nothing left.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.remaining <= 0
    }

    /// Withdraw up to `requested`. Returns the amount actually taken.
    pub fn gather(&mut self, requested: i32) -> i32 {
        let taken = requested.clamp(0, self.remaining.max(0));
        self.remaining -= taken;
        if taken > 0 && self.is_depleted() {
            tracing::debug!(resource = %self.resource_type, "Resource node depleted");
        }
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_node() {
        let node = ResourceNode::default();
        assert_eq!(node.resource_type, "Mineral");
        assert_eq!(node.remaining, 1000);
        assert_eq!(node.amount_per_gather_tick, 10);
    }

    #[test]
    fn test_gather_until_depleted() {
        let mut node = ResourceNode::new("Gas", 25, 10);
        assert_eq!(node.gather(10), 10);
        assert_eq!(node.gather(10), 10);
        assert_eq!(node.gather(10), 5);
        assert!(node.is_depleted());
        assert_eq!(node.gather(10), 0);
        assert_eq!(node.remaining, 0);
    }

    #[test]
    fn test_gather_ignores_negative_request() {
        let mut node = ResourceNode::default();
        assert_eq!(node.gather(-3), 0);
        assert_eq!(node.remaining, 1000);
    }
}
