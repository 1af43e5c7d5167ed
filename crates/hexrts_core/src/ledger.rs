//! Per-player named resource balances with optional caps.
//!
//! A resource without an explicit cap is unbounded ([`UNBOUNDED`]). Amounts
//! never go negative and never exceed a finite cap.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::PlayerId;
use crate::error::{GameError, Result};

/// Cap reported for resources that have none.
pub const UNBOUNDED: i32 = i32::MAX;

/// One cost line: `amount` of `resource`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceCost {
    /// Resource name.
    pub resource: String,
    /// Amount required.
    pub amount: i32,
}

impl ResourceCost {
    /// Create a cost line.
    #[must_use]
    pub fn new(resource: impl Into<String>, amount: i32) -> Self {
        Self {
            resource: resource.into(),
            amount,
        }
    }
}

/// Change notifications emitted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    /// Amount changed.
    AmountChanged {
        /// Player.
        player: PlayerId,
        /// Resource name.
        resource: String,
        /// Previous amount.
        old: i32,
        /// New amount.
        new: i32,
    },
    /// Cap changed.
    CapChanged {
        /// Player.
        player: PlayerId,
        /// Resource name.
        resource: String,
        /// Previous cap.
        old: i32,
        /// New cap.
        new: i32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
struct Entry {
    amount: i32,
    cap: Option<i32>,
}

/// Resource balances for every player.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceLedger {
    entries: BTreeMap<(PlayerId, String), Entry>,
    #[serde(skip)]
    events: Vec<LedgerEvent>,
}

impl ResourceLedger {
    /// Empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a starting balance. A `cap` of 0 or less means unbounded.
    pub fn set_starting(&mut self, player: PlayerId, resource: &str, amount: i32, cap: i32) {
        let cap = (cap > 0).then_some(cap);
        let amount = amount.clamp(0, cap.unwrap_or(UNBOUNDED));
        self.entries
            .insert((player, resource.to_string()), Entry { amount, cap });
    }

    /// Current amount; 0 for unknown entries.
    #[must_use]
    pub fn amount(&self, player: PlayerId, resource: &str) -> i32 {
        self.entry(player, resource).map_or(0, |e| e.amount)
    }

    /// Current cap; [`UNBOUNDED`] when none is set.
    #[must_use]
    pub fn cap(&self, player: PlayerId, resource: &str) -> i32 {
        self.entry(player, resource)
            .and_then(|e| e.cap)
            .unwrap_or(UNBOUNDED)
    }

    /// Whether an explicit cap is set.
    #[must_use]
    pub fn has_cap(&self, player: PlayerId, resource: &str) -> bool {
        self.entry(player, resource).is_some_and(|e| e.cap.is_some())
    }

    /// Add `n`, clamped to the cap. Returns `false` for `n <= 0`.
    pub fn add(&mut self, player: PlayerId, resource: &str, n: i32) -> bool {
        if n <= 0 {
            tracing::warn!(player, resource, n, "Ignoring non-positive resource add");
            return false;
        }
        let entry = self.entry_mut(player, resource);
        let old = entry.amount;
        let cap = entry.cap.unwrap_or(UNBOUNDED);
        entry.amount = old.saturating_add(n).min(cap);
        let new = entry.amount;
        self.push_amount_event(player, resource, old, new);
        true
    }

    /// Remove `n` if the balance covers it. `n <= 0` always succeeds.
    pub fn try_consume(&mut self, player: PlayerId, resource: &str, n: i32) -> bool {
        if n <= 0 {
            return true;
        }
        if self.amount(player, resource) < n {
            return false;
        }
        let entry = self.entry_mut(player, resource);
        let old = entry.amount;
        entry.amount -= n;
        let new = entry.amount;
        self.push_amount_event(player, resource, old, new);
        true
    }

    /// Whether every cost line is covered.
    #[must_use]
    pub fn can_afford(&self, player: PlayerId, costs: &[ResourceCost]) -> bool {
        self.first_shortfall(player, costs).is_none()
    }

    /// Consume every cost line, or nothing at all.
    pub fn try_consume_all(&mut self, player: PlayerId, costs: &[ResourceCost]) -> bool {
        self.charge(player, costs).is_ok()
    }

    /// Like [`try_consume_all`](Self::try_consume_all) but reports the first
    /// shortfall.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InsufficientResources`] and leaves every balance
    /// untouched when any line is not covered.
    pub fn charge(&mut self, player: PlayerId, costs: &[ResourceCost]) -> Result<()> {
        if let Some(cost) = self.first_shortfall(player, costs) {
            return Err(GameError::InsufficientResources {
                resource: cost.resource.clone(),
                required: Self::required_total(costs, &cost.resource),
                available: self.amount(player, &cost.resource),
            });
        }
        for cost in costs {
            self.try_consume(player, &cost.resource, cost.amount);
        }
        Ok(())
    }

    /// Give back every cost line (clamped by caps).
    pub fn refund(&mut self, player: PlayerId, costs: &[ResourceCost]) {
        for cost in costs.iter().filter(|c| c.amount > 0) {
            self.add(player, &cost.resource, cost.amount);
        }
    }

    /// Set a cap. Negative caps are rejected. The amount is not reduced.
    pub fn update_cap(&mut self, player: PlayerId, resource: &str, new_cap: i32) -> bool {
        if new_cap < 0 {
            tracing::warn!(player, resource, new_cap, "Rejecting negative resource cap");
            return false;
        }
        let old = self.cap(player, resource);
        self.entry_mut(player, resource).cap = Some(new_cap);
        if old != new_cap {
            self.events.push(LedgerEvent::CapChanged {
                player,
                resource: resource.to_string(),
                old,
                new: new_cap,
            });
        }
        true
    }

    /// Shift an existing finite cap by `delta`, flooring at zero.
    ///
    /// Unbounded resources stay unbounded.
    pub fn adjust_cap(&mut self, player: PlayerId, resource: &str, delta: i32) {
        if !self.has_cap(player, resource) {
            return;
        }
        let new_cap = self.cap(player, resource).saturating_add(delta).max(0);
        self.update_cap(player, resource, new_cap);
    }

    /// Every `(player, resource, amount, cap)` in deterministic order.
    pub fn balances(&self) -> impl Iterator<Item = (PlayerId, &str, i32, i32)> + '_ {
        self.entries.iter().map(|((player, resource), e)| {
            (*player, resource.as_str(), e.amount, e.cap.unwrap_or(UNBOUNDED))
        })
    }

    /// Take the events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    fn first_shortfall<'c>(&self, player: PlayerId, costs: &'c [ResourceCost]) -> Option<&'c ResourceCost> {
        costs.iter().find(|c| {
            c.amount > 0 && self.amount(player, &c.resource) < Self::required_total(costs, &c.resource)
        })
    }

    /// Duplicate lines for one resource add up.
    fn required_total(costs: &[ResourceCost], resource: &str) -> i32 {
        costs
            .iter()
            .filter(|c| c.resource == resource && c.amount > 0)
            .map(|c| c.amount)
            .fold(0i32, i32::saturating_add)
    }

    fn entry(&self, player: PlayerId, resource: &str) -> Option<&Entry> {
        self.entries.get(&(player, resource.to_string()))
    }

    fn entry_mut(&mut self, player: PlayerId, resource: &str) -> &mut Entry {
        self.entries.entry((player, resource.to_string())).or_default()
    }

    fn push_amount_event(&mut self, player: PlayerId, resource: &str, old: i32, new: i32) {
        if old != new {
            self.events.push(LedgerEvent::AmountChanged {
                player,
                resource: resource.to_string(),
                old,
                new,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: PlayerId = 1;

    #[test]
    fn test_defaults() {
        let ledger = ResourceLedger::new();
        assert_eq!(ledger.amount(P, "Mineral"), 0);
        assert_eq!(ledger.cap(P, "Mineral"), UNBOUNDED);
        assert!(!ledger.has_cap(P, "Mineral"));
    }

    #[test]
    fn test_add_rejects_non_positive() {
        let mut ledger = ResourceLedger::new();
        assert!(!ledger.add(P, "Mineral", 0));
        assert!(!ledger.add(P, "Mineral", -5));
        assert!(ledger.add(P, "Mineral", 5));
        assert_eq!(ledger.amount(P, "Mineral"), 5);
    }

    #[test]
    fn test_add_clamps_to_cap() {
        let mut ledger = ResourceLedger::new();
        ledger.set_starting(P, "Supply", 8, 10);
        assert!(ledger.add(P, "Supply", 5));
        assert_eq!(ledger.amount(P, "Supply"), 10);
    }

    #[test]
    fn test_consume() {
        let mut ledger = ResourceLedger::new();
        ledger.set_starting(P, "Mineral", 50, 0);
        assert!(ledger.try_consume(P, "Mineral", 0));
        assert!(!ledger.try_consume(P, "Mineral", 60));
        assert_eq!(ledger.amount(P, "Mineral"), 50);
        assert!(ledger.try_consume(P, "Mineral", 50));
        assert_eq!(ledger.amount(P, "Mineral"), 0);
    }

    #[test]
    fn test_consume_all_is_atomic() {
        let mut ledger = ResourceLedger::new();
        ledger.set_starting(P, "Mineral", 100, 0);
        ledger.set_starting(P, "Gas", 10, 0);
        let costs = vec![ResourceCost::new("Mineral", 50), ResourceCost::new("Gas", 25)];
        assert!(!ledger.can_afford(P, &costs));
        assert!(!ledger.try_consume_all(P, &costs));
        assert_eq!(ledger.amount(P, "Mineral"), 100);
        assert_eq!(ledger.amount(P, "Gas"), 10);

        let err = ledger.charge(P, &costs).unwrap_err();
        assert!(matches!(
            err,
            GameError::InsufficientResources { required: 25, available: 10, .. }
        ));

        ledger.add(P, "Gas", 15);
        assert!(ledger.try_consume_all(P, &costs));
        assert_eq!(ledger.amount(P, "Mineral"), 50);
        assert_eq!(ledger.amount(P, "Gas"), 0);
    }

    #[test]
    fn test_duplicate_cost_lines_sum() {
        let mut ledger = ResourceLedger::new();
        ledger.set_starting(P, "Mineral", 60, 0);
        let costs = vec![ResourceCost::new("Mineral", 40), ResourceCost::new("Mineral", 40)];
        assert!(!ledger.try_consume_all(P, &costs));
        assert_eq!(ledger.amount(P, "Mineral"), 60);
    }

    #[test]
    fn test_update_cap() {
        let mut ledger = ResourceLedger::new();
        assert!(!ledger.update_cap(P, "Supply", -1));
        assert!(ledger.update_cap(P, "Supply", 10));
        assert_eq!(ledger.cap(P, "Supply"), 10);
        ledger.adjust_cap(P, "Supply", 8);
        assert_eq!(ledger.cap(P, "Supply"), 18);
        ledger.adjust_cap(P, "Supply", -30);
        assert_eq!(ledger.cap(P, "Supply"), 0);
        ledger.adjust_cap(P, "Mineral", 5);
        assert!(!ledger.has_cap(P, "Mineral"));
    }

    #[test]
    fn test_events() {
        let mut ledger = ResourceLedger::new();
        ledger.add(P, "Mineral", 10);
        ledger.try_consume(P, "Mineral", 4);
        ledger.update_cap(P, "Mineral", 100);
        let events = ledger.drain_events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[1],
            LedgerEvent::AmountChanged { player: P, resource: "Mineral".into(), old: 10, new: 6 }
        );
        assert!(ledger.drain_events().is_empty());
    }

    #[test]
    fn test_balances_sorted() {
        let mut ledger = ResourceLedger::new();
        ledger.add(2, "Mineral", 1);
        ledger.add(1, "Mineral", 1);
        ledger.add(1, "Gas", 1);
        let order: Vec<_> = ledger.balances().map(|(p, r, _, _)| (p, r.to_string())).collect();
        assert_eq!(
            order,
            vec![(1, "Gas".to_string()), (1, "Mineral".to_string()), (2, "Mineral".to_string())]
        );
    }
}
