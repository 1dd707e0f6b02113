//! Priority queue of active positions (min-heap by expiry)

use priority_queue::PriorityQueue;
use std::cmp::Reverse;
use std::collections::HashMap;
use strike_common::{Identity, PositionId, Timestamp};

/// What the keeper tracks about an active position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedPosition {
    pub id: PositionId,
    pub user: Identity,
    pub collateral: u128,
    pub expiry: Timestamp,
}

impl TrackedPosition {
    /// Past expiry, so anyone may expire it
    pub fn is_due(&self, now: Timestamp) -> bool {
        now > self.expiry
    }
}

/// Expiry-ordered queue (min-heap: earliest expiry first)
#[derive(Default)]
pub struct ExpiryQueue {
    queue: PriorityQueue<PositionId, Reverse<Timestamp>>,
    map: HashMap<PositionId, TrackedPosition>,
}

impl ExpiryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push or update a position
    pub fn push(&mut self, position: TrackedPosition) {
        let id = position.id;
        let expiry = position.expiry;
        self.map.insert(id, position);
        self.queue.push(id, Reverse(expiry));
    }

    /// Pop the position expiring first
    pub fn pop(&mut self) -> Option<TrackedPosition> {
        let (id, _) = self.queue.pop()?;
        self.map.remove(&id)
    }

    pub fn peek(&self) -> Option<&TrackedPosition> {
        let (id, _) = self.queue.peek()?;
        self.map.get(id)
    }

    pub fn remove(&mut self, id: &PositionId) -> Option<TrackedPosition> {
        self.queue.remove(id);
        self.map.remove(id)
    }

    pub fn get(&self, id: &PositionId) -> Option<&TrackedPosition> {
        self.map.get(id)
    }

    pub fn contains(&self, id: &PositionId) -> bool {
        self.map.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Pop up to `limit` positions that are past expiry at `now`,
    /// earliest first
    pub fn pop_due(&mut self, now: Timestamp, limit: usize) -> Vec<TrackedPosition> {
        let mut due = Vec::new();
        while due.len() < limit {
            match self.peek() {
                Some(next) if next.is_due(now) => {}
                _ => break,
            }
            if let Some(position) = self.pop() {
                due.push(position);
            }
        }
        due
    }

    /// Collateral locked in tracked positions
    pub fn total_collateral(&self) -> u128 {
        self.map.values().fold(0u128, |acc, p| acc.saturating_add(p.collateral))
    }
}
