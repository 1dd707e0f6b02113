//! Position storage, per-user index and request nonces
//!
//! The ledger owns every `Position`. Status moves only out of `Active`,
//! exactly once; `finalize` is the single place that writes a terminal
//! status.

use crate::auth::{NonceRegistry, OpenRequest};
use crate::position::{Position, PositionStatus};
use std::collections::BTreeMap;
use strike_common::{
    Domain, Identity, PositionId, ProtocolError, Result, StructHasher, Timestamp,
};

#[derive(Debug, Default)]
pub struct PositionLedger {
    positions: BTreeMap<PositionId, Position>,
    by_user: BTreeMap<Identity, Vec<PositionId>>,
    nonces: NonceRegistry,
    /// Bumped on every insert so identical inputs still get distinct ids
    sequence: u64,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nonces(&self) -> &NonceRegistry {
        &self.nonces
    }

    pub fn nonce_of(&self, user: &Identity) -> u64 {
        self.nonces.get(user)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, id: &PositionId) -> Result<&Position> {
        self.positions.get(id).ok_or(ProtocolError::UnknownPosition)
    }

    /// Positions opened by `user`, oldest first
    pub fn positions_of(&self, user: &Identity) -> Vec<&Position> {
        self.by_user
            .get(user)
            .map(|ids| ids.iter().filter_map(|id| self.positions.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn active_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values().filter(|p| p.is_active())
    }

    /// Identifier the next admitted request would get
    ///
    /// Depends on the domain, requester, order, nonce, open time and the
    /// ledger sequence, so it cannot be predicted without the ledger state
    /// and never repeats.
    pub fn next_id(&self, domain: &Domain, request: &OpenRequest, now: Timestamp) -> PositionId {
        let digest = StructHasher::new(
            "PositionId(bytes32 domain,bytes32 user,bytes32 orderReference,uint64 nonce,uint64 openTimestamp,uint64 sequence)",
        )
        .bytes32(&domain.separator())
        .identity(&request.user)
        .bytes32(&request.order_ref.0)
        .u64(request.nonce)
        .u64(now)
        .u64(self.sequence)
        .finish();
        PositionId(digest)
    }

    /// Store a new `Active` position for an authenticated request and
    /// consume the request nonce
    pub(crate) fn admit(
        &mut self,
        domain: &Domain,
        request: &OpenRequest,
        now: Timestamp,
    ) -> PositionId {
        let id = self.next_id(domain, request, now);
        let position = Position {
            id,
            user: request.user,
            collateral_token: request.collateral_token,
            collateral_amount: request.collateral_amount,
            potential_payout: request.potential_payout,
            expiry: request.expiry,
            terms: request.terms,
            open_price: request.open_price,
            order_ref: request.order_ref,
            status: PositionStatus::Active,
            open_timestamp: now,
        };

        self.positions.insert(id, position);
        self.by_user.entry(request.user).or_default().push(id);
        self.nonces.advance(&request.user);
        self.sequence += 1;
        id
    }

    /// The position, if it is still `Active`
    pub fn active(&self, id: &PositionId) -> Result<&Position> {
        let position = self.position(id)?;
        if !position.is_active() {
            return Err(ProtocolError::NotActive);
        }
        Ok(position)
    }

    /// Move an active position into terminal `status`
    pub(crate) fn finalize(&mut self, id: &PositionId, status: PositionStatus) -> Result<()> {
        debug_assert!(status.is_terminal());
        let position = self
            .positions
            .get_mut(id)
            .ok_or(ProtocolError::UnknownPosition)?;
        if !position.is_active() {
            return Err(ProtocolError::NotActive);
        }
        position.status = status;
        Ok(())
    }
}
