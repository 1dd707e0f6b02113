//! Error taxonomy for every ledger operation
//!
//! Each variant aborts the single call in progress. No ledger commits
//! state on an error path, so callers may resubmit without cleanup.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    // === pool ===
    #[error("amount must be non-zero")]
    InvalidAmount,

    #[error("insufficient pool liquidity")]
    InsufficientLiquidity,

    #[error("insufficient LP shares")]
    InsufficientShares,

    #[error("loan id out of range")]
    InvalidLoan,

    #[error("loan already settled")]
    AlreadySettled,

    // === request authentication ===
    #[error("request deadline passed")]
    Expired,

    #[error("nonce does not match the registry")]
    InvalidNonce,

    #[error("request signature does not recover to the user")]
    InvalidSignature,

    // === positions ===
    #[error("expiry too close to the current time")]
    InvalidExpiry,

    #[error("range bounds are inverted")]
    InvalidBounds,

    #[error("collateral token is not the pool asset")]
    UnsupportedCollateral,

    #[error("position not found")]
    UnknownPosition,

    #[error("position is not active")]
    NotActive,

    #[error("position cannot be settled yet")]
    TooEarly,

    #[error("order reference does not match the position")]
    OrderMismatch,

    // === oracle ===
    #[error("oracle signature does not recover to the oracle")]
    InvalidOracleSignature,

    #[error("oracle timestamp outside the position lifetime")]
    OracleDataOutOfRange,

    #[error("hook payload is malformed")]
    MalformedPayload,

    // === administration ===
    #[error("caller lacks the required role")]
    Unauthorized,

    #[error("fee rate above the 5% ceiling")]
    FeeTooHigh,

    #[error("re-entrant call rejected")]
    Reentrancy,

    #[error("arithmetic overflow")]
    Overflow,

    // === token collaborator ===
    #[error("insufficient token balance")]
    InsufficientBalance,

    #[error("insufficient token allowance")]
    InsufficientAllowance,

    #[error("permit deadline passed")]
    ExpiredPermit,

    #[error("permit signature does not recover to the owner")]
    InvalidPermitSignature,
}
