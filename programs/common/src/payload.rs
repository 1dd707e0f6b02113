//! Oracle price data and the order-hook payload
//!
//! The matching venue hands the pre-transfer hook an opaque byte string.
//! It decodes to `(position_id, signed oracle price)` with the fixed
//! little-endian layout below. All readers bounds-check and return
//! `MalformedPayload` on short input.
//!
//! ```text
//! offset  size  field
//!      0    32  position id
//!     32    16  price (u128)
//!     48     8  timestamp (u64)
//!     56    32  signer
//!     88    64  signature bytes
//! ```

use crate::crypto::{Domain, StructHasher};
use crate::error::{ProtocolError, Result};
use crate::types::{Digest, PositionId, Signature, Timestamp};
use serde::{Deserialize, Serialize};

/// A price observation from the designated oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OraclePrice {
    pub price: u128,
    pub timestamp: Timestamp,
}

impl OraclePrice {
    pub fn struct_hash(&self) -> Digest {
        StructHasher::new("OracleData(uint128 price,uint64 timestamp)")
            .u128(self.price)
            .u64(self.timestamp)
            .finish()
    }

    /// Digest the oracle signs under `domain`
    pub fn digest(&self, domain: &Domain) -> Digest {
        domain.typed_digest(&self.struct_hash())
    }
}

/// Oracle price plus the oracle's signature over it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPrice {
    pub data: OraclePrice,
    pub signature: Signature,
}

/// Decoded pre-transfer hook payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookPayload {
    pub position_id: PositionId,
    pub oracle: SignedPrice,
}

impl HookPayload {
    pub const LEN: usize = 32 + 16 + 8 + Signature::LEN;

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::LEN);
        out.extend_from_slice(&self.position_id.0);
        out.extend_from_slice(&self.oracle.data.price.to_le_bytes());
        out.extend_from_slice(&self.oracle.data.timestamp.to_le_bytes());
        out.extend_from_slice(&self.oracle.signature.to_bytes());
        out
    }

    /// Decode; trailing bytes after the fixed layout are rejected
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = PayloadReader::new(data);
        let position_id = PositionId(reader.read_bytes::<32>()?);
        let price = reader.read_u128()?;
        let timestamp = reader.read_u64()?;
        let signature = Signature::from_bytes(&reader.read_bytes::<{ Signature::LEN }>()?);

        if reader.remaining() != 0 {
            return Err(ProtocolError::MalformedPayload);
        }

        Ok(Self {
            position_id,
            oracle: SignedPrice {
                data: OraclePrice { price, timestamp },
                signature,
            },
        })
    }
}

/// Read a u64 (little-endian) from payload data
#[inline]
pub fn read_u64(data: &[u8], offset: usize) -> Result<u64> {
    Ok(u64::from_le_bytes(read_bytes(data, offset)?))
}

/// Read a u128 (little-endian) from payload data
#[inline]
pub fn read_u128(data: &[u8], offset: usize) -> Result<u128> {
    Ok(u128::from_le_bytes(read_bytes(data, offset)?))
}

/// Read a fixed-size byte array from payload data
#[inline]
pub fn read_bytes<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N]> {
    let end = offset.checked_add(N).ok_or(ProtocolError::MalformedPayload)?;
    if end > data.len() {
        return Err(ProtocolError::MalformedPayload);
    }
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(&data[offset..end]);
    Ok(bytes)
}

/// Payload reader with tracked offset
pub struct PayloadReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> PayloadReader<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    #[inline]
    pub fn read_u64(&mut self) -> Result<u64> {
        let val = read_u64(self.data, self.offset)?;
        self.offset += 8;
        Ok(val)
    }

    #[inline]
    pub fn read_u128(&mut self) -> Result<u128> {
        let val = read_u128(self.data, self.offset)?;
        self.offset += 16;
        Ok(val)
    }

    #[inline]
    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let val = read_bytes(self.data, self.offset)?;
        self.offset += N;
        Ok(val)
    }
}
