//! Identifier and signature types shared by every ledger
//!
//! All identifiers are 32 bytes, printed and parsed as base58 the way
//! account keys are. Serde goes through the base58 string form so config
//! files and journals stay human-editable.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// SHA-256 output
pub type Digest = [u8; 32];

/// Seconds since the Unix epoch
pub type Timestamp = u64;

macro_rules! id32 {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&bs58::encode(self.0).into_string())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = bs58::decode(s).into_vec().map_err(|_| ParseIdError)?;
                let bytes: [u8; 32] = bytes.try_into().map_err(|_| ParseIdError)?;
                Ok(Self(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

id32!(
    /// Account identity (an Ed25519 public key in production wiring)
    Identity
);

id32!(
    /// Position identifier, derived by the position ledger
    PositionId
);

id32!(
    /// Opaque reference to an order on the external matching venue
    OrderRef
);

/// Failed to parse a base58 identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("expected 32 bytes of base58")]
pub struct ParseIdError;

/// A signature together with the identity that claims to have produced it
///
/// Verifiers "recover" by checking `bytes` against `signer` and returning
/// the signer only when it checks out.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub signer: Identity,
    pub bytes: [u8; 64],
}

impl Signature {
    pub const LEN: usize = 96;

    pub fn new(signer: Identity, bytes: [u8; 64]) -> Self {
        Self { signer, bytes }
    }

    /// `signer || bytes`
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[..32].copy_from_slice(&self.signer.0);
        out[32..].copy_from_slice(&self.bytes);
        out
    }

    pub fn from_bytes(raw: &[u8; Self::LEN]) -> Self {
        let mut signer = [0u8; 32];
        let mut bytes = [0u8; 64];
        signer.copy_from_slice(&raw[..32]);
        bytes.copy_from_slice(&raw[32..]);
        Self::new(Identity(signer), bytes)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("signer", &self.signer)
            .field("bytes", &bs58::encode(self.bytes).into_string())
            .finish()
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&bs58::encode(self.to_bytes()).into_string())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = bs58::decode(&s).into_vec().map_err(de::Error::custom)?;
        let raw: [u8; Signature::LEN] = raw
            .try_into()
            .map_err(|_| de::Error::custom("expected 96 bytes of base58"))?;
        Ok(Signature::from_bytes(&raw))
    }
}
