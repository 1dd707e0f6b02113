//! Domain-separated typed digests and signature verification
//!
//! Every signed message (open requests, oracle prices, permits) is hashed as
//! `sha256(0x19 0x01 || domain_separator || struct_hash)`, where
//! `struct_hash` starts with the hash of a type tag. A signature made for one
//! deployment or one message type never verifies for another.

use crate::interfaces::SignatureVerifier;
use crate::types::{Digest, Identity, Signature};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// Signing domain for one deployment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    /// Identity of the ledger that verifies the signatures
    pub verifying_party: Identity,
}

impl Default for Domain {
    fn default() -> Self {
        Self {
            name: "Strike".to_string(),
            version: "1".to_string(),
            chain_id: 1,
            verifying_party: Identity::default(),
        }
    }
}

impl Domain {
    pub fn separator(&self) -> Digest {
        StructHasher::new("Domain(string name,string version,uint64 chainId,bytes32 verifyingParty)")
            .bytes(self.name.as_bytes())
            .bytes(self.version.as_bytes())
            .u64(self.chain_id)
            .identity(&self.verifying_party)
            .finish()
    }

    /// Final digest a signer signs for `struct_hash` under this domain
    pub fn typed_digest(&self, struct_hash: &Digest) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update([0x19, 0x01]);
        hasher.update(self.separator());
        hasher.update(struct_hash);
        hasher.finalize().into()
    }
}

/// Incremental struct hash: type tag hash followed by fixed-width fields
pub struct StructHasher(Sha256);

impl StructHasher {
    pub fn new(type_tag: &str) -> Self {
        let type_hash: Digest = Sha256::digest(type_tag.as_bytes()).into();
        let mut hasher = Sha256::new();
        hasher.update(type_hash);
        Self(hasher)
    }

    pub fn identity(mut self, id: &Identity) -> Self {
        self.0.update(id.0);
        self
    }

    pub fn bytes32(mut self, raw: &[u8; 32]) -> Self {
        self.0.update(raw);
        self
    }

    /// Variable-length field, hashed first so field boundaries stay unambiguous
    pub fn bytes(mut self, raw: &[u8]) -> Self {
        let h: Digest = Sha256::digest(raw).into();
        self.0.update(h);
        self
    }

    pub fn u128(mut self, v: u128) -> Self {
        self.0.update(v.to_le_bytes());
        self
    }

    pub fn u64(mut self, v: u64) -> Self {
        self.0.update(v.to_le_bytes());
        self
    }

    pub fn u8(mut self, v: u8) -> Self {
        self.0.update([v]);
        self
    }

    pub fn bool(self, v: bool) -> Self {
        self.u8(v as u8)
    }

    pub fn finish(self) -> Digest {
        self.0.finalize().into()
    }
}

/// Production verifier: Ed25519 over the 32-byte digest
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn recover(&self, digest: &Digest, signature: &Signature) -> Option<Identity> {
        let key = VerifyingKey::from_bytes(&signature.signer.0).ok()?;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.bytes);
        key.verify_strict(digest, &sig).ok()?;
        Some(signature.signer)
    }
}

/// Identity of an Ed25519 signing key
pub fn identity_of(key: &SigningKey) -> Identity {
    Identity(key.verifying_key().to_bytes())
}

/// Sign a typed digest
pub fn sign_digest(key: &SigningKey, digest: &Digest) -> Signature {
    Signature::new(identity_of(key), key.sign(digest).to_bytes())
}
