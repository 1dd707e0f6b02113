//! JSON-lines command journal
//!
//! Each non-empty line not starting with `#` is one `Entry`:
//!
//! ```text
//! {"at": 120, "command": {"deposit": {"provider": "<base58>", "amount": 1000}}}
//! ```
//!
//! `at` is the engine time the command executes at. Hook payloads travel as
//! base58 strings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strike_common::{Identity, OrderRef, PositionId, SignedPrice, Signature, Timestamp};
use strike_options::{OpenRequest, PermitArgs};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("failed to read journal {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("journal line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    // === token ===
    Mint { to: Identity, amount: u128 },
    Approve { owner: Identity, spender: Identity, amount: u128 },

    // === pool ===
    Deposit { provider: Identity, amount: u128 },
    Withdraw { provider: Identity, shares: u128 },
    Donate { donor: Identity, amount: u128 },
    Borrow { caller: Identity, amount: u128 },
    Repay { payer: Identity, loan_id: u64, amount: u128 },

    // === options ===
    Open {
        caller: Identity,
        request: OpenRequest,
        signature: Signature,
        #[serde(default)]
        permit: Option<PermitArgs>,
    },
    Settle { id: PositionId, oracle: SignedPrice },
    Hook {
        caller: Identity,
        order_ref: OrderRef,
        /// base58 `HookPayload`
        extra_data: String,
    },
    Expire { id: PositionId },
    Cancel { caller: Identity, id: PositionId },

    /// Advance time only
    Tick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub at: Timestamp,
    pub command: Command,
}

/// Parse one journal line; blank lines and `#` comments yield `None`
pub fn parse_line(text: &str, line: usize) -> Result<Option<Entry>, JournalError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|source| JournalError::Parse { line, source })
}

/// Incremental reader: each `poll` returns the entries appended since the
/// previous one
pub struct JournalReader {
    path: PathBuf,
    lines_read: usize,
    skipped: usize,
}

impl JournalReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lines_read: 0,
            skipped: 0,
        }
    }

    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Complete lines that failed to parse and were passed over
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn poll(&mut self) -> Result<Vec<Entry>, JournalError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| JournalError::Io {
            path: self.path.clone(),
            source,
        })?;

        let mut entries = Vec::new();
        let mut complete = 0;
        for (idx, raw) in text.split_inclusive('\n').enumerate().skip(self.lines_read) {
            // A line still being written has no newline yet
            if !raw.ends_with('\n') {
                break;
            }
            match parse_line(raw, idx + 1) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => {
                    // A complete line never changes, so retrying it cannot help
                    log::warn!("skipping {}", e);
                    self.skipped += 1;
                }
            }
            complete += 1;
        }
        self.lines_read += complete;
        Ok(entries)
    }
}
