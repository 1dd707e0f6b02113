//! Shared types, errors, events and collaborator interfaces for the
//! Strike pool and options ledgers.

pub mod types;
pub mod error;
pub mod events;
pub mod interfaces;
pub mod crypto;
pub mod guard;
pub mod payload;
pub mod token;

pub use types::*;
pub use error::*;
pub use events::*;
pub use interfaces::*;
pub use crypto::*;
pub use guard::*;
pub use payload::*;
pub use token::*;
