//! Binary option positions settled against a signed oracle price

pub mod position;
pub mod auth;
pub mod admin;
pub mod ledger;
pub mod settlement;

pub use position::*;
pub use auth::*;
pub use admin::*;
pub use ledger::*;
pub use settlement::*;
