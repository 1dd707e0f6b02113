//! Pure Rust accounting model shared by the pool and options ledgers
//! No I/O, no unwrap/panic, all functions total

pub mod math;
pub mod helpers;

// Re-export commonly used types
pub use helpers::*;
pub use math::*;
