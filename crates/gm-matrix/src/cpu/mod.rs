//! Pure-Rust CPU multipliers.
//!
//! `NaiveMultiplier` is the correctness baseline; `BlockedMultiplier` tiles
//! the loop nest for cache reuse and must agree with it under the oracle.

pub mod blocked;
pub mod naive;

pub use blocked::{BlockedMultiplier, BLOCK_SIZE};
pub use naive::NaiveMultiplier;
