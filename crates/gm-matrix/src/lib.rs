//! `gm-matrix` - Dense matrix multiplication with interchangeable strategies.
//!
//! This crate provides:
//! - A row-major `Matrix<T>` over the element kinds u8, i32, u32 and f32
//! - A naive reference multiplier and a cache-blocked multiplier
//! - An accelerator multiplier that dispatches a kernel through the
//!   `AcceleratorCapability` trait (Metal behind the `metal` feature, or the
//!   in-process `HostDevice`)
//! - An equivalence oracle for comparing results across strategies

pub mod accel;
pub mod cpu;
pub mod element;
pub mod error;
pub mod matrix;
#[cfg(feature = "metal")]
pub mod metal;
pub mod multiplier;
pub mod oracle;

// Re-export primary types at the crate root for convenience.
pub use accel::{
    AcceleratorCapability, AcceleratorConfig, AcceleratorHandle, AcceleratorMultiplier,
    AcceleratorState, BackendPreference, HostDevice,
};
pub use cpu::{BlockedMultiplier, NaiveMultiplier, BLOCK_SIZE};
pub use element::{type_size, Element, ElementKind};
pub use error::{AcceleratorError, MatrixError, Result};
pub use matrix::Matrix;
pub use multiplier::{check_dims, multiply, Multiplier, Strategy};
pub use oracle::{approx_eq, approx_eq_within, max_abs_diff, EPSILON};
