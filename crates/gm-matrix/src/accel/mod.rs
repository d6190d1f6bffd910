//! Accelerator dispatch.
//!
//! The core talks to devices only through [`AcceleratorCapability`]. A
//! process-wide [`AcceleratorHandle`] discovers the device once, and
//! [`AcceleratorMultiplier`] drives it for a single multiply at a time.

pub mod capability;
pub mod config;
pub mod handle;
pub mod host;
pub mod multiplier;

pub use capability::{
    AcceleratorCapability, BufferHandle, DeviceBuffer, DeviceInfo, KernelDispatch, MulParams,
    StorageMode, MUL_KERNEL,
};
pub use config::{AcceleratorConfig, BackendPreference};
pub use handle::{discover_default, AcceleratorHandle, AcceleratorState};
pub use host::HostDevice;
pub use multiplier::AcceleratorMultiplier;
