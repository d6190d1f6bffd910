use std::fmt::{self, Debug};

use bytemuck::{Pod, Zeroable};

use crate::element::ElementKind;
use crate::error::AcceleratorError;

/// Name of the matrix multiply kernel in every device program.
pub const MUL_KERNEL: &str = "mul";

/// Where a device buffer lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageMode {
    /// System memory visible to both host and device.
    Shared,
    /// Device-only memory; the host cannot read or write it.
    Private,
}

/// Opaque handle to a buffer allocated on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(u64);

impl BufferHandle {
    pub fn new(id: u64) -> Self {
        BufferHandle(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Description of the device behind a capability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    /// True if the device has no display attached.
    pub headless: bool,
    pub low_power: bool,
    /// True if the device can be unplugged at runtime (e.g., an eGPU).
    pub removable: bool,
    pub registry_id: u64,
}

/// Parameter block passed to the `mul` kernel.
///
/// Layout matches the `MulParams` struct in the device kernel sources.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct MulParams {
    /// Columns of the left operand (the shared dimension).
    pub col_a: u32,
    /// Columns of the right operand and of the output.
    pub col_b: u32,
}

impl MulParams {
    pub fn new(col_a: usize, col_b: usize) -> Result<Self, AcceleratorError> {
        Ok(MulParams {
            col_a: u32::try_from(col_a).map_err(|_| AcceleratorError::ParamsOverflow(col_a))?,
            col_b: u32::try_from(col_b).map_err(|_| AcceleratorError::ParamsOverflow(col_b))?,
        })
    }
}

/// A single kernel launch.
#[derive(Debug, Clone, Copy)]
pub struct KernelDispatch<'a> {
    /// Kernel name as it appears in the device program.
    pub kernel: &'a str,
    /// Element kind of the buffers; selects the typed kernel variant.
    pub element: ElementKind,
    pub inputs: &'a [BufferHandle],
    pub output: BufferHandle,
    pub params: BufferHandle,
    /// Number of work items, one per output element.
    pub work_size: usize,
}

/// Trait for external compute devices.
///
/// Implemented by platform bindings (Metal, the host emulator) and consumed
/// by [`AcceleratorMultiplier`](crate::accel::AcceleratorMultiplier). The
/// core only ever names kernels; the kernel program itself is owned by the
/// implementation.
pub trait AcceleratorCapability: Debug + Send + Sync {
    /// Describes the underlying device.
    fn info(&self) -> DeviceInfo;

    /// Allocates a buffer of `size_in_bytes`.
    fn allocate_buffer(
        &self,
        size_in_bytes: usize,
        mode: StorageMode,
    ) -> Result<BufferHandle, AcceleratorError>;

    /// Copies `bytes` into the start of a host-visible buffer.
    fn write_buffer(&self, handle: BufferHandle, bytes: &[u8]) -> Result<(), AcceleratorError>;

    /// Copies the start of a host-visible buffer into `out`.
    fn read_buffer(&self, handle: BufferHandle, out: &mut [u8]) -> Result<(), AcceleratorError>;

    /// Runs a kernel and blocks until the device reports completion.
    ///
    /// There is no timeout; callers wanting bounded latency must impose it
    /// from another thread.
    fn dispatch(&self, dispatch: &KernelDispatch<'_>) -> Result<(), AcceleratorError>;

    /// Frees a buffer. Releasing an unknown handle is a no-op.
    fn release_buffer(&self, handle: BufferHandle);
}

/// A device buffer released when dropped.
#[derive(Debug)]
pub struct DeviceBuffer<'d> {
    device: &'d dyn AcceleratorCapability,
    handle: BufferHandle,
    size: usize,
}

impl<'d> DeviceBuffer<'d> {
    /// Allocates a buffer on `device`.
    pub fn allocate(
        device: &'d dyn AcceleratorCapability,
        size: usize,
        mode: StorageMode,
    ) -> Result<Self, AcceleratorError> {
        let handle = device.allocate_buffer(size, mode)?;
        Ok(DeviceBuffer {
            device,
            handle,
            size,
        })
    }

    /// Allocates a shared buffer initialized with `bytes`.
    pub fn with_bytes(
        device: &'d dyn AcceleratorCapability,
        bytes: &[u8],
    ) -> Result<Self, AcceleratorError> {
        let buffer = Self::allocate(device, bytes.len(), StorageMode::Shared)?;
        device.write_buffer(buffer.handle, bytes)?;
        Ok(buffer)
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Reads the whole buffer into `out`, which must be exactly `size` bytes.
    pub fn read_into(&self, out: &mut [u8]) -> Result<(), AcceleratorError> {
        if out.len() != self.size {
            return Err(AcceleratorError::SizeMismatch {
                expected: self.size,
                got: out.len(),
            });
        }
        self.device.read_buffer(self.handle, out)
    }
}

impl Drop for DeviceBuffer<'_> {
    fn drop(&mut self) {
        self.device.release_buffer(self.handle);
    }
}
