use crate::accel::capability::{DeviceBuffer, KernelDispatch, MulParams, StorageMode, MUL_KERNEL};
use crate::accel::handle::AcceleratorHandle;
use crate::element::Element;
use crate::error::{MatrixError, Result};
use crate::matrix::{check_shape, Matrix};
use crate::multiplier::{check_dims, Multiplier};

/// Multiplier that runs the `mul` kernel on an accelerator device.
///
/// Each call allocates its own device buffers and releases them before
/// returning, whether or not the call succeeds, so independent calls may run
/// concurrently. A failed call does not affect the handle.
#[derive(Debug, Clone, Copy)]
pub struct AcceleratorMultiplier<'h> {
    handle: &'h AcceleratorHandle,
}

impl<'h> AcceleratorMultiplier<'h> {
    pub fn new(handle: &'h AcceleratorHandle) -> Self {
        AcceleratorMultiplier { handle }
    }

    /// Returns true if the handle has a usable device.
    pub fn available(&self) -> bool {
        self.handle.available()
    }

    pub fn handle(&self) -> &'h AcceleratorHandle {
        self.handle
    }
}

impl AcceleratorMultiplier<'static> {
    /// Multiplier bound to the process-wide handle.
    pub fn global() -> Self {
        AcceleratorMultiplier::new(AcceleratorHandle::global())
    }
}

impl Multiplier for AcceleratorMultiplier<'_> {
    fn name(&self) -> &str {
        "accelerator"
    }

    fn multiply<T: Element>(&self, m: &Matrix<T>, n: &Matrix<T>) -> Result<Matrix<T>> {
        check_dims(m, n)?;
        let acquired = self.handle.device()?;
        let device = &*acquired;

        let rows = m.rows();
        let cols = n.cols();
        let len = check_shape(rows, cols)?;
        let params = MulParams::new(m.cols(), cols)?;

        let a = DeviceBuffer::with_bytes(device, bytemuck::cast_slice(m.data()))?;
        let b = DeviceBuffer::with_bytes(device, bytemuck::cast_slice(n.data()))?;
        let out_size = len
            .checked_mul(T::KIND.size_in_bytes())
            .ok_or(MatrixError::TooLarge { rows, cols })?;
        let out = DeviceBuffer::allocate(device, out_size, StorageMode::Shared)?;
        let dp = DeviceBuffer::with_bytes(device, bytemuck::bytes_of(&params))?;

        device.dispatch(&KernelDispatch {
            kernel: MUL_KERNEL,
            element: T::KIND,
            inputs: &[a.handle(), b.handle()],
            output: out.handle(),
            params: dp.handle(),
            work_size: len,
        })?;

        let mut data = vec![T::zero(); len];
        out.read_into(bytemuck::cast_slice_mut(&mut data))?;
        Matrix::new(rows, cols, data)
    }
}
