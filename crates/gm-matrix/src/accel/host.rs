use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::accel::capability::{
    AcceleratorCapability, BufferHandle, DeviceInfo, KernelDispatch, MulParams, StorageMode,
    MUL_KERNEL,
};
use crate::element::{Element, ElementKind};
use crate::error::AcceleratorError;

#[derive(Debug)]
struct HostBuffer {
    bytes: Vec<u8>,
    mode: StorageMode,
}

/// Software accelerator that runs kernels on the calling thread.
///
/// Stands in for a hardware device where none is present. Buffers are plain
/// host allocations keyed by handle, and the kernel program maps `mul` to a
/// host kernel that computes one output element per work item, the same
/// decomposition a GPU dispatch uses.
#[derive(Debug, Default)]
pub struct HostDevice {
    buffers: Mutex<HashMap<u64, HostBuffer>>,
    next_id: AtomicU64,
}

impl HostDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffers allocated and not yet released.
    pub fn live_buffers(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, HostBuffer>> {
        // Every mutation under the lock is a single insert/remove/copy.
        self.buffers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_bytes(&self, handle: BufferHandle) -> Result<Vec<u8>, AcceleratorError> {
        let buffers = self.lock();
        let buf = buffers
            .get(&handle.id())
            .ok_or(AcceleratorError::UnknownBuffer(handle.id()))?;
        Ok(buf.bytes.clone())
    }

    fn run_mul(&self, dispatch: &KernelDispatch<'_>) -> Result<(), AcceleratorError> {
        match dispatch.element {
            ElementKind::U8 => self.run_mul_typed::<u8>(dispatch),
            ElementKind::I32 => self.run_mul_typed::<i32>(dispatch),
            ElementKind::U32 => self.run_mul_typed::<u32>(dispatch),
            ElementKind::F32 => self.run_mul_typed::<f32>(dispatch),
        }
    }

    fn run_mul_typed<T: Element>(
        &self,
        dispatch: &KernelDispatch<'_>,
    ) -> Result<(), AcceleratorError> {
        let [lhs, rhs] = dispatch.inputs else {
            return Err(AcceleratorError::Dispatch(format!(
                "{} expects 2 input buffers, got {}",
                MUL_KERNEL,
                dispatch.inputs.len()
            )));
        };

        let params_bytes = self.read_bytes(dispatch.params)?;
        if params_bytes.len() < std::mem::size_of::<MulParams>() {
            return Err(AcceleratorError::SizeMismatch {
                expected: std::mem::size_of::<MulParams>(),
                got: params_bytes.len(),
            });
        }
        let params: MulParams =
            bytemuck::pod_read_unaligned(&params_bytes[..std::mem::size_of::<MulParams>()]);
        let col_a = params.col_a as usize;
        let col_b = params.col_b as usize;
        if col_b == 0 {
            return Err(AcceleratorError::Dispatch("col_b must be positive".to_string()));
        }

        let a: Vec<T> = bytemuck::pod_collect_to_vec(&self.read_bytes(*lhs)?);
        let b: Vec<T> = bytemuck::pod_collect_to_vec(&self.read_bytes(*rhs)?);

        let rows = dispatch.work_size / col_b;
        if a.len() < rows * col_a || b.len() < col_a * col_b {
            return Err(AcceleratorError::Dispatch(format!(
                "input buffers too small for [{}x{}] @ [{}x{}]",
                rows, col_a, col_a, col_b
            )));
        }

        let mut out = vec![T::zero(); dispatch.work_size];
        for (gid, cell) in out.iter_mut().enumerate() {
            let row = gid / col_b;
            let col = gid % col_b;
            let mut sum = T::zero();
            for k in 0..col_a {
                sum = T::mul_add(sum, a[row * col_a + k], b[k * col_b + col]);
            }
            *cell = sum;
        }

        let mut buffers = self.lock();
        let dst = buffers
            .get_mut(&dispatch.output.id())
            .ok_or(AcceleratorError::UnknownBuffer(dispatch.output.id()))?;
        let out_bytes: &[u8] = bytemuck::cast_slice(&out);
        if dst.bytes.len() < out_bytes.len() {
            return Err(AcceleratorError::SizeMismatch {
                expected: out_bytes.len(),
                got: dst.bytes.len(),
            });
        }
        dst.bytes[..out_bytes.len()].copy_from_slice(out_bytes);
        Ok(())
    }
}

impl AcceleratorCapability for HostDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "host".to_string(),
            headless: true,
            ..DeviceInfo::default()
        }
    }

    fn allocate_buffer(
        &self,
        size_in_bytes: usize,
        mode: StorageMode,
    ) -> Result<BufferHandle, AcceleratorError> {
        if size_in_bytes == 0 {
            return Err(AcceleratorError::Allocation { size: 0 });
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(
            id,
            HostBuffer {
                bytes: vec![0; size_in_bytes],
                mode,
            },
        );
        Ok(BufferHandle::new(id))
    }

    fn write_buffer(&self, handle: BufferHandle, bytes: &[u8]) -> Result<(), AcceleratorError> {
        let mut buffers = self.lock();
        let buf = buffers
            .get_mut(&handle.id())
            .ok_or(AcceleratorError::UnknownBuffer(handle.id()))?;
        if buf.mode != StorageMode::Shared {
            return Err(AcceleratorError::NotHostVisible(handle.id()));
        }
        if bytes.len() > buf.bytes.len() {
            return Err(AcceleratorError::SizeMismatch {
                expected: buf.bytes.len(),
                got: bytes.len(),
            });
        }
        buf.bytes[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn read_buffer(&self, handle: BufferHandle, out: &mut [u8]) -> Result<(), AcceleratorError> {
        let buffers = self.lock();
        let buf = buffers
            .get(&handle.id())
            .ok_or(AcceleratorError::UnknownBuffer(handle.id()))?;
        if buf.mode != StorageMode::Shared {
            return Err(AcceleratorError::NotHostVisible(handle.id()));
        }
        if out.len() > buf.bytes.len() {
            return Err(AcceleratorError::SizeMismatch {
                expected: buf.bytes.len(),
                got: out.len(),
            });
        }
        out.copy_from_slice(&buf.bytes[..out.len()]);
        Ok(())
    }

    fn dispatch(&self, dispatch: &KernelDispatch<'_>) -> Result<(), AcceleratorError> {
        match dispatch.kernel {
            MUL_KERNEL => self.run_mul(dispatch),
            other => Err(AcceleratorError::UnknownKernel(other.to_string())),
        }
    }

    fn release_buffer(&self, handle: BufferHandle) {
        self.lock().remove(&handle.id());
    }
}
