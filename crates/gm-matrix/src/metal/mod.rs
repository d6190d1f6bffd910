//! Metal accelerator binding (macOS only, feature `metal`).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2_foundation::NSString;
use objc2_metal::{
    MTLBuffer, MTLCommandBuffer, MTLCommandBufferStatus, MTLCommandEncoder, MTLCommandQueue,
    MTLCompileOptions, MTLComputeCommandEncoder, MTLComputePipelineState,
    MTLCreateSystemDefaultDevice, MTLDevice, MTLLanguageVersion, MTLLibrary, MTLResourceOptions,
    MTLSize,
};

use crate::accel::capability::{
    AcceleratorCapability, BufferHandle, DeviceInfo, KernelDispatch, StorageMode, MUL_KERNEL,
};
use crate::accel::config::AcceleratorConfig;
use crate::element::ElementKind;
use crate::error::AcceleratorError;

/// Kernel program compiled when the device is discovered.
const MUL_SOURCE: &str = include_str!("mul.metal");

// MTLCreateSystemDefaultDevice returns nil in headless processes unless
// CoreGraphics is linked.
#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {}

type Device = Retained<ProtocolObject<dyn MTLDevice>>;
type Queue = Retained<ProtocolObject<dyn MTLCommandQueue>>;
type Pipeline = Retained<ProtocolObject<dyn MTLComputePipelineState>>;
type Buffer = Retained<ProtocolObject<dyn MTLBuffer>>;

struct MetalBuffer {
    buffer: Buffer,
    mode: StorageMode,
}

/// Metal GPU device.
///
/// Owns the system default device, one command queue and a compute
/// pipeline per element kind of the `mul` kernel.
pub struct MetalDevice {
    device: Device,
    queue: Queue,
    pipelines: HashMap<String, Pipeline>,
    buffers: Mutex<HashMap<u64, MetalBuffer>>,
    next_id: AtomicU64,
    threads_per_group: usize,
}

// SAFETY: MTLDevice, MTLCommandQueue and MTLComputePipelineState are
// thread-safe per Apple's documentation. Buffers are only reached through
// the `buffers` mutex, and each command buffer is created, encoded and
// waited on by a single call.
unsafe impl Send for MetalDevice {}
unsafe impl Sync for MetalDevice {}

impl MetalDevice {
    /// Discover the system default device and compile the kernel program.
    pub fn discover(config: &AcceleratorConfig) -> Result<Self, AcceleratorError> {
        let device = MTLCreateSystemDefaultDevice().ok_or(AcceleratorError::DeviceNotFound)?;
        let queue = device
            .newCommandQueue()
            .ok_or_else(|| {
                AcceleratorError::Compile("failed to create command queue".to_string())
            })?;

        let options = MTLCompileOptions::new();
        options.setLanguageVersion(MTLLanguageVersion::Version2_4);
        let library = device
            .newLibraryWithSource_options_error(&NSString::from_str(MUL_SOURCE), Some(&options))
            .map_err(|e| AcceleratorError::Compile(e.localizedDescription().to_string()))?;

        let mut pipelines = HashMap::new();
        for kind in ElementKind::ALL {
            let name = kernel_name(MUL_KERNEL, kind);
            let function = library
                .newFunctionWithName(&NSString::from_str(&name))
                .ok_or_else(|| AcceleratorError::UnknownKernel(name.clone()))?;
            let pipeline = device
                .newComputePipelineStateWithFunction_error(&function)
                .map_err(|e| AcceleratorError::Compile(e.localizedDescription().to_string()))?;
            pipelines.insert(name, pipeline);
        }

        Ok(MetalDevice {
            device,
            queue,
            pipelines,
            buffers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            threads_per_group: config.threads_per_group.max(1),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, MetalBuffer>> {
        self.buffers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn buffer(&self, handle: BufferHandle) -> Result<Buffer, AcceleratorError> {
        self.lock()
            .get(&handle.id())
            .map(|b| b.buffer.clone())
            .ok_or(AcceleratorError::UnknownBuffer(handle.id()))
    }

    /// Returns the host pointer and length of a shared buffer.
    fn host_view(&self, handle: BufferHandle) -> Result<(Buffer, usize), AcceleratorError> {
        let buffers = self.lock();
        let entry = buffers
            .get(&handle.id())
            .ok_or(AcceleratorError::UnknownBuffer(handle.id()))?;
        if entry.mode != StorageMode::Shared {
            return Err(AcceleratorError::NotHostVisible(handle.id()));
        }
        Ok((entry.buffer.clone(), entry.buffer.length()))
    }
}

impl std::fmt::Debug for MetalDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetalDevice")
            .field("name", &self.device.name().to_string())
            .field("kernels", &self.pipelines.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AcceleratorCapability for MetalDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: self.device.name().to_string(),
            headless: self.device.isHeadless(),
            low_power: self.device.isLowPower(),
            removable: self.device.isRemovable(),
            registry_id: self.device.registryID(),
        }
    }

    fn allocate_buffer(
        &self,
        size_in_bytes: usize,
        mode: StorageMode,
    ) -> Result<BufferHandle, AcceleratorError> {
        let options = match mode {
            StorageMode::Shared => MTLResourceOptions::StorageModeShared,
            StorageMode::Private => MTLResourceOptions::StorageModePrivate,
        };
        let buffer = self
            .device
            .newBufferWithLength_options(size_in_bytes, options)
            .ok_or(AcceleratorError::Allocation {
                size: size_in_bytes,
            })?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, MetalBuffer { buffer, mode });
        Ok(BufferHandle::new(id))
    }

    fn write_buffer(&self, handle: BufferHandle, bytes: &[u8]) -> Result<(), AcceleratorError> {
        let (buffer, len) = self.host_view(handle)?;
        if bytes.len() > len {
            return Err(AcceleratorError::SizeMismatch {
                expected: len,
                got: bytes.len(),
            });
        }
        // SAFETY: shared-mode contents are host-visible for `len` bytes and no
        // command buffer using this buffer is in flight outside `dispatch`.
        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                buffer.contents().as_ptr().cast::<u8>(),
                bytes.len(),
            );
        }
        Ok(())
    }

    fn read_buffer(&self, handle: BufferHandle, out: &mut [u8]) -> Result<(), AcceleratorError> {
        let (buffer, len) = self.host_view(handle)?;
        if out.len() > len {
            return Err(AcceleratorError::SizeMismatch {
                expected: len,
                got: out.len(),
            });
        }
        // SAFETY: as in `write_buffer`.
        unsafe {
            std::ptr::copy_nonoverlapping(
                buffer.contents().as_ptr().cast::<u8>(),
                out.as_mut_ptr(),
                out.len(),
            );
        }
        Ok(())
    }

    fn dispatch(&self, dispatch: &KernelDispatch<'_>) -> Result<(), AcceleratorError> {
        let name = kernel_name(dispatch.kernel, dispatch.element);
        let pipeline = self
            .pipelines
            .get(&name)
            .ok_or_else(|| AcceleratorError::UnknownKernel(name.clone()))?;

        let mut bound = Vec::with_capacity(dispatch.inputs.len() + 2);
        for handle in dispatch.inputs {
            bound.push(self.buffer(*handle)?);
        }
        bound.push(self.buffer(dispatch.output)?);
        bound.push(self.buffer(dispatch.params)?);

        let command_buffer = self
            .queue
            .commandBuffer()
            .ok_or_else(|| {
                AcceleratorError::Dispatch("failed to create command buffer".to_string())
            })?;
        let encoder = command_buffer
            .computeCommandEncoder()
            .ok_or_else(|| {
                AcceleratorError::Dispatch("failed to create compute encoder".to_string())
            })?;

        encoder.setComputePipelineState(pipeline);
        for (index, buffer) in bound.iter().enumerate() {
            // SAFETY: every buffer outlives the command buffer, which is
            // waited on below before `bound` is dropped.
            unsafe { encoder.setBuffer_offset_atIndex(Some(buffer), 0, index) };
        }

        let width = self
            .threads_per_group
            .min(pipeline.maxTotalThreadsPerThreadgroup())
            .max(1);
        encoder.dispatchThreads_threadsPerThreadgroup(
            MTLSize {
                width: dispatch.work_size,
                height: 1,
                depth: 1,
            },
            MTLSize {
                width,
                height: 1,
                depth: 1,
            },
        );
        encoder.endEncoding();

        command_buffer.commit();
        command_buffer.waitUntilCompleted();

        if command_buffer.status() == MTLCommandBufferStatus::Error {
            let reason = command_buffer
                .error()
                .map(|e| e.localizedDescription().to_string())
                .unwrap_or_else(|| "command buffer failed".to_string());
            return Err(AcceleratorError::Dispatch(reason));
        }
        Ok(())
    }

    fn release_buffer(&self, handle: BufferHandle) {
        self.lock().remove(&handle.id());
    }
}

/// Name of the typed variant of `kernel` in the Metal library.
fn kernel_name(kernel: &str, kind: ElementKind) -> String {
    format!("{}_{}", kernel, kind)
}
