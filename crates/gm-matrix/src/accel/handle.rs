use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use crate::accel::capability::AcceleratorCapability;
use crate::accel::config::{AcceleratorConfig, BackendPreference};
use crate::accel::host::HostDevice;
use crate::error::{AcceleratorError, MatrixError, Result};

/// Lifecycle of an [`AcceleratorHandle`].
///
/// ```text
/// Uninitialized -> Initializing -> Ready -> Released
///                               \-> Unavailable
/// ```
///
/// `Unavailable` and `Released` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceleratorState {
    Uninitialized,
    Initializing,
    Ready,
    Unavailable,
    Released,
}

type DiscoverResult = std::result::Result<Arc<dyn AcceleratorCapability>, AcceleratorError>;
type Discover = Box<dyn Fn(&AcceleratorConfig) -> DiscoverResult + Send + Sync>;

enum Slot {
    /// `None` once the handle has been shut down.
    Ready(RwLock<Option<Arc<dyn AcceleratorCapability>>>),
    Unavailable(String),
}

/// Lazily discovered accelerator device.
///
/// Discovery runs exactly once, on the first call that needs the device;
/// concurrent callers block until it finishes. A failed discovery is cached
/// and never retried. [`AcceleratorHandle::shutdown`] drops the handle's
/// reference to the device; in-flight calls keep theirs until they return.
pub struct AcceleratorHandle {
    config: AcceleratorConfig,
    discover: Discover,
    slot: OnceLock<Slot>,
    /// Set when discovery starts; only consulted while `slot` is empty.
    initializing: AtomicBool,
}

static GLOBAL: OnceLock<AcceleratorHandle> = OnceLock::new();

impl AcceleratorHandle {
    /// Create a handle that runs `discover` on first use.
    pub fn new<F>(config: AcceleratorConfig, discover: F) -> Self
    where
        F: Fn(&AcceleratorConfig) -> DiscoverResult + Send + Sync + 'static,
    {
        AcceleratorHandle {
            config,
            discover: Box::new(discover),
            slot: OnceLock::new(),
            initializing: AtomicBool::new(false),
        }
    }

    /// Create a handle using [`discover_default`] for `config`.
    pub fn from_config(config: AcceleratorConfig) -> Self {
        Self::new(config, discover_default)
    }

    /// Create a handle that will hand out `device`.
    pub fn with_device(device: Arc<dyn AcceleratorCapability>) -> Self {
        Self::new(AcceleratorConfig::default(), move |_| Ok(Arc::clone(&device)))
    }

    /// Create a handle that never has a device.
    pub fn unavailable() -> Self {
        Self::new(AcceleratorConfig::default(), |_| Err(AcceleratorError::DeviceNotFound))
    }

    /// The process-wide handle, configured from the environment on first use.
    pub fn global() -> &'static AcceleratorHandle {
        GLOBAL.get_or_init(|| AcceleratorHandle::from_config(AcceleratorConfig::from_env()))
    }

    pub fn config(&self) -> &AcceleratorConfig {
        &self.config
    }

    /// Returns true if a device is ready, initializing the handle if needed.
    pub fn available(&self) -> bool {
        self.device().is_ok()
    }

    /// Returns the device, initializing the handle if needed.
    ///
    /// # Errors
    /// `AcceleratorUnavailable` if discovery failed or the handle was shut down.
    pub fn device(&self) -> Result<Arc<dyn AcceleratorCapability>> {
        match self.slot() {
            Slot::Ready(device) => device
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
                .ok_or_else(|| {
                    let reason = "accelerator has been shut down".to_string();
                    MatrixError::AcceleratorUnavailable(reason)
                }),
            Slot::Unavailable(reason) => Err(MatrixError::AcceleratorUnavailable(reason.clone())),
        }
    }

    /// Returns the current lifecycle state without initializing.
    pub fn state(&self) -> AcceleratorState {
        match self.slot.get() {
            None if self.initializing.load(Ordering::Acquire) => AcceleratorState::Initializing,
            None => AcceleratorState::Uninitialized,
            Some(Slot::Ready(device)) => {
                if device.read().unwrap_or_else(|e| e.into_inner()).is_some() {
                    AcceleratorState::Ready
                } else {
                    AcceleratorState::Released
                }
            }
            Some(Slot::Unavailable(_)) => AcceleratorState::Unavailable,
        }
    }

    /// Releases the device reference. The handle reports `Released` from
    /// then on and never initializes again.
    pub fn shutdown(&self) {
        // Claims the slot if discovery has not run yet; otherwise waits for it.
        let _ = self.slot.set(Slot::Ready(RwLock::new(None)));
        if let Some(Slot::Ready(device)) = self.slot.get() {
            let released = device.write().unwrap_or_else(|e| e.into_inner()).take();
            if let Some(device) = released {
                log::debug!("accelerator {} released", device.info().name);
            }
        }
    }

    fn slot(&self) -> &Slot {
        self.slot.get_or_init(|| {
            self.initializing.store(true, Ordering::Release);
            match (self.discover)(&self.config) {
                Ok(device) => {
                    log::debug!(
                        "accelerator ready: {} (backend={})",
                        device.info().name,
                        self.config.backend
                    );
                    Slot::Ready(RwLock::new(Some(device)))
                }
                Err(e) => {
                    log::debug!("accelerator unavailable (backend={}): {}", self.config.backend, e);
                    Slot::Unavailable(e.to_string())
                }
            }
        })
    }
}

impl fmt::Debug for AcceleratorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceleratorHandle")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

/// Discovers the device selected by `config.backend`.
///
/// `Host` always succeeds. `Auto` and `Metal` look for the Metal device when
/// the `metal` feature is enabled and fail with `DeviceNotFound` otherwise.
pub fn discover_default(config: &AcceleratorConfig) -> DiscoverResult {
    match config.backend {
        BackendPreference::Off => Err(AcceleratorError::Disabled),
        BackendPreference::Host => Ok(Arc::new(HostDevice::new())),
        BackendPreference::Auto | BackendPreference::Metal => discover_hardware(config),
    }
}

#[cfg(feature = "metal")]
fn discover_hardware(config: &AcceleratorConfig) -> DiscoverResult {
    let device = crate::metal::MetalDevice::discover(config)?;
    Ok(Arc::new(device))
}

#[cfg(not(feature = "metal"))]
fn discover_hardware(_config: &AcceleratorConfig) -> DiscoverResult {
    Err(AcceleratorError::DeviceNotFound)
}
