use std::fmt;
use std::str::FromStr;

/// Environment variable selecting the accelerator backend.
pub const ENV_BACKEND: &str = "GM_ACCELERATOR";
/// Environment variable overriding the dispatch threadgroup width.
pub const ENV_THREADS_PER_GROUP: &str = "GM_THREADS_PER_GROUP";

/// Which device the process-wide accelerator handle should discover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendPreference {
    /// Use a hardware device if one is compiled in and present.
    #[default]
    Auto,
    /// Require the Metal device.
    Metal,
    /// Use the software [`HostDevice`](crate::accel::HostDevice).
    Host,
    /// Never initialize a device.
    Off,
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendPreference::Auto => write!(f, "auto"),
            BackendPreference::Metal => write!(f, "metal"),
            BackendPreference::Host => write!(f, "host"),
            BackendPreference::Off => write!(f, "off"),
        }
    }
}

impl FromStr for BackendPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(BackendPreference::Auto),
            "metal" | "gpu" => Ok(BackendPreference::Metal),
            "host" | "cpu" => Ok(BackendPreference::Host),
            "off" | "none" | "0" => Ok(BackendPreference::Off),
            other => Err(format!("unknown accelerator backend: {}", other)),
        }
    }
}

/// Configuration for accelerator discovery and dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceleratorConfig {
    /// Device to discover.
    pub backend: BackendPreference,
    /// Work items per threadgroup. 1 gives one independent unit of work per
    /// output element.
    pub threads_per_group: usize,
}

impl Default for AcceleratorConfig {
    fn default() -> Self {
        AcceleratorConfig {
            backend: BackendPreference::Auto,
            threads_per_group: 1,
        }
    }
}

impl AcceleratorConfig {
    /// Build a configuration from `GM_ACCELERATOR` and `GM_THREADS_PER_GROUP`.
    ///
    /// Unset variables keep their defaults; unparsable ones are ignored with
    /// a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`AcceleratorConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AcceleratorConfig::default();

        if let Some(raw) = lookup(ENV_BACKEND) {
            match raw.parse() {
                Ok(backend) => config.backend = backend,
                Err(e) => log::warn!("ignoring {}: {}", ENV_BACKEND, e),
            }
        }

        if let Some(raw) = lookup(ENV_THREADS_PER_GROUP) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.threads_per_group = n,
                _ => log::warn!(
                    "ignoring {}={:?}: expected a positive integer",
                    ENV_THREADS_PER_GROUP,
                    raw
                ),
            }
        }

        config
    }

    pub fn with_backend(mut self, backend: BackendPreference) -> Self {
        self.backend = backend;
        self
    }
}
