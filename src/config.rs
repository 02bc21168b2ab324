// this_file: src/config.rs

//! Cache sizing and opacity thresholds.
//!
//! Both structs deserialize from the scene file; the cache bound can also be
//! overridden from the environment (`DRAWCACHE_MAX_ENTRIES`,
//! `DRAWCACHE_MAX_BYTES`).

use serde::{Deserialize, Serialize};

/// Environment variable bounding the cache by entry count.
pub const ENV_MAX_ENTRIES: &str = "DRAWCACHE_MAX_ENTRIES";
/// Environment variable bounding the cache by texture bytes.
pub const ENV_MAX_BYTES: &str = "DRAWCACHE_MAX_BYTES";

/// Default byte budget for cached textures (128 MiB).
pub const DEFAULT_MAX_BYTES: usize = 128 * 1024 * 1024;

/// Opacity below which a draw is skipped entirely.
pub const OPA_MIN: u8 = 2;
/// Opacity above which a draw is treated as fully covering.
pub const OPA_MAX: u8 = 253;
/// Fully opaque.
pub const OPA_COVER: u8 = 255;

/// Upper bound enforced by the LRU store after every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capacity {
    /// At most this many entries.
    Entries(usize),
    /// At most this many bytes of texture data (4 bytes per texel).
    Bytes(usize),
}

impl Capacity {
    /// Numeric limit regardless of unit.
    pub fn limit(self) -> usize {
        match self {
            Capacity::Entries(n) | Capacity::Bytes(n) => n,
        }
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Capacity::Bytes(DEFAULT_MAX_BYTES)
    }
}

/// Draw cache configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Store bound.
    #[serde(default)]
    pub capacity: Capacity,
}

impl CacheConfig {
    /// Bound the cache by entry count.
    pub fn with_entries(entries: usize) -> Self {
        Self {
            capacity: Capacity::Entries(entries),
        }
    }

    /// Bound the cache by texture bytes.
    pub fn with_bytes(bytes: usize) -> Self {
        Self {
            capacity: Capacity::Bytes(bytes),
        }
    }

    /// Default configuration with environment overrides applied.
    ///
    /// `DRAWCACHE_MAX_ENTRIES` wins over `DRAWCACHE_MAX_BYTES` when both are set.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse = |name: &str| {
            lookup(name).and_then(|raw| match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => Some(value),
                _ => {
                    log::warn!("Ignoring {}='{}': expected a positive integer", name, raw);
                    None
                }
            })
        };

        if let Some(entries) = parse(ENV_MAX_ENTRIES) {
            Self::with_entries(entries)
        } else if let Some(bytes) = parse(ENV_MAX_BYTES) {
            Self::with_bytes(bytes)
        } else {
            Self::default()
        }
    }
}

/// Opacity policy applied by every compositing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpacityThresholds {
    /// Values below this skip the draw.
    pub min: u8,
    /// Values above this are raised to `cover`.
    pub max: u8,
    /// Fully opaque value.
    pub cover: u8,
}

impl Default for OpacityThresholds {
    fn default() -> Self {
        Self {
            min: OPA_MIN,
            max: OPA_MAX,
            cover: OPA_COVER,
        }
    }
}

impl OpacityThresholds {
    /// Resolve a requested opacity: `None` means "nothing to draw".
    pub fn resolve(&self, opa: u8) -> Option<u8> {
        if opa < self.min {
            None
        } else if opa > self.max {
            Some(self.cover)
        } else {
            Some(opa)
        }
    }

    /// True when the opacity is at or below the visibility threshold.
    ///
    /// Shadow, border and background-image draws use this inclusive check.
    pub fn is_invisible(&self, opa: u8) -> bool {
        opa <= self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacity_is_byte_budget() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, Capacity::Bytes(DEFAULT_MAX_BYTES));
    }

    #[test]
    fn env_entries_override_bytes() {
        let config = CacheConfig::from_lookup(|name| match name {
            ENV_MAX_ENTRIES => Some("16".into()),
            ENV_MAX_BYTES => Some("4096".into()),
            _ => None,
        });
        assert_eq!(config.capacity, Capacity::Entries(16));
    }

    #[test]
    fn env_ignores_garbage() {
        let config = CacheConfig::from_lookup(|name| match name {
            ENV_MAX_ENTRIES => Some("lots".into()),
            ENV_MAX_BYTES => Some("0".into()),
            _ => None,
        });
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn opacity_policy() {
        let opa = OpacityThresholds::default();
        assert_eq!(opa.resolve(0), None);
        assert_eq!(opa.resolve(1), None);
        assert_eq!(opa.resolve(2), Some(2));
        assert_eq!(opa.resolve(128), Some(128));
        assert_eq!(opa.resolve(253), Some(253));
        assert_eq!(opa.resolve(254), Some(255));
        assert!(opa.is_invisible(2));
        assert!(!opa.is_invisible(3));
    }

    #[test]
    fn capacity_deserializes_from_json() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"capacity": {"entries": 2}}"#).expect("valid config");
        assert_eq!(config.capacity, Capacity::Entries(2));
        assert_eq!(config.capacity.limit(), 2);
    }
}
