//! Configuration Module
//!
//! Handles cache tuning parameters with environment-variable overrides and
//! system-sized defaults.

use std::env;

use sysinfo::System;

use crate::expiration::Expiration;

// == Defaults ==
const DEFAULT_COUNT_LIMIT: usize = usize::MAX;
const DEFAULT_COST_LIMIT: usize = 256 * 1024 * 1024;
const DEFAULT_MEMORY_TTL: Expiration = Expiration::Minutes(5);
const DEFAULT_DISK_TTL: Expiration = Expiration::Never;
const DEFAULT_CLEAN_INTERVAL_SECS: u64 = 120;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the memory tier can hold
    pub count_limit: usize,
    /// Maximum aggregate artifact cost (bytes) the memory tier can hold
    pub cost_limit: usize,
    /// TTL applied to memory entries on store and refreshed on each hit
    pub memory_ttl: Expiration,
    /// TTL applied to disk entries on store and refreshed on each hit
    pub disk_ttl: Expiration,
    /// Memory-tier sweep interval in seconds
    pub clean_interval_secs: u64,
    /// Copy disk hits back into the memory tier on lookup
    pub promote_disk_hits: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMORY_COUNT_LIMIT` - Maximum memory-tier entries (default: unbounded)
    /// - `MEMORY_COST_LIMIT` - Maximum memory-tier bytes (default: 256 MiB)
    /// - `MEMORY_TTL_SECS` - Memory TTL in seconds, 0 = never (default: 300)
    /// - `DISK_TTL_SECS` - Disk TTL in seconds, 0 = never (default: never)
    /// - `CLEAN_INTERVAL` - Sweep frequency in seconds (default: 120)
    pub fn from_env() -> Self {
        let ttl_var = |name: &str, fallback: Expiration| match env::var(name)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            Some(0) => Expiration::Never,
            Some(secs) => Expiration::Seconds(secs),
            None => fallback,
        };

        Self {
            count_limit: env::var("MEMORY_COUNT_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_COUNT_LIMIT),
            cost_limit: env::var("MEMORY_COST_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_COST_LIMIT),
            memory_ttl: ttl_var("MEMORY_TTL_SECS", DEFAULT_MEMORY_TTL),
            disk_ttl: ttl_var("DISK_TTL_SECS", DEFAULT_DISK_TTL),
            clean_interval_secs: env::var("CLEAN_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CLEAN_INTERVAL_SECS),
            promote_disk_hits: false,
        }
    }

    /// Creates a Config whose memory cost limit is a quarter of total
    /// physical memory, falling back to the static default when the total
    /// cannot be determined.
    pub fn sized_from_system() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        let total = system.total_memory();

        let cost_limit = if total == 0 {
            DEFAULT_COST_LIMIT
        } else {
            (total / 4) as usize
        };

        Self {
            cost_limit,
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            count_limit: DEFAULT_COUNT_LIMIT,
            cost_limit: DEFAULT_COST_LIMIT,
            memory_ttl: DEFAULT_MEMORY_TTL,
            disk_ttl: DEFAULT_DISK_TTL,
            clean_interval_secs: DEFAULT_CLEAN_INTERVAL_SECS,
            promote_disk_hits: false,
        }
    }
}
