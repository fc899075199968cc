//! Background Tasks Module
//!
//! Periodic maintenance tasks owned by cache tiers.
//!
//! # Tasks
//! - Expiry sweep: removes expired memory-tier entries at a fixed interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
