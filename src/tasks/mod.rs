//! Background Tasks Module
//!
//! Periodic sweeps that run for the lifetime of a cache or driver.
//!
//! # Tasks
//! - Cache sweep: drops expired in-memory entries
//! - Row sweep: deletes expired rows from the embedded store

mod cleanup;

pub use cleanup::{spawn_cache_sweep, spawn_row_sweep, SweepHandle};
