//! Background Tasks Module
//!
//! # Tasks
//! - Janitor: sweeps expired cache entries at a configured interval

mod janitor;

pub use janitor::Janitor;
