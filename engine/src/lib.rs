//! Warehouse Inventory Management Platform - Movement Engine
//!
//! The inventory movement engine: for every stock-affecting event it decides
//! which physical lots are consumed or produced, and drives each movement
//! through a request → validation → approval → execution lifecycle with
//! transactional guarantees. Presentation layers live elsewhere; this crate
//! is an internal service boundary.

pub mod config;
pub mod error;
pub mod events;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
