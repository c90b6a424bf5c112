//! Shared types and models for the Warehouse Inventory Management Platform
//!
//! This crate contains types shared between the movement engine, background
//! workers, and other components of the system.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
