//! Domain models for the Warehouse Inventory Management Platform

pub mod lot;
pub mod movement;
pub mod reason;

pub use lot::*;
pub use movement::*;
pub use reason::*;
