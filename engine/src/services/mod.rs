//! Business logic services for the Warehouse Inventory Management Platform

pub mod alerting;
pub mod allocation;
pub mod lot_registry;
pub mod movement;
pub mod policy;
pub mod projector;
pub mod reason;

pub use alerting::AlertingService;
pub use lot_registry::LotRegistry;
pub use movement::MovementWorkflow;
pub use projector::InventoryProjector;
pub use reason::MovementReasonStore;
