//! Order Management
//!
//! Order types and state machine, the venue trait with an in-process paper
//! implementation, and the OCO bracket manager.

pub mod bracket;
pub mod types;
pub mod venue;

// Re-export core types
pub use bracket::{BracketLeg, BracketOrderManager, BracketPair};
pub use types::{next_order_id, Order, OrderEvent, OrderId, OrderState, OrderType};
pub use venue::{OrderVenue, PaperVenue, VenueError};
