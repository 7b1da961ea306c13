//! Core order types
//!
//! Orders, order state, and the fill/status notifications the venue emits.

use crate::{Money, Side, Symbol};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Order ID type - u64 for performance
pub type OrderId = u64;

/// Atomic counter for order ID generation
static ORDER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate the next order ID (thread-safe, lock-free)
pub fn next_order_id() -> OrderId {
    ORDER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Order type - determines execution logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Execute immediately at the current market price
    Market,

    /// Execute when price reaches the limit price
    /// Sell limit: fills when price >= limit_price
    Limit,

    /// Stop-loss: converts to market when the stop triggers
    /// Sell stop: triggers when price <= stop_price
    Stop,
}

/// Order state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    /// Order accepted by the venue and working
    Open,

    /// Order completely filled
    Filled,

    /// Order cancelled (OCO sibling, daily reset, or operator)
    Cancelled,

    /// Order rejected by the venue
    Rejected,
}

impl OrderState {
    /// Terminal states accept no further transitions; cancelling a terminal
    /// order is a no-op by contract.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Cancelled | OrderState::Rejected
        )
    }
}

/// Core order structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    /// Whole shares
    pub quantity: u64,
    pub limit_price: Option<Money>,
    pub stop_price: Option<Money>,
    pub state: OrderState,
    pub fill_price: Option<Money>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Reason recorded on cancellation (e.g. "stop filled")
    pub cancel_reason: Option<String>,
}

impl Order {
    pub fn new(
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        quantity: u64,
        limit_price: Option<Money>,
        stop_price: Option<Money>,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id: next_order_id(),
            symbol,
            side,
            order_type,
            quantity,
            limit_price,
            stop_price,
            state: OrderState::Open,
            fill_price: None,
            created_at: now,
            updated_at: now,
            cancel_reason: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == OrderState::Open
    }
}

/// Fill/status notification emitted by the venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub state: OrderState,
    pub fill_price: Option<Money>,
    pub timestamp: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 1, 4)
            .unwrap()
            .and_hms_opt(9, 31, 0)
            .unwrap()
    }

    #[test]
    fn test_order_id_generation() {
        let id1 = next_order_id();
        let id2 = next_order_id();
        assert!(id2 > id1);
    }

    #[test]
    fn test_new_order_is_open() {
        let order = Order::new(
            Symbol::new("ABCD"),
            Side::Sell,
            OrderType::Limit,
            100,
            Some(Money::from_f64(21.0)),
            None,
            now(),
        );
        assert!(order.is_open());
        assert!(!order.state.is_terminal());
        assert!(order.fill_price.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderState::Filled.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
        assert!(OrderState::Rejected.is_terminal());
        assert!(!OrderState::Open.is_terminal());
    }
}
