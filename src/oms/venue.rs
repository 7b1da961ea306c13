//! Order venue interface and the in-process paper venue
//!
//! The engine talks to whatever executes orders through [`OrderVenue`]; the
//! paper venue implements it with immediate market fills and tick-driven
//! limit/stop fill detection, zero fees and zero slippage. Replay and the
//! test suite run against it; a live brokerage adapter plugs in behind the
//! same trait.

use crate::oms::types::{Order, OrderEvent, OrderId, OrderState, OrderType};
use crate::{Money, Side, Symbol, Tick};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Venue operation errors
#[derive(Debug, Error)]
pub enum VenueError {
    #[error("no market data yet for {0}, cannot price market order")]
    NoMarketData(Symbol),

    #[error("unknown order id {0}")]
    UnknownOrder(OrderId),
}

/// Order-execution surface consumed by the engine.
///
/// Cancellation of an order in any terminal state must succeed as a no-op;
/// the OCO logic and the daily reset both issue cancels without checking
/// state first.
pub trait OrderVenue {
    fn market_order(
        &mut self,
        symbol: &Symbol,
        side: Side,
        quantity: u64,
    ) -> Result<OrderId, VenueError>;

    fn limit_order(
        &mut self,
        symbol: &Symbol,
        side: Side,
        quantity: u64,
        limit_price: Money,
    ) -> Result<OrderId, VenueError>;

    fn stop_order(
        &mut self,
        symbol: &Symbol,
        side: Side,
        quantity: u64,
        stop_price: Money,
    ) -> Result<OrderId, VenueError>;

    /// Cancel an order, recording the reason. No-op when already terminal.
    fn cancel(&mut self, order_id: OrderId, reason: &str) -> Result<(), VenueError>;

    /// Market-close one symbol's open position, if any
    fn liquidate(&mut self, symbol: &Symbol) -> Result<(), VenueError>;

    /// Market-close every open position
    fn liquidate_all(&mut self) -> Result<(), VenueError>;

    /// Cancel every still-open order
    fn cancel_open_orders(&mut self) -> Result<(), VenueError>;

    /// Signed open position in shares; nonzero means "invested"
    fn position_qty(&self, symbol: &Symbol) -> i64;

    fn order_state(&self, order_id: OrderId) -> Option<OrderState>;

    /// Market-data hook for venues that detect fills internally.
    /// Live adapters ignore this; fills arrive from the broker instead.
    fn on_market_data(&mut self, _symbol: &Symbol, _tick: &Tick) {}

    /// Fill/status notifications produced since the last drain
    fn drain_events(&mut self) -> Vec<OrderEvent> {
        Vec::new()
    }
}

/// In-process paper venue
#[derive(Debug, Default)]
pub struct PaperVenue {
    orders: BTreeMap<OrderId, Order>,
    positions: BTreeMap<Symbol, i64>,
    last_price: BTreeMap<Symbol, f64>,
    events: Vec<OrderEvent>,
    now: Option<NaiveDateTime>,
}

impl PaperVenue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn open_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values().filter(|o| o.is_open())
    }

    pub fn filled_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders
            .values()
            .filter(|o| o.state == OrderState::Filled)
    }

    pub fn last_price(&self, symbol: &Symbol) -> Option<f64> {
        self.last_price.get(symbol).copied()
    }

    fn now(&self) -> NaiveDateTime {
        self.now.unwrap_or_default()
    }

    fn fill(&mut self, order_id: OrderId, price: Money) {
        let now = self.now();
        let Some(order) = self.orders.get_mut(&order_id) else {
            return;
        };
        order.state = OrderState::Filled;
        order.fill_price = Some(price);
        order.updated_at = now;

        let delta = match order.side {
            Side::Buy => order.quantity as i64,
            Side::Sell => -(order.quantity as i64),
        };
        let symbol = order.symbol.clone();
        let event = OrderEvent {
            order_id,
            symbol: symbol.clone(),
            state: OrderState::Filled,
            fill_price: Some(price),
            timestamp: now,
        };
        *self.positions.entry(symbol.clone()).or_insert(0) += delta;

        debug!(%symbol, order_id, %price, delta, "Paper fill");
        self.events.push(event);
    }

    /// Does this order fill at the observed price?
    fn fill_price_at(order: &Order, price: f64) -> Option<Money> {
        let observed = Money::from_f64(price);
        match (order.side, order.order_type) {
            // Sell limit: fills when price reaches up to the limit
            (Side::Sell, OrderType::Limit) => {
                let limit = order.limit_price?;
                (observed >= limit).then_some(limit)
            }
            // Sell stop: triggers when price trades down through the stop
            (Side::Sell, OrderType::Stop) => {
                let stop = order.stop_price?;
                (observed <= stop).then_some(stop)
            }
            // Buy limit: fills when price trades down to the limit
            (Side::Buy, OrderType::Limit) => {
                let limit = order.limit_price?;
                (observed <= limit).then_some(limit)
            }
            // Buy stop: triggers when price trades up through the stop
            (Side::Buy, OrderType::Stop) => {
                let stop = order.stop_price?;
                (observed >= stop).then_some(stop)
            }
            // Market orders never rest on the book here
            (_, OrderType::Market) => None,
        }
    }

    fn submit(&mut self, order: Order) -> OrderId {
        let id = order.id;
        debug!(
            symbol = %order.symbol,
            order_id = id,
            side = ?order.side,
            order_type = ?order.order_type,
            quantity = order.quantity,
            "Order accepted"
        );
        self.orders.insert(id, order);
        id
    }
}

impl OrderVenue for PaperVenue {
    fn market_order(
        &mut self,
        symbol: &Symbol,
        side: Side,
        quantity: u64,
    ) -> Result<OrderId, VenueError> {
        let price = self
            .last_price(symbol)
            .ok_or_else(|| VenueError::NoMarketData(symbol.clone()))?;
        let order = Order::new(
            symbol.clone(),
            side,
            OrderType::Market,
            quantity,
            None,
            None,
            self.now(),
        );
        let id = self.submit(order);
        // Immediate-fill model, zero slippage
        self.fill(id, Money::from_f64(price));
        Ok(id)
    }

    fn limit_order(
        &mut self,
        symbol: &Symbol,
        side: Side,
        quantity: u64,
        limit_price: Money,
    ) -> Result<OrderId, VenueError> {
        let order = Order::new(
            symbol.clone(),
            side,
            OrderType::Limit,
            quantity,
            Some(limit_price),
            None,
            self.now(),
        );
        Ok(self.submit(order))
    }

    fn stop_order(
        &mut self,
        symbol: &Symbol,
        side: Side,
        quantity: u64,
        stop_price: Money,
    ) -> Result<OrderId, VenueError> {
        let order = Order::new(
            symbol.clone(),
            side,
            OrderType::Stop,
            quantity,
            None,
            Some(stop_price),
            self.now(),
        );
        Ok(self.submit(order))
    }

    fn cancel(&mut self, order_id: OrderId, reason: &str) -> Result<(), VenueError> {
        let now = self.now();
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(VenueError::UnknownOrder(order_id))?;

        if order.state.is_terminal() {
            debug!(order_id, state = ?order.state, reason, "Cancel of terminal order ignored");
            return Ok(());
        }

        order.state = OrderState::Cancelled;
        order.cancel_reason = Some(reason.to_string());
        order.updated_at = now;
        let event = OrderEvent {
            order_id,
            symbol: order.symbol.clone(),
            state: OrderState::Cancelled,
            fill_price: None,
            timestamp: now,
        };
        debug!(symbol = %event.symbol, order_id, reason, "Order cancelled");
        self.events.push(event);
        Ok(())
    }

    fn liquidate(&mut self, symbol: &Symbol) -> Result<(), VenueError> {
        let qty = self.position_qty(symbol);
        if qty == 0 {
            return Ok(());
        }
        let Some(price) = self.last_price(symbol) else {
            // Position without a price should not happen; entry required a tick
            warn!(%symbol, qty, "Cannot price liquidation, dropping position");
            self.positions.insert(symbol.clone(), 0);
            return Ok(());
        };

        let side = if qty > 0 { Side::Sell } else { Side::Buy };
        let order = Order::new(
            symbol.clone(),
            side,
            OrderType::Market,
            qty.unsigned_abs(),
            None,
            None,
            self.now(),
        );
        let id = self.submit(order);
        self.fill(id, Money::from_f64(price));
        info!(%symbol, qty, price, "Position liquidated");
        Ok(())
    }

    fn liquidate_all(&mut self) -> Result<(), VenueError> {
        let open: Vec<Symbol> = self
            .positions
            .iter()
            .filter(|(_, qty)| **qty != 0)
            .map(|(symbol, _)| symbol.clone())
            .collect();
        for symbol in open {
            self.liquidate(&symbol)?;
        }
        Ok(())
    }

    fn cancel_open_orders(&mut self) -> Result<(), VenueError> {
        let open: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| o.is_open())
            .map(|o| o.id)
            .collect();
        for id in open {
            self.cancel(id, "daily cutoff")?;
        }
        Ok(())
    }

    fn position_qty(&self, symbol: &Symbol) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    fn order_state(&self, order_id: OrderId) -> Option<OrderState> {
        self.orders.get(&order_id).map(|o| o.state)
    }

    fn on_market_data(&mut self, symbol: &Symbol, tick: &Tick) {
        self.now = Some(tick.datetime);
        self.last_price.insert(symbol.clone(), tick.price);

        let triggered: Vec<(OrderId, Money)> = self
            .orders
            .values()
            .filter(|o| o.is_open() && &o.symbol == symbol)
            .filter_map(|o| Self::fill_price_at(o, tick.price).map(|p| (o.id, p)))
            .collect();
        for (id, price) in triggered {
            self.fill(id, price);
        }
    }

    fn drain_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.events)
    }
}
