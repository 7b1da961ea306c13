//! One-cancels-other bracket management
//!
//! Each entered symbol carries a paired take-profit limit leg and stop-loss
//! leg. When the venue reports either leg filled, the sibling is cancelled,
//! so at most one leg of a pair ever fills.

use crate::oms::types::{OrderEvent, OrderId, OrderState};
use crate::oms::venue::OrderVenue;
use crate::session::DailySessionState;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// The two legs of a bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BracketLeg {
    /// Take-profit limit sell
    Limit,
    /// Stop-loss sell
    Stop,
}

/// A take-profit/stop-loss order pair protecting one open position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketPair {
    pub limit: OrderId,
    pub stop: OrderId,
}

impl BracketPair {
    pub fn new(limit: OrderId, stop: OrderId) -> Self {
        Self { limit, stop }
    }

    /// Which leg is this order, if either
    pub fn leg_of(&self, order_id: OrderId) -> Option<BracketLeg> {
        if order_id == self.limit {
            Some(BracketLeg::Limit)
        } else if order_id == self.stop {
            Some(BracketLeg::Stop)
        } else {
            None
        }
    }

    /// The other leg's order id
    pub fn sibling(&self, leg: BracketLeg) -> OrderId {
        match leg {
            BracketLeg::Limit => self.stop,
            BracketLeg::Stop => self.limit,
        }
    }
}

/// Reacts to venue fill notifications and enforces the OCO invariant
#[derive(Debug, Default)]
pub struct BracketOrderManager;

impl BracketOrderManager {
    pub fn new() -> Self {
        Self
    }

    /// Handle one fill/status notification. Non-fill events and fills on
    /// orders outside any bracket (the entry market buy, liquidations) are
    /// ignored.
    pub fn on_order_event(
        &self,
        event: &OrderEvent,
        session: &mut DailySessionState,
        venue: &mut dyn OrderVenue,
    ) {
        if event.state != OrderState::Filled {
            return;
        }

        let Some((symbol, pair, leg)) = session.bracket_leg_for(event.order_id) else {
            debug!(order_id = event.order_id, "Fill outside any bracket, ignoring");
            return;
        };

        let (sibling, reason) = match leg {
            BracketLeg::Stop => (pair.sibling(BracketLeg::Stop), "stop filled"),
            BracketLeg::Limit => (pair.sibling(BracketLeg::Limit), "limit filled"),
        };

        // Cancel of an already-terminal sibling is a venue-level no-op
        if let Err(e) = venue.cancel(sibling, reason) {
            warn!(%symbol, sibling, error = %e, "Failed to cancel bracket sibling");
        }
        session.resolve_bracket(&symbol);

        info!(
            %symbol,
            filled = event.order_id,
            leg = ?leg,
            cancelled = sibling,
            reason,
            "Bracket resolved"
        );
    }
}
