//! Breakout detection and entry
//!
//! Consumes price ticks for selected symbols and, on a break above the
//! premarket high, enters a fixed-dollar-risk position protected by a
//! take-profit/stop-loss bracket.

use crate::config::RiskConfig;
use crate::oms::bracket::BracketPair;
use crate::oms::venue::OrderVenue;
use crate::session::DailySessionState;
use crate::{Money, Side, Symbol, Tick};
use tracing::{debug, error, info};

/// Detects premarket-high breaks and submits the entry plus its bracket
#[derive(Debug, Clone)]
pub struct BreakoutDetector {
    risk: RiskConfig,
}

impl BreakoutDetector {
    pub fn new(risk: RiskConfig) -> Self {
        Self { risk }
    }

    /// Shares to buy for one entry: floor(dollar_risk / target_percent / price).
    /// Zero means the name is too expensive for the risk budget.
    fn entry_quantity(&self, price: f64) -> u64 {
        let qty = (self.risk.dollar_risk_per_trade / self.risk.target_percent) / price;
        if qty.is_finite() && qty >= 1.0 {
            qty as u64
        } else {
            0
        }
    }

    /// Handle one in-window price observation. The host delivers events
    /// sequentially, so everything here completes before the next tick for
    /// this symbol is seen; marking traded first makes a duplicate entry
    /// impossible even so.
    pub fn on_tick(
        &self,
        symbol: &Symbol,
        tick: &Tick,
        session: &mut DailySessionState,
        venue: &mut dyn OrderVenue,
    ) {
        if let Err(e) = tick.validate() {
            debug!(%symbol, error = %e, "Skipping invalid tick");
            return;
        }
        let Some(threshold) = session.threshold(symbol) else {
            return;
        };
        if venue.position_qty(symbol) != 0 {
            return;
        }
        if session.is_traded(symbol) {
            return;
        }
        if Money::from_f64(tick.price) <= threshold {
            return;
        }

        // Traded-today is set at submission time, not fill time
        if !session.mark_traded(symbol) {
            return;
        }

        let quantity = self.entry_quantity(tick.price);
        if quantity == 0 {
            // Intentional skip, not an error; stays marked so we don't retry
            info!(%symbol, price = tick.price, "Breakout sized to zero shares, skipping entry");
            return;
        }

        info!(
            %symbol,
            price = tick.price,
            %threshold,
            quantity,
            "Premarket high broken, entering"
        );

        if let Err(e) = venue.market_order(symbol, Side::Buy, quantity) {
            // Symbol stays marked traded; it is excluded until the daily reset
            error!(%symbol, error = %e, "Entry order failed");
            return;
        }

        let take_profit = (threshold * Money::from_f64(1.0 + self.risk.target_percent)).round_dp(2);
        let stop_loss = (threshold * Money::from_f64(1.0 - self.risk.target_percent)).round_dp(2);

        let limit = match venue.limit_order(symbol, Side::Sell, quantity, take_profit) {
            Ok(id) => id,
            Err(e) => {
                error!(%symbol, error = %e, "Take-profit leg failed, position unprotected");
                return;
            }
        };
        let stop = match venue.stop_order(symbol, Side::Sell, quantity, stop_loss) {
            Ok(id) => id,
            Err(e) => {
                error!(%symbol, error = %e, "Stop leg failed, cancelling take-profit");
                let _ = venue.cancel(limit, "bracket incomplete");
                return;
            }
        };

        session.register_bracket(symbol, BracketPair::new(limit, stop));
        debug!(%symbol, limit, stop, %take_profit, %stop_loss, "Bracket registered");
    }
}
