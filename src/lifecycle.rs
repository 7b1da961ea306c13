//! Daily lifecycle control
//!
//! Once per trading day, at the fixed cutoff, all strategy state is torn
//! down: thresholds and the traded set are cleared, open positions are
//! market-closed, and every still-open order is cancelled. Runs whether or
//! not anything traded; an empty day is a no-op that still succeeds.

use crate::oms::venue::OrderVenue;
use crate::session::DailySessionState;
use tracing::{error, info};

/// Orchestrates the once-per-day reset at the liquidation cutoff
#[derive(Debug, Default)]
pub struct DailyLifecycleController;

impl DailyLifecycleController {
    pub fn new() -> Self {
        Self
    }

    /// Flatten everything. State is cleared before the venue calls so that
    /// a venue failure cannot leave stale thresholds or traded flags behind
    /// for the next day.
    pub fn on_liquidation_due(
        &self,
        session: &mut DailySessionState,
        venue: &mut dyn OrderVenue,
    ) {
        info!(date = ?session.date(), "Daily cutoff, flattening");

        session.force_close();

        if let Err(e) = venue.liquidate_all() {
            error!(error = %e, "Liquidation failed");
        }
        if let Err(e) = venue.cancel_open_orders() {
            error!(error = %e, "Open-order cancellation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oms::bracket::BracketPair;
    use crate::oms::venue::PaperVenue;
    use crate::selector::DailySelection;
    use crate::{Money, Side, Symbol, Tick};
    use chrono::NaiveDate;

    fn tick(price: f64) -> Tick {
        Tick {
            datetime: NaiveDate::from_ymd_opt(2021, 1, 4)
                .unwrap()
                .and_hms_opt(11, 0, 0)
                .unwrap(),
            price,
        }
    }

    #[test]
    fn test_cutoff_flattens_everything() {
        let controller = DailyLifecycleController::new();
        let mut venue = PaperVenue::new();
        let mut session = DailySessionState::new();

        let sym = Symbol::new("ABCD");
        let selection: DailySelection = vec![(sym.clone(), Money::from_f64(20.0))];
        session.begin_day(NaiveDate::from_ymd_opt(2021, 1, 4).unwrap(), &selection);

        venue.on_market_data(&sym, &tick(20.5));
        venue.market_order(&sym, Side::Buy, 100).unwrap();
        let limit = venue
            .limit_order(&sym, Side::Sell, 100, Money::from_f64(21.0))
            .unwrap();
        let stop = venue
            .stop_order(&sym, Side::Sell, 100, Money::from_f64(19.0))
            .unwrap();
        session.mark_traded(&sym);
        session.register_bracket(&sym, BracketPair::new(limit, stop));

        controller.on_liquidation_due(&mut session, &mut venue);

        assert!(session.is_cleared());
        assert_eq!(venue.position_qty(&sym), 0);
        assert_eq!(venue.open_orders().count(), 0);
    }

    #[test]
    fn test_cutoff_on_empty_state_is_idempotent() {
        let controller = DailyLifecycleController::new();
        let mut venue = PaperVenue::new();
        let mut session = DailySessionState::new();

        controller.on_liquidation_due(&mut session, &mut venue);
        controller.on_liquidation_due(&mut session, &mut venue);

        assert!(session.is_cleared());
        assert_eq!(venue.orders().count(), 0);
    }
}
