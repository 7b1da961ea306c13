//! Strategy engine and host event adapter
//!
//! Glues the components together behind four explicit entry points the host
//! invokes sequentially: `on_selection_due`, `on_price_tick`,
//! `on_order_event`, `on_liquidation_due`. The engine owns the trading
//! window check; the detector only ever sees in-window ticks.

use crate::breakout::BreakoutDetector;
use crate::config::{Config, ConfigError};
use crate::data::GapperTable;
use crate::lifecycle::DailyLifecycleController;
use crate::oms::bracket::BracketOrderManager;
use crate::oms::types::OrderEvent;
use crate::oms::venue::OrderVenue;
use crate::selector::select_universe;
use crate::session::DailySessionState;
use crate::{Symbol, Tick};
use chrono::NaiveDate;
use tracing::debug;

/// The decision-and-order-lifecycle engine, parameterized over the venue
pub struct StrategyEngine<V: OrderVenue> {
    config: Config,
    session: DailySessionState,
    detector: BreakoutDetector,
    brackets: BracketOrderManager,
    lifecycle: DailyLifecycleController,
    venue: V,
}

impl<V: OrderVenue> StrategyEngine<V> {
    /// Build an engine. Configuration is validated here, before any trading
    /// state exists; a zero target percent never reaches the sizing math.
    pub fn new(config: Config, venue: V) -> Result<Self, ConfigError> {
        config.validate()?;
        let detector = BreakoutDetector::new(config.risk.clone());
        Ok(Self {
            config,
            session: DailySessionState::new(),
            detector,
            brackets: BracketOrderManager::new(),
            lifecycle: DailyLifecycleController::new(),
            venue,
        })
    }

    /// Scheduled once per trading day: run selection and install the day's
    /// session state
    pub fn on_selection_due(&mut self, date: NaiveDate, table: &GapperTable) {
        let selection = select_universe(date, table, &self.config.filter);
        self.session.begin_day(date, &selection);
    }

    /// One price observation. The venue always sees the tick (resting legs
    /// can fill whenever the market trades); the detector only acts inside
    /// the entry window.
    pub fn on_price_tick(&mut self, symbol: &Symbol, tick: &Tick) {
        self.venue.on_market_data(symbol, tick);
        self.pump_events();

        let t = tick.datetime.time();
        if t < self.config.session.entry_start || t >= self.config.session.cutoff {
            debug!(%symbol, time = %t, "Tick outside entry window");
            return;
        }

        self.detector
            .on_tick(symbol, tick, &mut self.session, &mut self.venue);
        self.pump_events();
    }

    /// Fill/status notification pushed by a live host
    pub fn on_order_event(&mut self, event: &OrderEvent) {
        self.brackets
            .on_order_event(event, &mut self.session, &mut self.venue);
        self.pump_events();
    }

    /// Scheduled once per trading day at the cutoff: flatten everything
    pub fn on_liquidation_due(&mut self) {
        self.lifecycle
            .on_liquidation_due(&mut self.session, &mut self.venue);
        self.pump_events();
    }

    /// Route venue notifications (paper fills, cancels) to the bracket
    /// manager until quiescent. A leg fill causes a sibling cancel, which
    /// itself emits an event; one pass per batch terminates quickly.
    fn pump_events(&mut self) {
        loop {
            let events = self.venue.drain_events();
            if events.is_empty() {
                break;
            }
            for event in &events {
                self.brackets
                    .on_order_event(event, &mut self.session, &mut self.venue);
            }
        }
    }

    pub fn session(&self) -> &DailySessionState {
        &self.session
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oms::venue::PaperVenue;
    use crate::session::SymbolPhase;
    use crate::{GapperRecord, Side};
    use chrono::NaiveDateTime;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, 4).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        date().and_hms_opt(h, m, 0).unwrap()
    }

    fn table(gap: f64, pmh: f64) -> GapperTable {
        GapperTable::from_records([GapperRecord {
            date: date(),
            symbol: Symbol::new("ABCD"),
            gap_percent: gap,
            premarket_high: pmh,
            outstanding_shares: None,
            market_cap: None,
        }])
    }

    fn engine() -> StrategyEngine<PaperVenue> {
        StrategyEngine::new(Config::default(), PaperVenue::new()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected_at_startup() {
        let mut config = Config::default();
        config.risk.target_percent = 0.0;
        assert!(StrategyEngine::new(config, PaperVenue::new()).is_err());
    }

    #[test]
    fn test_tick_before_window_is_ignored() {
        let mut engine = engine();
        engine.on_selection_due(date(), &table(10.0, 20.0));
        let sym = Symbol::new("ABCD");

        engine.on_price_tick(&sym, &Tick { datetime: at(9, 29), price: 25.0 });
        assert!(!engine.session().is_traded(&sym));

        // Same breaking price one minute later triggers
        engine.on_price_tick(&sym, &Tick { datetime: at(9, 30), price: 25.0 });
        assert!(engine.session().is_traded(&sym));
    }

    #[test]
    fn test_tick_at_cutoff_is_ignored() {
        let mut engine = engine();
        engine.on_selection_due(date(), &table(10.0, 20.0));
        let sym = Symbol::new("ABCD");

        engine.on_price_tick(&sym, &Tick { datetime: at(12, 0), price: 25.0 });
        assert!(!engine.session().is_traded(&sym));
    }

    #[test]
    fn test_full_day_stop_out() {
        let mut engine = engine();
        engine.on_selection_due(date(), &table(10.0, 20.0));
        let sym = Symbol::new("ABCD");

        engine.on_price_tick(&sym, &Tick { datetime: at(9, 31), price: 20.5 });
        assert_eq!(engine.session().phase(&sym), SymbolPhase::Entered);
        assert_eq!(engine.venue().position_qty(&sym), 195);

        // Trade down through the stop; OCO cancels the limit leg
        engine.on_price_tick(&sym, &Tick { datetime: at(10, 15), price: 18.9 });
        assert_eq!(engine.session().phase(&sym), SymbolPhase::Exited);
        assert_eq!(engine.venue().position_qty(&sym), 0);

        let cancelled: Vec<_> = engine
            .venue()
            .orders()
            .filter_map(|o| o.cancel_reason.as_deref())
            .collect();
        assert_eq!(cancelled, vec!["stop filled"]);

        // Cutoff finds nothing left to do for this symbol
        engine.on_liquidation_due();
        assert_eq!(engine.venue().position_qty(&sym), 0);
        assert!(engine.session().is_cleared());
    }

    #[test]
    fn test_cutoff_flattens_unresolved_position() {
        let mut engine = engine();
        engine.on_selection_due(date(), &table(10.0, 20.0));
        let sym = Symbol::new("ABCD");

        engine.on_price_tick(&sym, &Tick { datetime: at(9, 31), price: 20.5 });
        // Price never reaches either leg
        engine.on_price_tick(&sym, &Tick { datetime: at(11, 0), price: 20.6 });
        assert_eq!(engine.venue().position_qty(&sym), 195);

        engine.on_liquidation_due();
        assert_eq!(engine.venue().position_qty(&sym), 0);
        assert_eq!(engine.venue().open_orders().count(), 0);
        assert_eq!(engine.session().phase(&sym), SymbolPhase::ForcedClosed);
    }

    #[test]
    fn test_next_day_starts_clean() {
        let mut engine = engine();
        engine.on_selection_due(date(), &table(10.0, 20.0));
        let sym = Symbol::new("ABCD");
        engine.on_price_tick(&sym, &Tick { datetime: at(9, 31), price: 20.5 });
        engine.on_liquidation_due();

        let next = date().succ_opt().unwrap();
        engine.on_selection_due(next, &table(10.0, 20.0));
        // Table has no rows for the next day, so nothing is selected
        assert_eq!(engine.session().selected_symbols().count(), 0);
        assert_eq!(engine.session().date(), Some(next));

        let entries = engine
            .venue()
            .orders()
            .filter(|o| o.side == Side::Buy)
            .count();
        assert_eq!(entries, 1);
    }
}
