//! Per-day session state
//!
//! All per-symbol trading state for the current day lives here: breakout
//! thresholds, the traded-today set, live bracket pairs, and the per-symbol
//! phase machine. The state is created by the daily selection, mutated by the
//! detector and the bracket manager, and force-closed at the cutoff, so
//! nothing can leak across trading days.

use crate::oms::bracket::{BracketLeg, BracketPair};
use crate::oms::types::OrderId;
use crate::selector::DailySelection;
use crate::{Money, Symbol};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Per-symbol-per-day lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolPhase {
    /// Not in today's universe
    NotSelected,

    /// Threshold set, waiting for a breakout
    Selected,

    /// Entry submitted, bracket live
    Entered,

    /// One bracket leg filled, sibling cancelled
    Exited,

    /// Flattened by the daily cutoff
    ForcedClosed,
}

/// One symbol's state for the day
#[derive(Debug, Clone)]
struct SymbolDayState {
    threshold: Money,
    traded: bool,
    bracket: Option<BracketPair>,
    phase: SymbolPhase,
}

/// Mutable per-day state shared by the selector, detector, bracket manager
/// and lifecycle controller. Exactly one component writes each field per
/// symbol; events are delivered sequentially, so no locking is needed.
#[derive(Debug, Default)]
pub struct DailySessionState {
    date: Option<NaiveDate>,
    symbols: BTreeMap<Symbol, SymbolDayState>,
}

impl DailySessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new day's selection, discarding anything left from before
    pub fn begin_day(&mut self, date: NaiveDate, selection: &DailySelection) {
        self.symbols.clear();
        self.date = Some(date);
        for (symbol, threshold) in selection {
            self.symbols.insert(
                symbol.clone(),
                SymbolDayState {
                    threshold: *threshold,
                    traded: false,
                    bracket: None,
                    phase: SymbolPhase::Selected,
                },
            );
        }
        debug!(%date, symbols = self.symbols.len(), "Session state initialized");
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Breakout threshold for a symbol, if it was selected today and has not
    /// been force-closed
    pub fn threshold(&self, symbol: &Symbol) -> Option<Money> {
        self.symbols
            .get(symbol)
            .filter(|s| s.phase != SymbolPhase::ForcedClosed)
            .map(|s| s.threshold)
    }

    pub fn is_traded(&self, symbol: &Symbol) -> bool {
        self.symbols.get(symbol).is_some_and(|s| s.traded)
    }

    /// Mark a symbol traded-today. Returns false if it was already marked;
    /// the flag is set exactly once per symbol per day, at submission time,
    /// so rapid successive ticks cannot produce a second entry.
    pub fn mark_traded(&mut self, symbol: &Symbol) -> bool {
        match self.symbols.get_mut(symbol) {
            Some(state) if !state.traded => {
                state.traded = true;
                true
            }
            _ => false,
        }
    }

    /// Attach a live bracket pair; the symbol is now in a position
    pub fn register_bracket(&mut self, symbol: &Symbol, pair: BracketPair) {
        if let Some(state) = self.symbols.get_mut(symbol) {
            state.bracket = Some(pair);
            state.phase = SymbolPhase::Entered;
        }
    }

    pub fn bracket(&self, symbol: &Symbol) -> Option<&BracketPair> {
        self.symbols.get(symbol).and_then(|s| s.bracket.as_ref())
    }

    /// Find which symbol's bracket a venue order belongs to, and which leg
    pub fn bracket_leg_for(&self, order_id: OrderId) -> Option<(Symbol, BracketPair, BracketLeg)> {
        self.symbols.iter().find_map(|(symbol, state)| {
            let pair = state.bracket.as_ref()?;
            let leg = pair.leg_of(order_id)?;
            Some((symbol.clone(), pair.clone(), leg))
        })
    }

    /// Clear a resolved bracket (one leg filled, sibling cancelled)
    pub fn resolve_bracket(&mut self, symbol: &Symbol) {
        if let Some(state) = self.symbols.get_mut(symbol) {
            state.bracket = None;
            state.phase = SymbolPhase::Exited;
        }
    }

    pub fn phase(&self, symbol: &Symbol) -> SymbolPhase {
        self.symbols
            .get(symbol)
            .map(|s| s.phase)
            .unwrap_or(SymbolPhase::NotSelected)
    }

    /// Daily cutoff: clear thresholds, the traded set and all brackets.
    /// Phases stay observable as ForcedClosed until the next `begin_day`.
    pub fn force_close(&mut self) {
        for state in self.symbols.values_mut() {
            state.traded = false;
            state.bracket = None;
            state.phase = SymbolPhase::ForcedClosed;
        }
    }

    /// Symbols with an active threshold
    pub fn selected_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols
            .iter()
            .filter(|(_, s)| s.phase != SymbolPhase::ForcedClosed)
            .map(|(symbol, _)| symbol)
    }

    /// True when no thresholds, traded flags or brackets remain
    pub fn is_cleared(&self) -> bool {
        self.symbols
            .values()
            .all(|s| s.phase == SymbolPhase::ForcedClosed && !s.traded && s.bracket.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection() -> DailySelection {
        vec![
            (Symbol::new("ABCD"), Money::from_f64(20.0)),
            (Symbol::new("EFGH"), Money::from_f64(31.5)),
        ]
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, 4).unwrap()
    }

    #[test]
    fn test_begin_day_sets_thresholds() {
        let mut session = DailySessionState::new();
        session.begin_day(date(), &selection());

        let abcd = Symbol::new("ABCD");
        assert_eq!(session.threshold(&abcd), Some(Money::from_f64(20.0)));
        assert_eq!(session.phase(&abcd), SymbolPhase::Selected);
        assert_eq!(session.phase(&Symbol::new("ZZZZ")), SymbolPhase::NotSelected);
    }

    #[test]
    fn test_mark_traded_is_once_only() {
        let mut session = DailySessionState::new();
        session.begin_day(date(), &selection());

        let abcd = Symbol::new("ABCD");
        assert!(session.mark_traded(&abcd));
        assert!(!session.mark_traded(&abcd));
        assert!(session.is_traded(&abcd));

        // Unselected symbols cannot be marked
        assert!(!session.mark_traded(&Symbol::new("ZZZZ")));
    }

    #[test]
    fn test_bracket_registration_and_resolution() {
        let mut session = DailySessionState::new();
        session.begin_day(date(), &selection());

        let abcd = Symbol::new("ABCD");
        session.mark_traded(&abcd);
        let pair = BracketPair::new(11, 12);
        session.register_bracket(&abcd, pair.clone());
        assert_eq!(session.phase(&abcd), SymbolPhase::Entered);

        let (found, _, leg) = session.bracket_leg_for(12).unwrap();
        assert_eq!(found, abcd);
        assert_eq!(leg, BracketLeg::Stop);
        assert!(session.bracket_leg_for(999).is_none());

        session.resolve_bracket(&abcd);
        assert_eq!(session.phase(&abcd), SymbolPhase::Exited);
        assert!(session.bracket(&abcd).is_none());
    }

    #[test]
    fn test_force_close_clears_everything() {
        let mut session = DailySessionState::new();
        session.begin_day(date(), &selection());

        let abcd = Symbol::new("ABCD");
        session.mark_traded(&abcd);
        session.register_bracket(&abcd, BracketPair::new(1, 2));

        session.force_close();
        assert!(session.is_cleared());
        assert_eq!(session.threshold(&abcd), None);
        assert!(!session.is_traded(&abcd));
        assert_eq!(session.phase(&abcd), SymbolPhase::ForcedClosed);
        assert_eq!(session.selected_symbols().count(), 0);

        // Next day resets phases back to the start
        session.begin_day(date().succ_opt().unwrap(), &selection());
        assert_eq!(session.phase(&abcd), SymbolPhase::Selected);
    }
}
