//! Daily universe selection
//!
//! Pure function from (date, gapper table, filter config) to the day's
//! breakout candidates. Identical inputs always produce identical output,
//! which keeps backtests deterministic.

use crate::config::FilterConfig;
use crate::data::GapperTable;
use crate::{GapperRecord, Money, Symbol};
use chrono::NaiveDate;
use std::cmp::Ordering;
use tracing::{debug, info};

/// Ordered (symbol, premarket-high threshold) pairs for one trading day
pub type DailySelection = Vec<(Symbol, Money)>;

/// Select the day's universe.
///
/// Candidates must gap at least `min_gap_percent` and have a premarket high
/// of at least `min_premarket_high_price`. When more than `max_daily_trades`
/// qualify, the largest gaps win; ties on gap break by symbol ascending, a
/// stable rule independent of input row order.
pub fn select_universe(
    date: NaiveDate,
    table: &GapperTable,
    filter: &FilterConfig,
) -> DailySelection {
    let records = table.records_for(date);
    if records.is_empty() {
        debug!(%date, "No gapper records, empty selection");
        return Vec::new();
    }

    let mut candidates: Vec<&GapperRecord> = records
        .iter()
        .filter(|r| {
            r.gap_percent >= filter.min_gap_percent
                && r.premarket_high >= filter.min_premarket_high_price
        })
        .collect();

    if candidates.len() > filter.max_daily_trades {
        candidates.sort_by(|a, b| {
            b.gap_percent
                .partial_cmp(&a.gap_percent)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        candidates.truncate(filter.max_daily_trades);
    }

    let selection: DailySelection = candidates
        .iter()
        .map(|r| (r.symbol.clone(), Money::from_f64(r.premarket_high)))
        .collect();

    info!(
        %date,
        records = records.len(),
        selected = selection.len(),
        "Universe selected"
    );
    selection
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(symbol: &str, gap: f64, pmh: f64) -> GapperRecord {
        GapperRecord {
            date: date(),
            symbol: Symbol::new(symbol),
            gap_percent: gap,
            premarket_high: pmh,
            outstanding_shares: None,
            market_cap: None,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, 4).unwrap()
    }

    fn filter() -> FilterConfig {
        FilterConfig {
            min_gap_percent: 5.0,
            min_premarket_high_price: 10.0,
            max_daily_trades: 5,
        }
    }

    #[test]
    fn test_single_qualifying_candidate() {
        let table = GapperTable::from_records([record("ABCD", 10.0, 20.0)]);
        let selection = select_universe(date(), &table, &filter());
        assert_eq!(
            selection,
            vec![(Symbol::new("ABCD"), Money::from_f64(20.0))]
        );
    }

    #[test]
    fn test_missing_date_yields_empty() {
        let table = GapperTable::from_records([record("ABCD", 10.0, 20.0)]);
        let other = NaiveDate::from_ymd_opt(2021, 1, 5).unwrap();
        assert!(select_universe(other, &table, &filter()).is_empty());
    }

    #[test]
    fn test_filters_applied() {
        let table = GapperTable::from_records([
            record("LOWG", 4.9, 20.0),  // gap below minimum
            record("LOWP", 10.0, 9.99), // premarket high below minimum
            record("GOOD", 5.0, 10.0),  // boundary values qualify
        ]);
        let selection = select_universe(date(), &table, &filter());
        assert_eq!(selection.len(), 1);
        assert_eq!(selection[0].0, Symbol::new("GOOD"));
    }

    #[test]
    fn test_truncates_to_top_gappers() {
        let records: Vec<GapperRecord> = (0..10)
            .map(|i| record(&format!("SYM{}", i), 6.0 + i as f64, 20.0))
            .collect();
        let table = GapperTable::from_records(records);

        let selection = select_universe(date(), &table, &filter());
        assert_eq!(selection.len(), 5);
        // Top 5 gaps are SYM9..SYM5, in descending gap order
        let symbols: Vec<&str> = selection.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(symbols, vec!["SYM9", "SYM8", "SYM7", "SYM6", "SYM5"]);
    }

    #[test]
    fn test_no_sort_when_under_cap() {
        // At or under the cap, input order is preserved (all candidates taken)
        let table = GapperTable::from_records([
            record("ZZZZ", 6.0, 20.0),
            record("AAAA", 9.0, 20.0),
        ]);
        let selection = select_universe(date(), &table, &filter());
        let symbols: Vec<&str> = selection.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(symbols, vec!["ZZZZ", "AAAA"]);
    }

    #[test]
    fn test_tie_break_is_symbol_ascending() {
        let mut f = filter();
        f.max_daily_trades = 2;
        let table = GapperTable::from_records([
            record("CCCC", 8.0, 20.0),
            record("AAAA", 8.0, 20.0),
            record("BBBB", 8.0, 20.0),
        ]);
        let selection = select_universe(date(), &table, &f);
        let symbols: Vec<&str> = selection.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(symbols, vec!["AAAA", "BBBB"]);
    }

    #[test]
    fn test_determinism_under_input_reordering() {
        let mut f = filter();
        f.max_daily_trades = 3;
        let a = [
            record("DDDD", 8.0, 20.0),
            record("AAAA", 8.0, 21.0),
            record("CCCC", 9.0, 22.0),
            record("BBBB", 8.0, 23.0),
        ];
        let mut b = a.clone();
        b.reverse();

        let sel_a = select_universe(date(), &GapperTable::from_records(a), &f);
        let sel_b = select_universe(date(), &GapperTable::from_records(b), &f);
        assert_eq!(sel_a, sel_b);
    }
}
