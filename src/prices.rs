//! Price alignment between article dates and daily closing prices.
//!
//! Markets close on weekends and holidays, so an article date often has no
//! closing price of its own. [`find_price`] picks the nearest prior close, and
//! [`trim_price_history`] reduces a ticker's cached prices to just the dates a
//! record's articles refer to.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::models::{PriceHistory, PricePair};
use crate::utils::parse_market_date;

/// Convert a price-history mapping into a list sorted ascending by date.
///
/// Keys that are not valid market dates are dropped with a warning.
pub fn sorted_prices(history: &PriceHistory) -> Vec<PricePair> {
    let mut dated = history
        .iter()
        .filter_map(|(date, price)| match parse_market_date(date) {
            Ok(parsed) => Some((parsed, PricePair::new(date.clone(), *price))),
            Err(e) => {
                warn!(error = %e, "Skipping malformed price date");
                None
            }
        })
        .collect::<Vec<_>>();
    dated.sort_by_key(|(parsed, _)| *parsed);
    dated.into_iter().map(|(_, pair)| pair).collect()
}

/// Find the closing price for `target` in `pairs`.
///
/// `pairs` must be sorted ascending by date (see [`sorted_prices`]). Market
/// dates are zero-padded `YYYY-MM-DD`, so string order is date order.
///
/// - An exact match returns that pair.
/// - A date between two known points returns `target` with the price of the
///   nearest prior point.
/// - A date before the first known point returns `None`; prices are never
///   carried backwards in time.
/// - A date after the last known point returns the last pair.
/// - An empty list returns `None`.
pub fn find_price(target: &str, pairs: &[PricePair]) -> Option<PricePair> {
    let mut previous: Option<&PricePair> = None;
    for pair in pairs {
        match pair.date.as_str().cmp(target) {
            Ordering::Equal => return Some(pair.clone()),
            Ordering::Greater => {
                return previous.map(|prior| PricePair::new(target, prior.price));
            }
            Ordering::Less => previous = Some(pair),
        }
    }
    pairs.last().cloned()
}

/// Keep only the prices needed for `dates` (market-data format).
///
/// Each distinct date is aligned with [`find_price`]; the resulting
/// date→price entries form the new history. Every other cached price point
/// is dropped.
pub fn trim_price_history<'a, I>(dates: I, history: &PriceHistory) -> PriceHistory
where
    I: IntoIterator<Item = &'a str>,
{
    let sorted = sorted_prices(history);
    let needed: BTreeSet<&str> = dates.into_iter().collect();

    let mut trimmed = PriceHistory::new();
    for date in needed {
        match find_price(date, &sorted) {
            Some(pair) => {
                trimmed.insert(pair.date, pair.price);
            }
            None => debug!(%date, "No price available for date"),
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<PricePair> {
        vec![
            PricePair::new("2018-01-20", 10.0),
            PricePair::new("2018-01-25", 12.0),
            PricePair::new("2018-01-30", 15.0),
        ]
    }

    #[test]
    fn test_exact_date_match() {
        assert_eq!(
            find_price("2018-01-25", &sample()),
            Some(PricePair::new("2018-01-25", 12.0))
        );
    }

    #[test]
    fn test_nearest_prior_price() {
        assert_eq!(
            find_price("2018-01-26", &sample()),
            Some(PricePair::new("2018-01-26", 12.0))
        );
    }

    #[test]
    fn test_date_before_first_price_is_absent() {
        assert_eq!(find_price("2018-01-10", &sample()), None);
    }

    #[test]
    fn test_date_after_last_price_returns_last_pair() {
        assert_eq!(
            find_price("2018-02-15", &sample()),
            Some(PricePair::new("2018-01-30", 15.0))
        );
    }

    #[test]
    fn test_empty_price_list() {
        assert_eq!(find_price("2018-01-25", &[]), None);
    }

    #[test]
    fn test_sorted_prices_orders_and_skips_malformed() {
        let mut history = PriceHistory::new();
        history.insert("2018-01-30".to_string(), 15.0);
        history.insert("2018-01-20".to_string(), 10.0);
        history.insert("01/25/2018".to_string(), 99.0);

        let sorted = sorted_prices(&history);
        assert_eq!(
            sorted,
            vec![
                PricePair::new("2018-01-20", 10.0),
                PricePair::new("2018-01-30", 15.0),
            ]
        );
    }

    #[test]
    fn test_trim_keeps_only_needed_dates() {
        let mut history = PriceHistory::new();
        for (d, p) in [
            ("2018-01-19", 9.0),
            ("2018-01-22", 11.0),
            ("2018-01-23", 11.5),
            ("2018-01-24", 11.8),
        ] {
            history.insert(d.to_string(), p);
        }

        // Saturday 2018-01-20 aligns to Friday's close; 2018-01-23 is exact;
        // 2018-01-01 predates everything and is left out.
        let trimmed = trim_price_history(
            ["2018-01-20", "2018-01-23", "2018-01-23", "2018-01-01"],
            &history,
        );

        let mut expected = PriceHistory::new();
        expected.insert("2018-01-20".to_string(), 9.0);
        expected.insert("2018-01-23".to_string(), 11.5);
        assert_eq!(trimmed, expected);
    }

    #[test]
    fn test_trim_is_stable_on_second_pass() {
        let mut history = PriceHistory::new();
        history.insert("2018-01-19".to_string(), 9.0);
        history.insert("2018-01-22".to_string(), 11.0);

        let dates = ["2018-01-20", "2018-01-22"];
        let once = trim_price_history(dates, &history);
        let twice = trim_price_history(dates, &once);
        assert_eq!(once, twice);
    }
}
