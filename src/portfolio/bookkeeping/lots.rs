use rust_decimal::Decimal;
use time::Date;

use crate::portfolio::Isin;

/// One open purchase lot. Lots live in acquisition order; a fully consumed
/// lot stays in place with a zero remainder.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct BuyLot {
    pub isin: Isin,
    pub shares_remaining: Decimal,
    pub unit_price: Decimal,
    pub date: Option<Date>,
}

#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct LotMatch {
    pub matched_shares: Decimal,
    pub matched_cost: Decimal,
}

/// Insertion-ordered queue of open buy lots across all instruments.
/// Consumption filters by ISIN and always drains the oldest matching open
/// lots first. Private working state of one cost-basis computation.
#[derive(Debug, Default)]
pub struct LotQueue {
    lots: Vec<BuyLot>,
}

impl LotQueue {
    pub fn new() -> LotQueue {
        LotQueue { lots: Vec::new() }
    }

    pub fn push(&mut self, lot: BuyLot) {
        debug_assert!(!crate::util::decimal::is_negative(&lot.shares_remaining));
        self.lots.push(lot);
    }

    pub fn open_shares(&self, isin: &str) -> Decimal {
        self.lots
            .iter()
            .filter(|l| l.isin == isin)
            .map(|l| l.shares_remaining)
            .sum()
    }

    /// Consumes up to `shares` of `isin` from the oldest open lots.
    /// Partial coverage is allowed; the caller decides how to treat the
    /// unmatched remainder.
    pub fn consume(&mut self, isin: &str, shares: Decimal) -> LotMatch {
        let mut to_match = shares;
        let mut matched = LotMatch::default();

        for lot in self.lots.iter_mut() {
            if to_match.is_zero() {
                break;
            }
            if lot.isin != isin || lot.shares_remaining.is_zero() {
                continue;
            }
            let take = to_match.min(lot.shares_remaining);
            matched.matched_shares += take;
            matched.matched_cost += take * lot.unit_price;
            lot.shares_remaining -= take;
            to_match -= take;
        }

        matched
    }
}
