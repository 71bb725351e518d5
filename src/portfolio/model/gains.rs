use std::collections::HashMap;

use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;

use super::tx::Isin;

/// Per-ISIN accumulation of realized results, built up by the FIFO engine
/// as sells are processed in chronological order.
#[derive(Serialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct RealizedGainRecord {
    pub realized_gains: Decimal,
    pub cost_basis: Decimal,
    pub proceeds: Decimal,
    pub shares_sold: Decimal,
    pub tax_already_paid: Decimal,
    pub transaction_count: u32,
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct TopGain {
    pub isin: Isin,
    pub gain: Decimal,
}

/// Aggregate output of the FIFO cost-basis computation. All monetary fields
/// are rounded to cents at this boundary; per-record values keep the same
/// rule (rounded once, when the report is published).
#[derive(Serialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct CostBasisReport {
    pub total_invested: Decimal,
    pub total_proceeds: Decimal,
    pub total_cost_of_sold: Decimal,
    pub total_realized_gains: Decimal,
    pub total_tax_already_paid: Decimal,
    pub gains_by_isin: HashMap<Isin, RealizedGainRecord>,
    // Sell shares for which no open buy lot could be matched. Their cost
    // basis is zero, which inflates realized gains. Surfaced so consumers
    // can render a warning rather than silently correcting.
    pub unmatched_sell_shares: Decimal,
}

impl CostBasisReport {
    pub fn has_unmatched_sells(&self) -> bool {
        !self.unmatched_sell_shares.is_zero()
    }

    /// Largest realized gains first. Ties broken by ISIN for determinism.
    pub fn top_gains(&self, n: usize) -> Vec<TopGain> {
        self.gains_by_isin
            .iter()
            .sorted_by(|(isin_a, rec_a), (isin_b, rec_b)| {
                rec_b
                    .realized_gains
                    .cmp(&rec_a.realized_gains)
                    .then_with(|| isin_a.cmp(isin_b))
            })
            .take(n)
            .map(|(isin, rec)| TopGain {
                isin: isin.clone(),
                gain: rec.realized_gains,
            })
            .collect()
    }
}
