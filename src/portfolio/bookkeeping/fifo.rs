use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::portfolio::{CostBasisReport, Isin, RealizedGainRecord, Transaction};
use crate::util::decimal::round_cents;

use super::lots::{BuyLot, LotQueue};

/// Matches sells against prior buys first-in-first-out and accumulates
/// realized gains per instrument.
///
/// Both slices are sorted internally by date (input order as tiebreak), so
/// callers may pass rows in file order. A sell that exceeds the open buy
/// history is not an error: the unmatched portion carries zero cost basis
/// (inflating the gain) and is reported via `unmatched_sell_shares`.
///
/// Inputs are never mutated; the lot queue is private working state
/// discarded when this returns. Monetary outputs are rounded to cents at
/// this boundary only.
pub fn compute_cost_basis(
    buys: &[&Transaction],
    sells: &[&Transaction],
) -> CostBasisReport {
    let mut sorted_buys: Vec<&Transaction> = buys.to_vec();
    sorted_buys.sort();
    let mut sorted_sells: Vec<&Transaction> = sells.to_vec();
    sorted_sells.sort();

    let mut queue = LotQueue::new();
    let mut total_invested = Decimal::ZERO;
    for buy in &sorted_buys {
        queue.push(BuyLot {
            isin: buy.isin.clone(),
            shares_remaining: buy.shares,
            unit_price: buy.price,
            date: buy.date,
        });
        total_invested += buy.amount_magnitude();
    }

    let mut gains_by_isin = HashMap::<Isin, RealizedGainRecord>::new();
    let mut total_proceeds = Decimal::ZERO;
    let mut total_cost_of_sold = Decimal::ZERO;
    let mut total_tax_already_paid = Decimal::ZERO;
    let mut unmatched_sell_shares = Decimal::ZERO;

    for sell in &sorted_sells {
        let matched = queue.consume(&sell.isin, sell.shares);
        let gain = sell.amount - matched.matched_cost;

        let unmatched = sell.shares - matched.matched_shares;
        if !unmatched.is_zero() {
            tracing::warn!(
                "compute_cost_basis: {} sell of {} shares on {} exceeds open \
                 buy lots by {} shares; unmatched portion gets zero cost basis",
                sell.isin,
                sell.shares,
                sell.date_str(),
                unmatched
            );
            unmatched_sell_shares += unmatched;
        }

        let record = gains_by_isin.entry(sell.isin.clone()).or_default();
        record.realized_gains += gain;
        record.cost_basis += matched.matched_cost;
        record.proceeds += sell.amount;
        record.shares_sold += sell.shares;
        record.tax_already_paid += sell.tax;
        record.transaction_count += 1;

        total_proceeds += sell.amount;
        total_cost_of_sold += matched.matched_cost;
        total_tax_already_paid += sell.tax;
    }

    // Publish: round every aggregate once, here.
    for record in gains_by_isin.values_mut() {
        record.realized_gains = round_cents(record.realized_gains);
        record.cost_basis = round_cents(record.cost_basis);
        record.proceeds = round_cents(record.proceeds);
        record.tax_already_paid = round_cents(record.tax_already_paid);
    }

    CostBasisReport {
        total_invested: round_cents(total_invested),
        total_proceeds: round_cents(total_proceeds),
        total_cost_of_sold: round_cents(total_cost_of_sold),
        total_realized_gains: round_cents(total_proceeds - total_cost_of_sold),
        total_tax_already_paid: round_cents(total_tax_already_paid),
        gains_by_isin,
        unmatched_sell_shares,
    }
}
