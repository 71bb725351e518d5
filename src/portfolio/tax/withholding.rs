use rust_decimal::Decimal;
use serde::Serialize;

use crate::portfolio::{Transaction, TxAction};
use crate::util::decimal::{euro_precision_str, round_cents, PosDecimal};

/// Result of reverse-deriving gross gains from withheld tax alone.
///
/// Sign convention: `settlement` is positive when tax is still owed and
/// negative for a refund. This is the inverse of the FIFO path's separate
/// `tax_owed`/`tax_refund` pair; the two conventions are intentionally
/// kept on distinct types.
#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct WithholdingDerivation {
    pub total_tax_deducted: Decimal,
    pub effective_rate: Decimal,
    pub gains_estimated: Decimal,
    pub taxable_gains: Decimal,
    pub tax_liability: Decimal,
    pub settlement: Decimal,
    pub exemption_applied_now: Decimal,
    // Set when the effective rate was zero; the estimate is then zero
    // rather than dividing by zero, and the configuration needs review.
    pub rate_was_zero: bool,
    // Plain-text explanation of the arithmetic, free of locale formatting.
    pub derivation: String,
}

/// Infers gross gains from the ratio of withheld tax to the effective
/// combined rate. Used when itemized buy/sell matching is unavailable and
/// the sum of the tax column is the only signal.
pub fn derive_from_withholding(
    total_tax_deducted: Decimal,
    effective_rate: Decimal,
    exemption_remaining: Decimal,
    broker_applied_exemption: bool,
) -> WithholdingDerivation {
    let rate = match PosDecimal::try_from(effective_rate) {
        Ok(rate) => rate,
        Err(_) => {
            tracing::warn!(
                "derive_from_withholding: effective rate is zero; \
                 gains cannot be inferred"
            );
            return WithholdingDerivation {
                total_tax_deducted: round_cents(total_tax_deducted),
                effective_rate,
                gains_estimated: Decimal::ZERO,
                taxable_gains: Decimal::ZERO,
                tax_liability: Decimal::ZERO,
                settlement: round_cents(-total_tax_deducted),
                exemption_applied_now: Decimal::ZERO,
                rate_was_zero: true,
                derivation: "Effective rate is zero; gross gains cannot be \
                             inferred from withheld tax"
                    .to_string(),
            };
        }
    };

    // If the broker already excluded the exemption from its withholding
    // base, the inferred gross must add it back before comparing against
    // the taxpayer's own entitlement.
    let gains_estimated = if broker_applied_exemption {
        total_tax_deducted / *rate + exemption_remaining
    } else {
        total_tax_deducted / *rate
    };

    let taxable_gains = (gains_estimated - exemption_remaining).max(Decimal::ZERO);
    let tax_liability = taxable_gains * *rate;
    let settlement = tax_liability - total_tax_deducted;
    let exemption_applied_now = gains_estimated.min(exemption_remaining);

    let rate_percent = (*rate * rust_decimal_macros::dec!(100)).normalize();
    let derivation = if broker_applied_exemption {
        format!(
            "Broker flagged the allowance as already applied. Adding {} back \
             to the inferred gross before applying the {}% rate.",
            euro_precision_str(&exemption_remaining),
            rate_percent,
        )
    } else {
        format!(
            "Tax column totals {}. Reversing the {}% effective rate gives \
             gross gains of {} before exemptions.",
            euro_precision_str(&total_tax_deducted),
            rate_percent,
            euro_precision_str(&gains_estimated),
        )
    };

    WithholdingDerivation {
        total_tax_deducted: round_cents(total_tax_deducted),
        effective_rate,
        gains_estimated: round_cents(gains_estimated),
        taxable_gains: round_cents(taxable_gains),
        tax_liability: round_cents(tax_liability),
        settlement: round_cents(settlement),
        exemption_applied_now: round_cents(exemption_applied_now),
        rate_was_zero: false,
        derivation,
    }
}

/// Heuristic estimate of how much exemption the broker has already
/// consumed: sells that carry exactly zero withheld tax are assumed to
/// have fit within the allowance, and their amounts are credited against
/// it (capped at the remaining exemption).
///
/// This is a proxy, not an authoritative figure, and is labeled as an
/// estimate wherever it is rendered.
pub fn infer_exemption_used(
    rows: &[&Transaction],
    exemption_cap: Decimal,
) -> Decimal {
    let mut used = Decimal::ZERO;
    let mut remaining = exemption_cap;

    for row in rows {
        if !row.is_action(TxAction::Sell) {
            continue;
        }
        if row.tax.is_zero() && crate::util::decimal::is_positive(&remaining) {
            let gain = row.amount.max(Decimal::ZERO);
            let apply = gain.min(remaining);
            used += apply;
            remaining -= apply;
        }
    }

    round_cents(used)
}

// MARK: Tests
#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::portfolio::{Transaction, TxAction};

    use super::{derive_from_withholding, infer_exemption_used};

    #[test]
    fn test_full_refund_within_exemption() {
        // 260 withheld at 26% implies 1000 gross, fully inside the 2000
        // exemption: liability 0, settlement is a full refund.
        let d = derive_from_withholding(dec!(260), dec!(0.26), dec!(2000), false);
        assert_eq!(d.gains_estimated, dec!(1000.00));
        assert_eq!(d.taxable_gains, dec!(0.00));
        assert_eq!(d.tax_liability, dec!(0.00));
        assert_eq!(d.settlement, dec!(-260.00));
        assert_eq!(d.exemption_applied_now, dec!(1000.00));
        assert!(!d.rate_was_zero);
    }

    #[test]
    fn test_gains_beyond_exemption() {
        // 1040 withheld at 26% implies 4000 gross; 2000 taxable after the
        // exemption, liability 520, so 520 of the withholding comes back.
        let d = derive_from_withholding(dec!(1040), dec!(0.26), dec!(2000), false);
        assert_eq!(d.gains_estimated, dec!(4000.00));
        assert_eq!(d.taxable_gains, dec!(2000.00));
        assert_eq!(d.tax_liability, dec!(520.00));
        assert_eq!(d.settlement, dec!(-520.00));
        assert_eq!(d.exemption_applied_now, dec!(2000.00));
    }

    #[test]
    fn test_broker_applied_exemption_adds_back() {
        // Broker already excluded the allowance from its withholding base:
        // inferred gross = 260 / 0.26 + 2000 = 3000. Taxable 1000 at 26%
        // equals exactly what was withheld.
        let d = derive_from_withholding(dec!(260), dec!(0.26), dec!(2000), true);
        assert_eq!(d.gains_estimated, dec!(3000.00));
        assert_eq!(d.taxable_gains, dec!(1000.00));
        assert_eq!(d.tax_liability, dec!(260.00));
        assert_eq!(d.settlement, dec!(0.00));
    }

    #[test]
    fn test_zero_rate_guard() {
        let d = derive_from_withholding(dec!(260), dec!(0), dec!(2000), false);
        assert!(d.rate_was_zero);
        assert_eq!(d.gains_estimated, dec!(0));
        assert_eq!(d.tax_liability, dec!(0));
        assert_eq!(d.settlement, dec!(-260.00));
    }

    #[test]
    fn test_zero_withholding() {
        let d = derive_from_withholding(dec!(0), dec!(0.26), dec!(1000), false);
        assert_eq!(d.gains_estimated, dec!(0.00));
        assert_eq!(d.settlement, dec!(0.00));
    }

    fn sell_row(amount: rust_decimal::Decimal, tax: rust_decimal::Decimal) -> Transaction {
        Transaction {
            action: Some(TxAction::Sell),
            type_raw: "Sell".to_string(),
            amount,
            tax,
            ..Transaction::default()
        }
    }

    #[test]
    fn test_infer_exemption_used() {
        let rows = vec![
            sell_row(dec!(800), dec!(0)),
            // Taxed sell: not counted
            sell_row(dec!(500), dec!(20)),
            sell_row(dec!(700), dec!(0)),
        ];
        let refs: Vec<&Transaction> = rows.iter().collect();
        // 800 + 700, capped at 1000
        assert_eq!(infer_exemption_used(&refs, dec!(1000)), dec!(1000.00));
        assert_eq!(infer_exemption_used(&refs, dec!(2000)), dec!(1500.00));
    }

    #[test]
    fn test_infer_exemption_ignores_losses_and_buys() {
        let buy = Transaction {
            action: Some(TxAction::Buy),
            amount: dec!(-500),
            ..Transaction::default()
        };
        let rows = vec![sell_row(dec!(-300), dec!(0)), buy];
        let refs: Vec<&Transaction> = rows.iter().collect();
        assert_eq!(infer_exemption_used(&refs, dec!(2000)), dec!(0));
    }
}
