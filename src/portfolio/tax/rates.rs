use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// How church tax enters the combined rate. Both modes exist in the wild;
/// they are deliberately separate, named options.
#[derive(Serialize, PartialEq, Eq, Clone, Copy, Debug)]
pub enum ChurchTaxMode {
    /// A fixed differential in percentage points added to the flat
    /// withholding rate (26% becomes 26.375%).
    RateDifferential(Decimal),
    /// A percentage of the base tax itself (8% or 9% depending on the
    /// federal state).
    PercentOfBaseTax(Decimal),
}

/// Rate parameterization for the capital-gains formula. All fields are in
/// percent, not fractions; `effective_rate` does the conversion.
#[derive(Serialize, PartialEq, Eq, Clone, Copy, Debug)]
pub struct TaxRates {
    pub base_rate_percent: Decimal,
    pub solidarity_percent_of_base: Decimal,
    pub church_tax_mode: ChurchTaxMode,
}

impl TaxRates {
    /// The flat rate German brokers withhold at: 26%, or 26.375% for
    /// church-tax payers. Solidarity surcharge is already baked in.
    pub fn flat_withholding() -> TaxRates {
        TaxRates {
            base_rate_percent: dec!(26),
            solidarity_percent_of_base: dec!(0),
            church_tax_mode: ChurchTaxMode::RateDifferential(dec!(0.375)),
        }
    }

    /// The statutory composition: 25% base, 5.5% solidarity surcharge on
    /// the base tax, church tax as a percentage of the base tax.
    pub fn composed_statutory() -> TaxRates {
        TaxRates {
            base_rate_percent: dec!(25),
            solidarity_percent_of_base: dec!(5.5),
            church_tax_mode: ChurchTaxMode::PercentOfBaseTax(dec!(9)),
        }
    }

    /// Combined rate as a fraction (e.g. 0.26375), suitable for direct
    /// multiplication with taxable gains.
    pub fn effective_rate(&self, include_church_tax: bool) -> Decimal {
        let base = self.base_rate_percent;
        let soli = base * self.solidarity_percent_of_base / dec!(100);
        let church = if include_church_tax {
            match self.church_tax_mode {
                ChurchTaxMode::RateDifferential(points) => points,
                ChurchTaxMode::PercentOfBaseTax(pct) => base * pct / dec!(100),
            }
        } else {
            Decimal::ZERO
        };
        (base + soli + church) / dec!(100)
    }

    /// Short human-readable breakdown ("25% base + 5.5% soli + church").
    pub fn describe(&self, include_church_tax: bool) -> String {
        let mut parts = vec![format!("{}% base", self.base_rate_percent)];
        if !self.solidarity_percent_of_base.is_zero() {
            parts.push(format!("{}% soli", self.solidarity_percent_of_base));
        }
        if include_church_tax {
            parts.push("church".to_string());
        }
        parts.join(" + ")
    }
}

impl Default for TaxRates {
    fn default() -> Self {
        TaxRates::flat_withholding()
    }
}

// MARK: Tests
#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::{ChurchTaxMode, TaxRates};

    #[test]
    fn test_flat_withholding_rate() {
        let rates = TaxRates::flat_withholding();
        assert_eq!(rates.effective_rate(false), dec!(0.26));
        assert_eq!(rates.effective_rate(true), dec!(0.26375));
    }

    #[test]
    fn test_composed_statutory_rate() {
        let rates = TaxRates::composed_statutory();
        // 25 + 25 * 5.5% = 26.375
        assert_eq!(rates.effective_rate(false), dec!(0.26375));
        // ... + 25 * 9% = 28.625
        assert_eq!(rates.effective_rate(true), dec!(0.28625));
    }

    #[test]
    fn test_both_church_modes_are_distinct() {
        let differential = TaxRates {
            base_rate_percent: dec!(26),
            solidarity_percent_of_base: dec!(0),
            church_tax_mode: ChurchTaxMode::RateDifferential(dec!(0.375)),
        };
        let percent_of_tax = TaxRates {
            base_rate_percent: dec!(26),
            solidarity_percent_of_base: dec!(0),
            church_tax_mode: ChurchTaxMode::PercentOfBaseTax(dec!(9)),
        };
        assert_eq!(differential.effective_rate(true), dec!(0.26375));
        assert_eq!(percent_of_tax.effective_rate(true), dec!(0.2834));
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            TaxRates::flat_withholding().describe(false),
            "26% base"
        );
        assert_eq!(
            TaxRates::composed_statutory().describe(true),
            "25% base + 5.5% soli + church"
        );
    }

    #[test]
    fn test_zero_rates_allowed() {
        let rates = TaxRates {
            base_rate_percent: dec!(0),
            solidarity_percent_of_base: dec!(0),
            church_tax_mode: ChurchTaxMode::RateDifferential(dec!(0)),
        };
        assert_eq!(rates.effective_rate(true), dec!(0));
    }
}
