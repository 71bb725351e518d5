use std::fmt::Display;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::util::decimal::{round_cents, GreaterEqualZeroDecimal};

use super::rates::TaxRates;

pub const INDIVIDUAL_EXEMPTION_EUR: Decimal = dec!(1000);
pub const COUPLE_EXEMPTION_EUR: Decimal = dec!(2000);

/// Full parameterization of one tax scenario.
#[derive(Clone, Debug)]
pub struct TaxScenarioParameters {
    pub is_couple: bool,
    // Capped against the scenario's total exemption before use.
    pub exemption_already_used: GreaterEqualZeroDecimal,
    pub include_church_tax: bool,
    // True when the broker's withholding already had the exemption baked
    // in, in which case the "already paid" input must be reconstructed
    // rather than taken at face value.
    pub broker_applied_exemption: bool,
    pub rates: TaxRates,
}

impl Default for TaxScenarioParameters {
    fn default() -> Self {
        Self {
            is_couple: false,
            exemption_already_used: GreaterEqualZeroDecimal::zero(),
            include_church_tax: false,
            broker_applied_exemption: false,
            rates: TaxRates::default(),
        }
    }
}

impl TaxScenarioParameters {
    pub fn total_exemption(&self) -> Decimal {
        if self.is_couple {
            COUPLE_EXEMPTION_EUR
        } else {
            INDIVIDUAL_EXEMPTION_EUR
        }
    }

    pub fn remaining_exemption(&self) -> Decimal {
        let total = self.total_exemption();
        let used = (*self.exemption_already_used).min(total);
        total - used
    }

    pub fn effective_rate(&self) -> Decimal {
        self.rates.effective_rate(self.include_church_tax)
    }
}

/// Derived, read-only scenario outcome. At most one of `tax_owed` and
/// `tax_refund` is non-zero.
#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct TaxScenarioResult {
    pub total_gains: Decimal,
    pub exemption_available: Decimal,
    pub exemption_already_used: Decimal,
    pub exemption_remaining: Decimal,
    pub taxable_gains: Decimal,
    // Fraction, not percent (0.26375)
    pub effective_rate: Decimal,
    pub gross_tax_liability: Decimal,
    // Corrected figure when broker_applied_exemption is set
    pub tax_already_paid: Decimal,
    pub tax_owed: Decimal,
    pub tax_refund: Decimal,
    pub after_tax_return: Decimal,
    pub is_couple: bool,
    pub includes_church_tax: bool,
    pub broker_applied_exemption: bool,
    pub note: String,
}

/// Pure capital-gains tax formula over aggregate realized gains.
pub fn calculate_tax(
    total_gains: Decimal,
    already_paid_tax: Decimal,
    params: &TaxScenarioParameters,
) -> TaxScenarioResult {
    let total_exemption = params.total_exemption();
    let remaining_exemption = params.remaining_exemption();
    let taxable_gains = (total_gains - remaining_exemption).max(Decimal::ZERO);

    let effective_rate = params.effective_rate();
    let gross_tax_liability = taxable_gains * effective_rate;

    // If the broker already applied the exemption, its withholding was
    // based on (gains - full exemption), so reconstruct that figure
    // instead of trusting the raw input.
    let corrected_paid = if params.broker_applied_exemption {
        let broker_taxable = (total_gains - total_exemption).max(Decimal::ZERO);
        broker_taxable * effective_rate
    } else {
        already_paid_tax
    };

    let tax_refund = (corrected_paid - gross_tax_liability).max(Decimal::ZERO);
    let tax_owed = (gross_tax_liability - corrected_paid).max(Decimal::ZERO);

    TaxScenarioResult {
        total_gains: round_cents(total_gains),
        exemption_available: total_exemption,
        exemption_already_used: (*params.exemption_already_used)
            .min(total_exemption),
        exemption_remaining: remaining_exemption,
        taxable_gains: round_cents(taxable_gains),
        effective_rate,
        gross_tax_liability: round_cents(gross_tax_liability),
        tax_already_paid: round_cents(corrected_paid),
        tax_owed: round_cents(tax_owed),
        tax_refund: round_cents(tax_refund),
        after_tax_return: round_cents(total_gains - gross_tax_liability),
        is_couple: params.is_couple,
        includes_church_tax: params.include_church_tax,
        broker_applied_exemption: params.broker_applied_exemption,
        note: if params.broker_applied_exemption {
            "Broker already applied exemption to withholding".to_string()
        } else {
            "Standard calculation".to_string()
        },
    }
}

/// The fixed comparison matrix: {individual, couple} x {church, no church}.
#[derive(Serialize, PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum ScenarioKind {
    Individual,
    Couple,
    IndividualWithChurchTax,
    CoupleWithChurchTax,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 4] = [
        ScenarioKind::Individual,
        ScenarioKind::Couple,
        ScenarioKind::IndividualWithChurchTax,
        ScenarioKind::CoupleWithChurchTax,
    ];

    pub fn is_couple(&self) -> bool {
        matches!(
            self,
            ScenarioKind::Couple | ScenarioKind::CoupleWithChurchTax
        )
    }

    pub fn includes_church_tax(&self) -> bool {
        matches!(
            self,
            ScenarioKind::IndividualWithChurchTax
                | ScenarioKind::CoupleWithChurchTax
        )
    }

    /// Stable key used in serialized output and file names.
    pub fn key(&self) -> &'static str {
        match self {
            ScenarioKind::Individual => "individual",
            ScenarioKind::Couple => "couple",
            ScenarioKind::IndividualWithChurchTax => "individual_with_church_tax",
            ScenarioKind::CoupleWithChurchTax => "couple_with_church_tax",
        }
    }

    /// Parameters for this scenario, derived from a base parameter set.
    pub fn parameters(
        &self,
        base: &TaxScenarioParameters,
    ) -> TaxScenarioParameters {
        TaxScenarioParameters {
            is_couple: self.is_couple(),
            include_church_tax: self.includes_church_tax(),
            ..base.clone()
        }
    }
}

impl Display for ScenarioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScenarioKind::Individual => "Individual",
            ScenarioKind::Couple => "Couple",
            ScenarioKind::IndividualWithChurchTax => "Individual + church tax",
            ScenarioKind::CoupleWithChurchTax => "Couple + church tax",
        };
        write!(f, "{}", s)
    }
}
