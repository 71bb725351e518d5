use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::portfolio::bookkeeping::compute_cost_basis;
use crate::portfolio::tax::{
    calculate_tax, derive_from_withholding, infer_exemption_used, ScenarioKind,
    TaxScenarioParameters, TaxScenarioResult, WithholdingDerivation,
};
use crate::portfolio::{CostBasisReport, TopGain, Transaction, TxAction};
use crate::util::decimal::{euro_precision_str, round_cents};

/// Descriptive statistics over the raw transaction listing, independent of
/// any tax scenario.
#[derive(Serialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct CsvFacts {
    pub transactions: usize,
    pub sell_count: usize,
    pub buy_count: usize,
    pub total_sell_value: Decimal,
    pub total_buy_value: Decimal,
    pub total_deposits: Decimal,
    pub total_withdrawals: Decimal,
    pub net_cashflow: Decimal,
    pub total_tax_deducted: Decimal,
    pub positive_tax_count: usize,
    pub negative_tax_count: usize,
    pub average_tax_per_sell: Decimal,
    pub largest_single_tax: Decimal,
    // ISO date strings; empty when no row carries a date.
    pub earliest_date: String,
    pub latest_date: String,
}

impl CsvFacts {
    pub fn collect(rows: &[Transaction]) -> CsvFacts {
        let mut facts = CsvFacts {
            transactions: rows.len(),
            ..CsvFacts::default()
        };

        let mut taxed_sell_count = 0usize;
        for row in rows {
            facts.net_cashflow += row.amount;
            match row.action {
                Some(TxAction::Sell) => {
                    facts.sell_count += 1;
                    facts.total_sell_value += row.amount;
                    facts.total_tax_deducted += row.tax;
                    if !row.tax.is_zero() {
                        taxed_sell_count += 1;
                        if crate::util::decimal::is_positive(&row.tax) {
                            facts.positive_tax_count += 1;
                            facts.largest_single_tax =
                                facts.largest_single_tax.max(row.tax);
                        } else {
                            facts.negative_tax_count += 1;
                        }
                    }
                }
                Some(TxAction::Buy) => {
                    facts.buy_count += 1;
                    facts.total_buy_value += row.amount_magnitude();
                }
                Some(TxAction::Deposit) => {
                    facts.total_deposits += row.amount;
                }
                Some(TxAction::Withdrawal) => {
                    facts.total_withdrawals += row.amount_magnitude();
                }
                _ => (),
            }
        }

        if taxed_sell_count > 0 {
            facts.average_tax_per_sell = round_cents(
                facts.total_tax_deducted / Decimal::from(taxed_sell_count),
            );
        }

        let mut dates: Vec<&time::Date> =
            rows.iter().filter_map(|r| r.date.as_ref()).collect();
        dates.sort();
        if let Some(first) = dates.first() {
            facts.earliest_date = first.to_string();
        }
        if let Some(last) = dates.last() {
            facts.latest_date = last.to_string();
        }

        facts.total_sell_value = round_cents(facts.total_sell_value);
        facts.total_buy_value = round_cents(facts.total_buy_value);
        facts.total_deposits = round_cents(facts.total_deposits);
        facts.total_withdrawals = round_cents(facts.total_withdrawals);
        facts.net_cashflow = round_cents(facts.net_cashflow);
        facts.total_tax_deducted = round_cents(facts.total_tax_deducted);
        facts
    }
}

/// Where the aggregate gains figure comes from.
#[derive(Serialize, PartialEq, Eq, Clone, Copy, Debug)]
pub enum GainsSource {
    /// Itemized FIFO matching of sells against buy history.
    FifoCostBasis,
    /// Reverse derivation from the withheld-tax total, for exports without
    /// usable buy history.
    WithholdingInference,
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct AnalysisSummary {
    pub portfolio_status: &'static str,
    pub tax_situation: &'static str,
    pub total_transactions: usize,
    pub total_invested: Decimal,
    pub total_proceeds: Decimal,
    pub total_realized_gains: Decimal,
    pub return_percentage: Decimal,
}

/// One scenario's complete output: consumed by renderers and serializable
/// as-is for the presentation layer.
#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct PortfolioAnalysis {
    pub scenario: ScenarioKind,
    pub summary: AnalysisSummary,
    pub cost_basis: CostBasisReport,
    pub tax_liability: TaxScenarioResult,
    pub top_5_gains: Vec<TopGain>,
    // Present only when gains were reverse-derived from withholding.
    pub derivation: Option<WithholdingDerivation>,
    // Heuristic, not authoritative: estimated exemption already consumed,
    // from sells with zero withheld tax.
    pub inferred_exemption_used_estimate: Decimal,
}

impl PortfolioAnalysis {
    /// Flat key-value rows for downstream CSV/PDF exporters. Values are
    /// plain decimal strings; currency symbols and locale separators are
    /// a presentation concern.
    pub fn flat_rows(&self) -> Vec<(String, String)> {
        let mut rows: Vec<(String, String)> = vec![
            ("scenario".to_string(), self.scenario.key().to_string()),
            (
                "portfolio_status".to_string(),
                self.summary.portfolio_status.to_string(),
            ),
            (
                "tax_situation".to_string(),
                self.summary.tax_situation.to_string(),
            ),
            (
                "total_invested".to_string(),
                euro_precision_str(&self.summary.total_invested),
            ),
            (
                "total_proceeds".to_string(),
                euro_precision_str(&self.summary.total_proceeds),
            ),
            (
                "total_realized_gains".to_string(),
                euro_precision_str(&self.summary.total_realized_gains),
            ),
            (
                "return_percentage".to_string(),
                self.summary.return_percentage.to_string(),
            ),
            (
                "exemption_available".to_string(),
                euro_precision_str(&self.tax_liability.exemption_available),
            ),
            (
                "exemption_remaining".to_string(),
                euro_precision_str(&self.tax_liability.exemption_remaining),
            ),
            (
                "taxable_gains".to_string(),
                euro_precision_str(&self.tax_liability.taxable_gains),
            ),
            (
                "effective_rate".to_string(),
                self.tax_liability.effective_rate.to_string(),
            ),
            (
                "gross_tax_liability".to_string(),
                euro_precision_str(&self.tax_liability.gross_tax_liability),
            ),
            (
                "tax_already_paid".to_string(),
                euro_precision_str(&self.tax_liability.tax_already_paid),
            ),
            (
                "tax_owed".to_string(),
                euro_precision_str(&self.tax_liability.tax_owed),
            ),
            (
                "tax_refund".to_string(),
                euro_precision_str(&self.tax_liability.tax_refund),
            ),
            (
                "after_tax_return".to_string(),
                euro_precision_str(&self.tax_liability.after_tax_return),
            ),
        ];
        if self.cost_basis.has_unmatched_sells() {
            rows.push((
                "unmatched_sell_shares".to_string(),
                self.cost_basis.unmatched_sell_shares.to_string(),
            ));
        }
        rows
    }
}

/// All four comparison scenarios over the same transaction list.
#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct ScenarioMatrix {
    pub individual: PortfolioAnalysis,
    pub couple: PortfolioAnalysis,
    pub individual_with_church_tax: PortfolioAnalysis,
    pub couple_with_church_tax: PortfolioAnalysis,
    pub broker_applied_exemption: bool,
    pub csv_facts: CsvFacts,
}

impl ScenarioMatrix {
    pub fn get(&self, kind: ScenarioKind) -> &PortfolioAnalysis {
        match kind {
            ScenarioKind::Individual => &self.individual,
            ScenarioKind::Couple => &self.couple,
            ScenarioKind::IndividualWithChurchTax => {
                &self.individual_with_church_tax
            }
            ScenarioKind::CoupleWithChurchTax => &self.couple_with_church_tax,
        }
    }

    /// Additional refund a couple assessment yields over an individual one.
    pub fn couple_refund_advantage(&self) -> Decimal {
        self.couple.tax_liability.tax_refund
            - self.individual.tax_liability.tax_refund
    }
}

/// One computation run over one parsed transaction list. Owns everything
/// the pipeline needs; no ambient state survives between requests, so
/// concurrent invocations (e.g. one per upload/session behind a server)
/// are fully isolated.
pub struct AnalysisRequest {
    rows: Vec<Transaction>,
    facts: CsvFacts,
    base_params: TaxScenarioParameters,
    gains_source: GainsSource,
}

impl AnalysisRequest {
    pub fn new(
        rows: Vec<Transaction>,
        base_params: TaxScenarioParameters,
        gains_source: GainsSource,
    ) -> AnalysisRequest {
        let facts = CsvFacts::collect(&rows);
        AnalysisRequest {
            rows,
            facts,
            base_params,
            gains_source,
        }
    }

    pub fn facts(&self) -> &CsvFacts {
        &self.facts
    }

    // Trade rows entering the FIFO engine: classified and dated.
    fn trade_rows(&self, action: TxAction) -> Vec<&Transaction> {
        self.rows
            .iter()
            .filter(|r| r.is_action(action) && r.date.is_some())
            .collect()
    }

    /// Computes one scenario.
    pub fn analyze(&self, kind: ScenarioKind) -> PortfolioAnalysis {
        let params = kind.parameters(&self.base_params);

        let (cost_basis, derivation, total_gains, already_paid) =
            match self.gains_source {
                GainsSource::FifoCostBasis => {
                    let report = compute_cost_basis(
                        &self.trade_rows(TxAction::Buy),
                        &self.trade_rows(TxAction::Sell),
                    );
                    let gains = report.total_realized_gains;
                    let paid = report.total_tax_already_paid;
                    (report, None, gains, paid)
                }
                GainsSource::WithholdingInference => {
                    let derived = derive_from_withholding(
                        self.facts.total_tax_deducted,
                        params.effective_rate(),
                        params.remaining_exemption(),
                        params.broker_applied_exemption,
                    );
                    let gains = derived.gains_estimated;
                    (
                        CostBasisReport::default(),
                        Some(derived),
                        gains,
                        self.facts.total_tax_deducted,
                    )
                }
            };

        let tax_liability = calculate_tax(total_gains, already_paid, &params);

        let (total_invested, total_proceeds) = match self.gains_source {
            GainsSource::FifoCostBasis => {
                (cost_basis.total_invested, cost_basis.total_proceeds)
            }
            GainsSource::WithholdingInference => {
                (self.facts.total_buy_value, self.facts.total_sell_value)
            }
        };

        let return_percentage =
            if crate::util::decimal::is_positive(&total_invested) {
                round_cents(total_gains / total_invested * dec!(100))
            } else {
                Decimal::ZERO
            };

        let summary = AnalysisSummary {
            portfolio_status: if crate::util::decimal::is_positive(&total_gains)
            {
                "PROFIT"
            } else {
                "LOSS"
            },
            tax_situation: if crate::util::decimal::is_positive(
                &tax_liability.tax_refund,
            ) {
                "REFUND"
            } else {
                "OWED"
            },
            total_transactions: self.facts.sell_count,
            total_invested,
            total_proceeds,
            total_realized_gains: round_cents(total_gains),
            return_percentage,
        };

        let all_rows: Vec<&Transaction> = self.rows.iter().collect();
        let inferred = infer_exemption_used(&all_rows, params.total_exemption());

        PortfolioAnalysis {
            scenario: kind,
            summary,
            top_5_gains: cost_basis.top_gains(5),
            cost_basis,
            tax_liability,
            derivation,
            inferred_exemption_used_estimate: inferred,
        }
    }

    /// Computes the full comparison matrix.
    pub fn scenario_matrix(&self) -> ScenarioMatrix {
        ScenarioMatrix {
            individual: self.analyze(ScenarioKind::Individual),
            couple: self.analyze(ScenarioKind::Couple),
            individual_with_church_tax: self
                .analyze(ScenarioKind::IndividualWithChurchTax),
            couple_with_church_tax: self
                .analyze(ScenarioKind::CoupleWithChurchTax),
            broker_applied_exemption: self.base_params.broker_applied_exemption,
            csv_facts: self.facts.clone(),
        }
    }
}
