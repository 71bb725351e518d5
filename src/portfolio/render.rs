use crate::portfolio::summary::{CsvFacts, PortfolioAnalysis, ScenarioMatrix};
use crate::portfolio::tax::ScenarioKind;
use crate::util::decimal::euro_precision_str;

/// Output-format-agnostic table model, fed to console/CSV formatters.
/// Values are plain decimal strings; symbols and locale separators are up
/// to the formatter.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct RenderTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub footer: Vec<String>,
    pub notes: Vec<String>,
    pub errors: Vec<String>,
}

fn strs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn render_facts_table(facts: &CsvFacts) -> RenderTable {
    let row = |label: &str, value: String| vec![label.to_string(), value];
    RenderTable {
        header: strs(&["Fact", "Value"]),
        rows: vec![
            row("Transactions", facts.transactions.to_string()),
            row("Buys", facts.buy_count.to_string()),
            row("Sells", facts.sell_count.to_string()),
            row("Total buy value", euro_precision_str(&facts.total_buy_value)),
            row(
                "Total sell value",
                euro_precision_str(&facts.total_sell_value),
            ),
            row("Deposits", euro_precision_str(&facts.total_deposits)),
            row("Withdrawals", euro_precision_str(&facts.total_withdrawals)),
            row("Net cash flow", euro_precision_str(&facts.net_cashflow)),
            row(
                "Tax withheld",
                euro_precision_str(&facts.total_tax_deducted),
            ),
            row(
                "Avg tax per taxed sell",
                euro_precision_str(&facts.average_tax_per_sell),
            ),
            row(
                "Largest single withholding",
                euro_precision_str(&facts.largest_single_tax),
            ),
            row("First transaction", facts.earliest_date.clone()),
            row("Last transaction", facts.latest_date.clone()),
        ],
        ..RenderTable::default()
    }
}

pub fn render_scenario_table(analysis: &PortfolioAnalysis) -> RenderTable {
    let mut table = RenderTable {
        header: strs(&["Item", "EUR"]),
        ..RenderTable::default()
    };

    for (key, value) in analysis.flat_rows() {
        table.rows.push(vec![key, value]);
    }

    if analysis.cost_basis.has_unmatched_sells() {
        table.notes.push(format!(
            "[!] {} sold shares had no matching buy history; their cost \
             basis is zero, which inflates the computed gain.",
            analysis.cost_basis.unmatched_sell_shares
        ));
    }
    if let Some(derived) = &analysis.derivation {
        table.notes.push(derived.derivation.clone());
        if derived.rate_was_zero {
            table
                .errors
                .push("Effective tax rate is zero; check rate settings".to_string());
        }
    }
    if !analysis.inferred_exemption_used_estimate.is_zero() {
        table.notes.push(format!(
            "Estimated exemption already consumed by untaxed sells: {} \
             (heuristic, not authoritative)",
            euro_precision_str(&analysis.inferred_exemption_used_estimate)
        ));
    }

    table
}

pub fn render_top_gains_table(analysis: &PortfolioAnalysis) -> RenderTable {
    let mut table = RenderTable {
        header: strs(&["ISIN", "Realized gain"]),
        ..RenderTable::default()
    };
    for top in &analysis.top_5_gains {
        table
            .rows
            .push(vec![top.isin.clone(), euro_precision_str(&top.gain)]);
    }
    table
}

pub fn render_per_isin_table(analysis: &PortfolioAnalysis) -> RenderTable {
    let mut table = RenderTable {
        header: strs(&[
            "ISIN",
            "Realized gain",
            "Cost basis",
            "Proceeds",
            "Shares sold",
            "Tax withheld",
            "Sells",
        ]),
        ..RenderTable::default()
    };

    let mut isins: Vec<&String> = analysis.cost_basis.gains_by_isin.keys().collect();
    isins.sort();
    for isin in isins {
        let rec = &analysis.cost_basis.gains_by_isin[isin];
        table.rows.push(vec![
            isin.clone(),
            euro_precision_str(&rec.realized_gains),
            euro_precision_str(&rec.cost_basis),
            euro_precision_str(&rec.proceeds),
            rec.shares_sold.to_string(),
            euro_precision_str(&rec.tax_already_paid),
            rec.transaction_count.to_string(),
        ]);
    }
    table
}

/// The four scenarios side by side.
pub fn render_comparison_table(matrix: &ScenarioMatrix) -> RenderTable {
    let mut header = vec!["Item".to_string()];
    for kind in ScenarioKind::ALL {
        header.push(kind.to_string());
    }

    let value_row = |label: &str,
                     get: &dyn Fn(&PortfolioAnalysis) -> String|
     -> Vec<String> {
        let mut row = vec![label.to_string()];
        for kind in ScenarioKind::ALL {
            row.push(get(matrix.get(kind)));
        }
        row
    };

    let rows = vec![
        value_row("Exemption", &|a| {
            euro_precision_str(&a.tax_liability.exemption_available)
        }),
        value_row("Taxable gains", &|a| {
            euro_precision_str(&a.tax_liability.taxable_gains)
        }),
        value_row("Effective rate", &|a| {
            a.tax_liability.effective_rate.to_string()
        }),
        value_row("Gross liability", &|a| {
            euro_precision_str(&a.tax_liability.gross_tax_liability)
        }),
        value_row("Tax already paid", &|a| {
            euro_precision_str(&a.tax_liability.tax_already_paid)
        }),
        value_row("Refund", &|a| {
            euro_precision_str(&a.tax_liability.tax_refund)
        }),
        value_row("Owed", &|a| euro_precision_str(&a.tax_liability.tax_owed)),
    ];

    RenderTable {
        header,
        rows,
        notes: vec![format!(
            "Couple assessment yields {} additional refund over individual.",
            euro_precision_str(&matrix.couple_refund_advantage())
        )],
        ..RenderTable::default()
    }
}

// MARK: Tests
#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::portfolio::summary::{AnalysisRequest, GainsSource};
    use crate::portfolio::tax::{ScenarioKind, TaxScenarioParameters};
    use crate::portfolio::{Transaction, TxAction};
    use crate::util::date::pub_testlib::doy_date;

    use super::{
        render_comparison_table, render_facts_table, render_per_isin_table,
        render_scenario_table,
    };

    fn request() -> AnalysisRequest {
        let rows = vec![
            Transaction {
                date: Some(doy_date(2024, 1)),
                isin: "A".to_string(),
                action: Some(TxAction::Buy),
                shares: dec!(10),
                price: dec!(100),
                amount: dec!(-1000),
                ..Transaction::default()
            },
            Transaction {
                date: Some(doy_date(2024, 90)),
                isin: "A".to_string(),
                action: Some(TxAction::Sell),
                shares: dec!(10),
                amount: dec!(4000),
                tax: dec!(300),
                read_index: 1,
                ..Transaction::default()
            },
        ];
        AnalysisRequest::new(
            rows,
            TaxScenarioParameters::default(),
            GainsSource::FifoCostBasis,
        )
    }

    #[test]
    fn test_facts_table_shape() {
        let table = render_facts_table(request().facts());
        assert_eq!(table.header.len(), 2);
        assert!(table.rows.iter().all(|r| r.len() == 2));
        assert!(table.errors.is_empty());
    }

    #[test]
    fn test_scenario_table_values() {
        let analysis = request().analyze(ScenarioKind::Couple);
        let table = render_scenario_table(&analysis);
        let find = |key: &str| {
            table
                .rows
                .iter()
                .find(|r| r[0] == key)
                .map(|r| r[1].clone())
                .unwrap()
        };
        // 3000 gains - 2000 exemption = 1000 at 26%; 300 paid -> 40 back.
        assert_eq!(find("gross_tax_liability"), "260.00");
        assert_eq!(find("tax_refund"), "40.00");
        assert!(table.errors.is_empty());
    }

    #[test]
    fn test_comparison_table_shape() {
        let matrix = request().scenario_matrix();
        let table = render_comparison_table(&matrix);
        assert_eq!(table.header.len(), 5);
        assert!(table.rows.iter().all(|r| r.len() == 5));
        assert_eq!(table.notes.len(), 1);
    }

    #[test]
    fn test_per_isin_table() {
        let analysis = request().analyze(ScenarioKind::Couple);
        let table = render_per_isin_table(&analysis);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], "A");
        assert_eq!(table.rows[0][1], "3000.00");
    }
}
