use std::collections::HashMap;
use std::fmt::Display;

use rust_decimal::Decimal;
use time::Date;

pub type Isin = String;

/// Transaction classification, normalized from the broker's free-form
/// `type` column (trimmed, case-insensitive).
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum TxAction {
    Buy,
    Sell,
    Deposit,
    Withdrawal,
    Dividend,
    Fee,
}

impl TxAction {
    pub fn classify(value: &str) -> Option<TxAction> {
        match value.trim().to_lowercase().as_str() {
            "buy" => Some(TxAction::Buy),
            "sell" => Some(TxAction::Sell),
            "deposit" => Some(TxAction::Deposit),
            "withdrawal" => Some(TxAction::Withdrawal),
            "dividend" => Some(TxAction::Dividend),
            "fee" => Some(TxAction::Fee),
            _ => None,
        }
    }

    fn pretty_str(&self) -> &str {
        match self {
            TxAction::Buy => "Buy",
            TxAction::Sell => "Sell",
            TxAction::Deposit => "Deposit",
            TxAction::Withdrawal => "Withdrawal",
            TxAction::Dividend => "Dividend",
            TxAction::Fee => "Fee",
        }
    }
}

impl Display for TxAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty_str())
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Currency {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            Currency::eur()
        } else {
            Currency(trimmed.to_uppercase())
        }
    }

    pub fn eur() -> Currency {
        Currency("EUR".to_string())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::eur()
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One normalized broker-export row. Immutable once parsed.
///
/// `amount` keeps the sign as exported by the broker (buys are typically
/// negative cash flow). Consumers that want a magnitude (buy cost,
/// withdrawal size) must go through amount_magnitude(); nothing may branch
/// on the sign of a buy row.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Transaction {
    pub date: Option<Date>,
    pub isin: Isin,
    pub description: String,
    // None when the type column is empty or unrecognized. Such rows stay
    // visible in raw listings but never enter trade classification.
    pub action: Option<TxAction>,
    // Original casing of the type column, preserved for display.
    pub type_raw: String,
    pub shares: Decimal,
    pub price: Decimal,
    pub amount: Decimal,
    pub fee: Decimal,
    pub tax: Decimal,
    pub currency: Currency,
    // Unrecognized columns, passed through as opaque display attributes.
    pub extra: HashMap<String, String>,
    // The absolute order in which the row was read from file.
    // Used as a tiebreak in sorting.
    pub read_index: u32,
}

impl Transaction {
    pub fn amount_magnitude(&self) -> Decimal {
        self.amount.abs()
    }

    pub fn is_action(&self, action: TxAction) -> bool {
        self.action == Some(action)
    }

    /// ISO date string, or empty for undated rows. Undated rows sort first
    /// and are excluded from the FIFO engine by the normalizer.
    pub fn date_str(&self) -> String {
        match &self.date {
            Some(d) => d.to_string(),
            None => String::new(),
        }
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Transaction {
            date: None,
            isin: String::new(),
            description: String::new(),
            action: None,
            type_raw: String::new(),
            shares: Decimal::ZERO,
            price: Decimal::ZERO,
            amount: Decimal::ZERO,
            fee: Decimal::ZERO,
            tax: Decimal::ZERO,
            currency: Currency::eur(),
            extra: HashMap::new(),
            read_index: 0,
        }
    }
}

impl PartialOrd for Transaction {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Transaction {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Undated rows (None) order before any dated row.
        let date_cmp = self.date.cmp(&other.date);
        match date_cmp {
            std::cmp::Ordering::Less | std::cmp::Ordering::Greater => date_cmp,
            std::cmp::Ordering::Equal => self.read_index.cmp(&other.read_index),
        }
    }
}
