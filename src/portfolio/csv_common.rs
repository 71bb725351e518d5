use std::collections::HashSet;
use std::fmt::Display;

/// Column names in a broker transaction export, lower-cased.
pub struct CsvCol();
impl CsvCol {
    pub const DATE: &'static str = "date";
    pub const TIME: &'static str = "time";
    pub const STATUS: &'static str = "status";
    pub const REFERENCE: &'static str = "reference";
    pub const DESCRIPTION: &'static str = "description";
    pub const ASSET_TYPE: &'static str = "assettype";
    pub const TYPE: &'static str = "type";
    pub const ISIN: &'static str = "isin";
    pub const SHARES: &'static str = "shares";
    pub const PRICE: &'static str = "price";
    pub const AMOUNT: &'static str = "amount";
    pub const FEE: &'static str = "fee";
    pub const TAX: &'static str = "tax";
    pub const CURRENCY: &'static str = "currency";

    pub fn get_csv_cols() -> HashSet<&'static str> {
        HashSet::from([
            CsvCol::DATE,
            CsvCol::TIME,
            CsvCol::STATUS,
            CsvCol::REFERENCE,
            CsvCol::DESCRIPTION,
            CsvCol::ASSET_TYPE,
            CsvCol::TYPE,
            CsvCol::ISIN,
            CsvCol::SHARES,
            CsvCol::PRICE,
            CsvCol::AMOUNT,
            CsvCol::FEE,
            CsvCol::TAX,
            CsvCol::CURRENCY,
        ])
    }
}

/// Broker layout recognized in a CSV header.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Platform {
    // The known broker export layout (Scalable Capital et al):
    // reference/isin/amount/tax columns present.
    Scalable,
    // Column-name passthrough for anything else.
    Generic,
}

impl Platform {
    /// Header-based detection. The presence of the reference, isin, amount
    /// and tax columns together signals the known layout.
    pub fn detect(lower_headers: &[String]) -> Platform {
        let has = |name: &str| lower_headers.iter().any(|h| h == name);
        if has(CsvCol::REFERENCE)
            && has(CsvCol::ISIN)
            && has(CsvCol::AMOUNT)
            && has(CsvCol::TAX)
        {
            Platform::Scalable
        } else {
            Platform::Generic
        }
    }

    pub fn parse(value: &str) -> Option<Platform> {
        match value.trim().to_lowercase().as_str() {
            "scalable" => Some(Platform::Scalable),
            "generic" => Some(Platform::Generic),
            _ => None,
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Platform::Scalable => "scalable",
            Platform::Generic => "generic",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::Platform;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detect() {
        assert_eq!(
            Platform::detect(&headers(&[
                "date", "time", "status", "reference", "description",
                "assettype", "type", "isin", "shares", "price", "amount",
                "fee", "tax", "currency",
            ])),
            Platform::Scalable
        );
        assert_eq!(
            Platform::detect(&headers(&["date", "isin", "amount", "tax"])),
            Platform::Generic
        );
        assert_eq!(Platform::detect(&headers(&[])), Platform::Generic);
    }

    #[test]
    fn test_parse() {
        assert_eq!(Platform::parse("scalable"), Some(Platform::Scalable));
        assert_eq!(Platform::parse(" Generic "), Some(Platform::Generic));
        assert_eq!(Platform::parse("auto"), None);
    }
}
