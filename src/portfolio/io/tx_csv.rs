use std::borrow::BorrowMut;
use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::portfolio::csv_common::{CsvCol, Platform};
use crate::portfolio::{Currency, Transaction, TxAction};
use crate::util::rw::{DescribedReader, WriteHandle};
use crate::write_errln;

type Error = String;

/// Upper bound on accepted data rows, to protect against pathological
/// uploads. The expected magnitude is thousands of rows.
pub const DEFAULT_MAX_ROWS: usize = 100_000;

pub struct TxCsvParseOptions {
    // Bypasses header-based platform detection when set.
    pub forced_platform: Option<Platform>,
    // Field delimiter override. Sniffed from the header line when None.
    pub delimiter: Option<u8>,
    pub max_rows: usize,
}

impl Default for TxCsvParseOptions {
    fn default() -> Self {
        Self {
            forced_platform: None,
            delimiter: None,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

/// Normalizer output: every data row as a typed Transaction (malformed
/// fields degraded to safe defaults), plus the original headers and the
/// detected platform.
#[derive(Debug)]
pub struct ParsedCsv {
    pub rows: Vec<Transaction>,
    pub headers: Vec<String>,
    pub platform: Platform,
}

impl ParsedCsv {
    /// Trade-classified rows for one action, in input order. Rows with an
    /// empty or unrecognized type column never show up here.
    pub fn rows_with_action(&self, action: TxAction) -> Vec<&Transaction> {
        self.rows.iter().filter(|r| r.is_action(action)).collect()
    }
}

/// Parses a locale-formatted decimal ("1.234,56"). Values without a decimal
/// comma are treated as plain decimals ("1234.56" stays 1234.56).
/// Unparseable values resolve to zero; broker exports contain footer and
/// summary rows that must not abort the import.
pub fn parse_locale_decimal(value: &str) -> Decimal {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }
    let cleaned = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };
    Decimal::from_str(&cleaned).unwrap_or(Decimal::ZERO)
}

// Sniffs the field delimiter from the header line. Broker exports use
// either semicolons or plain commas.
fn detect_delimiter(content: &str) -> u8 {
    let header_line = content.lines().next().unwrap_or("");
    let semis = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semis >= commas && semis > 0 {
        b';'
    } else {
        b','
    }
}

fn transaction_from_csv_values(
    mut values: HashMap<&'static str, String>,
    extra: HashMap<String, String>,
    read_index: u32,
) -> Transaction {
    let take = |values: &mut HashMap<&'static str, String>, col| {
        values.remove(col).unwrap_or_default()
    };
    let take_decimal = |values: &mut HashMap<&'static str, String>, col| {
        parse_locale_decimal(&take(values, col))
    };

    let type_raw = take(&mut values, CsvCol::TYPE);
    let description = {
        let desc = take(&mut values, CsvCol::DESCRIPTION);
        if desc.is_empty() {
            take(&mut values, CsvCol::REFERENCE)
        } else {
            desc
        }
    };

    let mut tx = Transaction {
        date: crate::util::date::normalize_date(&take(&mut values, CsvCol::DATE)),
        isin: take(&mut values, CsvCol::ISIN),
        description,
        action: TxAction::classify(&type_raw),
        shares: take_decimal(&mut values, CsvCol::SHARES).abs(),
        price: take_decimal(&mut values, CsvCol::PRICE),
        amount: take_decimal(&mut values, CsvCol::AMOUNT),
        fee: take_decimal(&mut values, CsvCol::FEE),
        tax: take_decimal(&mut values, CsvCol::TAX),
        currency: Currency::new(&take(&mut values, CsvCol::CURRENCY)),
        type_raw,
        extra,
        read_index,
    };

    // Recognized display-only columns (time, status, asset type, a
    // reference that didn't become the description) stay visible as
    // opaque attributes rather than being dropped.
    for (col, val) in values {
        tx.extra.insert(col.to_string(), val);
    }

    tx
}

/// Reads and normalizes one broker CSV export.
///
/// Malformed rows degrade field-by-field to safe defaults and are kept in
/// the output (footer rows etc. simply end up unclassified); only an
/// unreadable input, a missing header, or exceeding `max_rows` is an error.
pub fn parse_tx_csv(
    desc_reader: &mut DescribedReader,
    parse_options: &TxCsvParseOptions,
    err_stream: &mut WriteHandle,
) -> Result<ParsedCsv, Error> {
    let csv_desc = desc_reader.desc().to_string();

    let mut reader_box = desc_reader.reader().map_err(|e| e.to_string())?;
    let reader: &mut dyn Read = reader_box.borrow_mut();
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|e| format!("Error reading {csv_desc}: {e}"))?;

    let delimiter = parse_options
        .delimiter
        .unwrap_or_else(|| detect_delimiter(&content));

    let mut csv_r = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(content.as_bytes());

    let known_cols = CsvCol::get_csv_cols();

    // Maps record positions to either a known column or the original
    // (unknown) header name, which passes through as a display attribute.
    let mut col_index_to_name = HashMap::<usize, &'static str>::new();
    let mut col_index_to_extra_name = HashMap::<usize, String>::new();
    let mut headers = Vec::<String>::new();
    let mut lower_headers = Vec::<String>::new();

    let headers_res = csv_r
        .headers()
        .map_err(|e| format!("Error in csv headers of {csv_desc}: {e}"))?;
    for (i, col) in headers_res.iter().enumerate() {
        headers.push(col.to_string());
        let lower_col = col.to_lowercase();
        let san_col = lower_col.trim().to_string();
        match known_cols.get(san_col.as_str()) {
            Some(static_str) => {
                col_index_to_name.insert(i, *static_str);
            }
            None => {
                write_errln!(
                    err_stream,
                    "Warning: Unrecognized column in {csv_desc}: {san_col}"
                );
                col_index_to_extra_name.insert(i, col.trim().to_string());
            }
        }
        lower_headers.push(san_col);
    }

    let platform = match parse_options.forced_platform {
        Some(p) => p,
        None => Platform::detect(&lower_headers),
    };

    let mut rows = Vec::<Transaction>::new();

    for (i, record_res) in csv_r.records().enumerate() {
        // Start at 1 for the user, and include the header.
        let row_num = i + 2;

        if rows.len() >= parse_options.max_rows {
            return Err(format!(
                "{csv_desc} exceeds the row limit of {} transactions",
                parse_options.max_rows
            ));
        }

        let record = match record_res {
            Ok(r) => r,
            Err(e) => {
                write_errln!(
                    err_stream,
                    "Warning: Skipping unreadable row {row_num} in {csv_desc}: {e}"
                );
                continue;
            }
        };

        let mut tx_values = HashMap::<&'static str, String>::new();
        let mut extra = HashMap::<String, String>::new();
        for (col_i, col_val) in record.iter().enumerate() {
            if col_val.trim().is_empty() {
                continue;
            }
            if let Some(col_name) = col_index_to_name.get(&col_i) {
                tx_values.insert(*col_name, col_val.trim().to_string());
            } else if let Some(extra_name) = col_index_to_extra_name.get(&col_i)
            {
                extra.insert(extra_name.clone(), col_val.trim().to_string());
            }
        }

        rows.push(transaction_from_csv_values(
            tx_values,
            extra,
            rows.len() as u32,
        ));
    }

    tracing::debug!(
        "parse_tx_csv: {} rows from {} (platform: {})",
        rows.len(),
        csv_desc,
        platform
    );

    Ok(ParsedCsv {
        rows,
        headers,
        platform,
    })
}
