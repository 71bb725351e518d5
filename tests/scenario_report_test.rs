mod common;

use abgeltung::{
    app::{
        outfmt::{csv::CsvWriter, text::TextWriter},
        run_analyzer_app_to_writer, Options,
    },
    portfolio::summary::GainsSource,
    testlib::assert_re,
    util::rw::{DescribedReader, WriteHandle},
};
use common::NonAutoCreatingTestDir;
use rust_decimal_macros::dec;

const HEADER: &str = "date;time;status;reference;description;assetType;type;isin;shares;price;amount;fee;tax;currency";

fn sample_csv() -> String {
    format!(
        "{HEADER}\n\
         02.01.2024;09:00:11;Executed;REF-01;Cash in;;Deposit;;0;0,00;5.000,00;0,00;0,00;EUR\n\
         03.01.2024;10:12:01;Executed;REF-02;Vanguard FTSE All-World;ETF;Buy;IE00BK5BQT80;10;100,00;-1.000,00;0,99;0,00;EUR\n\
         04.01.2024;10:15:44;Executed;REF-03;iShares Core DAX;ETF;Buy;DE0005933931;20;50,00;-1.000,00;0,99;0,00;EUR\n\
         01.06.2024;11:30:00;Executed;REF-04;Vanguard FTSE All-World;ETF;Sell;IE00BK5BQT80;10;350,00;3.500,00;0,99;300,00;EUR\n\
         01.07.2024;11:30:00;Executed;REF-05;iShares Core DAX;ETF;Sell;DE0005933931;20;75,00;1.500,00;0,99;0,00;EUR\n\
         ;;;;Summary row from the broker;;;;;;;;;\n"
    )
}

fn sample_reader() -> DescribedReader {
    DescribedReader::from_string("sample.csv".to_string(), sample_csv())
}

#[test]
fn test_text_report_end_to_end() {
    let (err_stream, err_buff) = WriteHandle::string_buff_write_handle();
    let (write_handle, buff) = WriteHandle::string_buff_write_handle();
    let mut writer = TextWriter::new(write_handle);

    let res = run_analyzer_app_to_writer(
        &mut writer,
        vec![sample_reader()],
        &Options::default(),
        err_stream,
    );
    res.unwrap();
    assert_eq!(err_buff.borrow().as_str(), "");

    let text = buff.borrow().as_str().to_string();

    // Facts
    assert_re(r"CSV Facts", &text);
    assert_re(r"Transactions\s*\|\s*6", &text);
    assert_re(r"Tax withheld\s*\|\s*300\.00", &text);

    // Realized gains: (3500 - 1000) + (1500 - 1000) = 3000.
    // Couple scenario: 1000 taxable at 26% = 260 vs 300 withheld.
    assert_re(r"Scenario: couple", &text);
    assert_re(r"tax_refund\s*\|\s*40\.00", &text);
    // Individual scenario: 2000 taxable at 26% = 520 vs 300 withheld.
    assert_re(r"Scenario: individual", &text);
    assert_re(r"tax_owed\s*\|\s*220\.00", &text);

    // Church scenarios are rendered too
    assert_re(r"Scenario: couple_with_church_tax", &text);
    assert_re(r"Scenario Comparison", &text);

    // Top gains, largest first
    assert_re(r"IE00BK5BQT80\s*\|\s*2500\.00", &text);
    assert_re(r"DE0005933931\s*\|\s*500\.00", &text);
}

#[test]
fn test_model_values_end_to_end() {
    let (err_stream, err_buff) = WriteHandle::string_buff_write_handle();
    let (write_handle, _buff) = WriteHandle::string_buff_write_handle();
    let mut writer = TextWriter::new(write_handle);

    let render_res = run_analyzer_app_to_writer(
        &mut writer,
        vec![sample_reader()],
        &Options::default(),
        err_stream,
    )
    .unwrap();
    assert_eq!(err_buff.borrow().as_str(), "");

    let matrix = &render_res.matrix;
    assert_eq!(matrix.csv_facts.transactions, 6);
    assert_eq!(matrix.csv_facts.buy_count, 2);
    assert_eq!(matrix.csv_facts.sell_count, 2);
    assert_eq!(matrix.csv_facts.total_deposits, dec!(5000.00));
    assert_eq!(matrix.csv_facts.earliest_date, "2024-01-02");
    assert_eq!(matrix.csv_facts.latest_date, "2024-07-01");

    assert_eq!(
        matrix.couple.summary.total_realized_gains,
        dec!(3000.00)
    );
    assert_eq!(matrix.couple.tax_liability.tax_refund, dec!(40.00));
    assert_eq!(matrix.couple.tax_liability.tax_owed, dec!(0.00));
    assert_eq!(matrix.individual.tax_liability.tax_owed, dec!(220.00));
    // 26.375% of 1000 = 263.75 vs 300 withheld
    assert_eq!(
        matrix.couple_with_church_tax.tax_liability.tax_refund,
        dec!(36.25)
    );
    assert_eq!(matrix.couple_refund_advantage(), dec!(40.00));

    // The summary footer row parsed to defaults and stayed unclassified.
    assert!(!matrix
        .individual
        .cost_basis
        .has_unmatched_sells());
}

#[test]
fn test_json_serialization_end_to_end() {
    let (err_stream, _err_buff) = WriteHandle::string_buff_write_handle();
    let (write_handle, _buff) = WriteHandle::string_buff_write_handle();
    let mut writer = TextWriter::new(write_handle);

    let render_res = run_analyzer_app_to_writer(
        &mut writer,
        vec![sample_reader()],
        &Options::default(),
        err_stream,
    )
    .unwrap();

    let json = serde_json::to_value(&render_res.matrix).unwrap();
    assert_eq!(
        json["couple"]["tax_liability"]["tax_refund"]
            .as_str()
            .unwrap(),
        "40.00"
    );
    assert_eq!(
        json["individual"]["tax_liability"]["exemption_available"]
            .as_str()
            .unwrap(),
        "1000"
    );
    assert!(json["csv_facts"]["transactions"].is_number());
    assert_eq!(
        json["couple"]["top_5_gains"][0]["isin"].as_str().unwrap(),
        "IE00BK5BQT80"
    );
}

#[test]
fn test_withholding_inference_end_to_end() {
    let (err_stream, err_buff) = WriteHandle::string_buff_write_handle();
    let (write_handle, buff) = WriteHandle::string_buff_write_handle();
    let mut writer = TextWriter::new(write_handle);

    let options = Options {
        gains_source: GainsSource::WithholdingInference,
        ..Options::default()
    };
    let render_res = run_analyzer_app_to_writer(
        &mut writer,
        vec![sample_reader()],
        &options,
        err_stream,
    )
    .unwrap();
    assert_eq!(err_buff.borrow().as_str(), "");

    let couple = &render_res.matrix.couple;
    let derived = couple.derivation.as_ref().unwrap();
    // 300 withheld at 26% implies ~1153.85 gross, inside the couple
    // exemption: everything comes back.
    assert_eq!(derived.gains_estimated, dec!(1153.85));
    assert_eq!(derived.settlement, dec!(-300.00));
    assert_eq!(couple.tax_liability.tax_refund, dec!(300.00));

    // The derivation explanation makes it into the rendered output.
    let text = buff.borrow().as_str().to_string();
    assert_re(r"Reversing the 26% effective rate", &text);
}

#[test]
fn test_csv_output_end_to_end() {
    let dir = NonAutoCreatingTestDir::new();
    let out_dir = dir.path.to_str().unwrap().to_string();

    let (err_stream, err_buff) = WriteHandle::string_buff_write_handle();
    let mut writer = CsvWriter::new(&out_dir).unwrap();

    run_analyzer_app_to_writer(
        &mut writer,
        vec![sample_reader()],
        &Options::default(),
        err_stream,
    )
    .unwrap();
    assert_eq!(err_buff.borrow().as_str(), "");

    for fname in [
        "csv-facts.csv",
        "scenario-individual.csv",
        "scenario-couple.csv",
        "scenario-individual-with-church-tax.csv",
        "scenario-couple-with-church-tax.csv",
        "scenario-comparison.csv",
        "top-gains.csv",
        "per-isin-gains.csv",
    ] {
        assert!(dir.path.join(fname).exists(), "missing {fname}");
    }

    let couple_csv =
        std::fs::read_to_string(dir.path.join("scenario-couple.csv")).unwrap();
    assert_re(r"tax_refund,40\.00", &couple_csv);
}

#[test]
fn test_unmatched_sell_warning_end_to_end() {
    // Sell without any buy history: flagged, not fatal.
    let csv = format!(
        "{HEADER}\n\
         01.06.2024;;Executed;R1;Mystery;ETF;Sell;XX0000;5;100,00;500,00;0,00;0,00;EUR\n"
    );
    let reader = DescribedReader::from_string("orphan.csv".to_string(), csv);

    let (err_stream, _) = WriteHandle::string_buff_write_handle();
    let (write_handle, buff) = WriteHandle::string_buff_write_handle();
    let mut writer = TextWriter::new(write_handle);

    let render_res = run_analyzer_app_to_writer(
        &mut writer,
        vec![reader],
        &Options::default(),
        err_stream,
    )
    .unwrap();

    assert_eq!(
        render_res.matrix.individual.cost_basis.unmatched_sell_shares,
        dec!(5)
    );
    let text = buff.borrow().as_str().to_string();
    assert_re(r"no matching buy history", &text);
}
