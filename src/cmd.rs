use std::path::PathBuf;

use clap::Parser;

use crate::app::input_parse;
use crate::app::Options;
use crate::portfolio::io::tx_csv::DEFAULT_MAX_ROWS;
use crate::portfolio::summary::GainsSource;
use crate::portfolio::tax::TaxScenarioParameters;
use crate::util::rw::{DescribedReader, WriteHandle};

const ABOUT: &str =
    "German capital gains tax (Abgeltungsteuer) estimation tool";

const LONG_ABOUT: &str = "\
Estimates German capital gains tax liability or refund from a broker
transaction CSV export.

Sells are matched against prior buys first-in-first-out to compute realized
gains, and the tax formula (saver's allowance, base rate, solidarity
surcharge, optional church tax) is evaluated across four scenarios:
individual and couple, each with and without church tax.

When the export carries no usable buy history, --derive-from-withholding
instead infers gross gains from the withheld-tax total and the effective
rate.

Each CSV should contain a header row; semicolon and comma delimiters are
auto-detected, and known broker layouts are recognized by their column
names.";

#[derive(Parser, Debug)]
#[command(version, about = ABOUT, long_about = LONG_ABOUT)]
pub struct Args {
    #[arg(required = true)]
    pub csv_files: Vec<String>,

    /// Print verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Broker layout of the export: auto, scalable or generic
    #[arg(long, default_value = "auto")]
    pub platform: String,

    /// CSV field delimiter. Auto-detected from the header when omitted.
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Maximum number of data rows accepted per file
    #[arg(long, default_value_t = DEFAULT_MAX_ROWS)]
    pub max_rows: usize,

    /// Rate preset: flat (26%, broker withholding style) or composed
    /// (25% + 5.5% solidarity + church as percent of base tax)
    #[arg(long, default_value = "flat")]
    pub preset: String,

    /// Override the base rate, in percent (eg. 25)
    #[arg(long)]
    pub base_rate: Option<String>,

    /// Override the solidarity surcharge, as a percent of the base tax
    /// (eg. 5.5)
    #[arg(long)]
    pub solidarity: Option<String>,

    /// Override how church tax is applied, as MODE:VALUE. (--help for more)
    ///
    /// differential:N adds N percentage points to the flat rate
    /// (26 -> 26.375). percent:N adds N% of the base tax (8 or 9 depending
    /// on federal state).
    #[arg(long)]
    pub church_mode: Option<String>,

    /// Saver's allowance already consumed elsewhere this year, in EUR
    #[arg(long, default_value = "0")]
    pub exemption_used: String,

    /// The broker's withholding already had the allowance baked in
    #[arg(long, default_value_t = false)]
    pub broker_applied_exemption: bool,

    /// Infer gross gains from withheld tax instead of FIFO matching.
    /// (--help for more)
    ///
    /// Use when the export has no usable buy history. The sum of the tax
    /// column divided by the effective rate approximates gross gains.
    #[arg(long, default_value_t = false)]
    pub derive_from_withholding: bool,

    /// Print the full scenario matrix as JSON instead of tables
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Write output as CSV files to the specified directory
    #[arg(short = 'd', long)]
    pub csv_output_dir: Option<String>,
}

pub fn app_options_from_args(args: &Args) -> Result<Options, String> {
    let mut rates = input_parse::parse_preset_arg(&args.preset)?;
    if let Some(base_rate) = &args.base_rate {
        rates.base_rate_percent =
            input_parse::parse_decimal_arg(base_rate, "base-rate")?;
    }
    if let Some(solidarity) = &args.solidarity {
        rates.solidarity_percent_of_base =
            input_parse::parse_decimal_arg(solidarity, "solidarity")?;
    }
    if let Some(church_mode) = &args.church_mode {
        rates.church_tax_mode = input_parse::parse_church_mode_arg(church_mode)?;
    }

    let base_params = TaxScenarioParameters {
        exemption_already_used: input_parse::parse_exemption_used_arg(
            &args.exemption_used,
        )?,
        broker_applied_exemption: args.broker_applied_exemption,
        rates,
        ..TaxScenarioParameters::default()
    };

    Ok(Options {
        forced_platform: input_parse::parse_platform_arg(&args.platform)?,
        delimiter: match &args.delimiter {
            Some(d) => Some(input_parse::parse_delimiter_arg(d)?),
            None => None,
        },
        max_rows: args.max_rows,
        base_params,
        gains_source: if args.derive_from_withholding {
            GainsSource::WithholdingInference
        } else {
            GainsSource::FifoCostBasis
        },
        render_json: args.json,
        csv_output_dir: args.csv_output_dir.clone(),
    })
}

pub fn command_main() {
    let args = Args::parse();

    crate::tracing::setup_tracing();
    crate::log::set_verbose(args.verbose);
    crate::verboseln!(
        "Report date: {}",
        crate::util::date::today_local()
    );

    let mut err_printer = WriteHandle::stderr_write_handle();

    let options = match app_options_from_args(&args) {
        Ok(o) => o,
        Err(e) => {
            crate::write_errln!(err_printer, "Error: {}", e);
            std::process::exit(1);
        }
    };

    let csv_readers = args
        .csv_files
        .iter()
        .map(|f| DescribedReader::from_file_path(PathBuf::from(f)))
        .collect();

    let res = crate::app::run_analyzer_app_to_console(
        csv_readers,
        &options,
        err_printer,
    );
    if res.is_err() {
        std::process::exit(1);
    }
}
