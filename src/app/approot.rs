use crate::{
    portfolio::{
        csv_common::Platform,
        io::tx_csv::{parse_tx_csv, TxCsvParseOptions, DEFAULT_MAX_ROWS},
        render::{
            render_comparison_table, render_facts_table, render_per_isin_table,
            render_scenario_table, render_top_gains_table, RenderTable,
        },
        summary::{AnalysisRequest, GainsSource, ScenarioMatrix},
        tax::{ScenarioKind, TaxScenarioParameters},
        Transaction,
    },
    util::rw::{DescribedReader, WriteHandle},
    write_errln,
};

use super::outfmt::csv::CsvWriter;
use super::outfmt::model::{OutputType, ReportWriter};
use super::outfmt::text::TextWriter;

pub type Error = String;

#[derive(Debug)]
pub struct Options {
    pub forced_platform: Option<Platform>,
    pub delimiter: Option<u8>,
    pub max_rows: usize,
    pub base_params: TaxScenarioParameters,
    pub gains_source: GainsSource,
    pub render_json: bool,
    pub csv_output_dir: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            forced_platform: None,
            delimiter: None,
            max_rows: DEFAULT_MAX_ROWS,
            base_params: TaxScenarioParameters::default(),
            gains_source: GainsSource::FifoCostBasis,
            render_json: false,
            csv_output_dir: None,
        }
    }
}

pub struct AppRenderResult {
    pub facts_table: RenderTable,
    pub comparison_table: RenderTable,
    pub scenario_tables: Vec<(ScenarioKind, RenderTable)>,
    pub top_gains_table: RenderTable,
    pub per_isin_table: RenderTable,
    pub matrix: ScenarioMatrix,
}

/// Parses all provided CSVs and runs the scenario matrix over them.
/// Everything is scoped to this call; there is no state shared between
/// invocations, so concurrent runs (one per request/session) are isolated.
pub fn run_analyzer_app_to_model(
    csv_file_readers: Vec<DescribedReader>,
    options: &Options,
    mut err_printer: WriteHandle,
) -> Result<AppRenderResult, Error> {
    let parse_options = TxCsvParseOptions {
        forced_platform: options.forced_platform,
        delimiter: options.delimiter,
        max_rows: options.max_rows,
    };

    let mut all_rows = Vec::<Transaction>::new();
    for mut csv_reader in csv_file_readers {
        let mut parsed =
            parse_tx_csv(&mut csv_reader, &parse_options, &mut err_printer)?;

        if parsed.platform == Platform::Generic
            && options.forced_platform.is_none()
        {
            write_errln!(
                err_printer,
                "Note: {} does not match a known broker layout; using \
                 generic column mapping",
                csv_reader.desc()
            );
        }

        // read_index restarts per file; keep it globally unique so date
        // ties across files stay in read order.
        let offset = all_rows.len() as u32;
        for tx in &mut parsed.rows {
            tx.read_index += offset;
        }
        all_rows.append(&mut parsed.rows);
    }

    let request = AnalysisRequest::new(
        all_rows,
        options.base_params.clone(),
        options.gains_source,
    );
    let matrix = request.scenario_matrix();

    let scenario_tables = ScenarioKind::ALL
        .iter()
        .map(|kind| (*kind, render_scenario_table(matrix.get(*kind))))
        .collect();

    // Realized gains are scenario-independent; any scenario's cost basis
    // serves for the instrument-level tables.
    let reference = &matrix.individual;

    Ok(AppRenderResult {
        facts_table: render_facts_table(&matrix.csv_facts),
        comparison_table: render_comparison_table(&matrix),
        scenario_tables,
        top_gains_table: render_top_gains_table(reference),
        per_isin_table: render_per_isin_table(reference),
        matrix,
    })
}

fn write_render_result(
    render_res: &AppRenderResult,
    writer: &mut dyn ReportWriter,
) -> Result<(), Error> {
    writer
        .print_render_table(OutputType::Facts, "", &render_res.facts_table)
        .map_err(|e| format!("Rendering facts: {e}"))?;

    for (kind, table) in &render_res.scenario_tables {
        writer
            .print_render_table(OutputType::Scenario, kind.key(), table)
            .map_err(|e| format!("Rendering scenario {kind}: {e}"))?;
    }

    writer
        .print_render_table(
            OutputType::Comparison,
            "",
            &render_res.comparison_table,
        )
        .map_err(|e| format!("Rendering comparison: {e}"))?;

    if !render_res.top_gains_table.rows.is_empty() {
        writer
            .print_render_table(
                OutputType::TopGains,
                "",
                &render_res.top_gains_table,
            )
            .map_err(|e| format!("Rendering top gains: {e}"))?;
        writer
            .print_render_table(OutputType::PerIsin, "", &render_res.per_isin_table)
            .map_err(|e| format!("Rendering per-ISIN gains: {e}"))?;
    }

    Ok(())
}

/// Returned Err is for exit code determination only.
/// All errors are written to err_printer.
pub fn run_analyzer_app_to_writer(
    writer: &mut dyn ReportWriter,
    csv_file_readers: Vec<DescribedReader>,
    options: &Options,
    mut err_printer: WriteHandle,
) -> Result<AppRenderResult, ()> {
    let res =
        run_analyzer_app_to_model(csv_file_readers, options, err_printer.clone());

    let render_res: AppRenderResult = match res {
        Ok(render_res) => render_res,
        Err(e) => {
            write_errln!(err_printer, "{}", e);
            return Err(());
        }
    };

    if let Err(e) = write_render_result(&render_res, writer) {
        write_errln!(err_printer, "{}", e);
        return Err(());
    }

    Ok(render_res)
}

pub fn run_analyzer_app_to_console(
    csv_file_readers: Vec<DescribedReader>,
    options: &Options,
    mut err_printer: WriteHandle,
) -> Result<(), ()> {
    if options.render_json {
        let model = run_analyzer_app_to_model(
            csv_file_readers,
            options,
            err_printer.clone(),
        )
        .map_err(|e| {
            write_errln!(err_printer, "{}", e);
        })?;
        let json = serde_json::to_string_pretty(&model.matrix).map_err(|e| {
            write_errln!(err_printer, "Serializing results: {}", e);
        })?;
        println!("{json}");
        return Ok(());
    }

    let mut writer: Box<dyn ReportWriter> = match &options.csv_output_dir {
        Some(dir_path) => match CsvWriter::new(dir_path) {
            Ok(w) => Box::new(w),
            Err(e) => {
                write_errln!(err_printer, "{e}");
                return Err(());
            }
        },
        None => Box::new(TextWriter::new(WriteHandle::stdout_write_handle())),
    };
    let writer_ref: &mut dyn ReportWriter = writer.as_mut();

    run_analyzer_app_to_writer(writer_ref, csv_file_readers, options, err_printer)
        .map(|_| ())
}
