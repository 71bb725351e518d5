use std::{fs::File, io, path::PathBuf};

use crate::util::os::mk_writable_dir;

use super::model::{OutputType, ReportWriter};

/// Writes each render table as its own CSV file in an output directory.
pub struct CsvWriter {
    out_dir: PathBuf,
}

impl CsvWriter {
    pub fn new(out_dir: &str) -> Result<CsvWriter, io::Error> {
        let dir_path = PathBuf::from(out_dir);
        mk_writable_dir(&dir_path)?;
        Ok(CsvWriter { out_dir: dir_path })
    }
}

impl ReportWriter for CsvWriter {
    fn print_render_table(
        &mut self,
        out_type: OutputType,
        name: &str,
        table_model: &crate::portfolio::render::RenderTable,
    ) -> Result<(), super::model::Error> {
        let sanitized = name.to_lowercase().replace([' ', '_'], "-");
        let file_name = match out_type {
            OutputType::Facts => "csv-facts.csv".to_string(),
            OutputType::Scenario => format!("scenario-{sanitized}.csv"),
            OutputType::Comparison => "scenario-comparison.csv".to_string(),
            OutputType::TopGains => "top-gains.csv".to_string(),
            OutputType::PerIsin => "per-isin-gains.csv".to_string(),
        };

        let file_path = self.out_dir.join(PathBuf::from(file_name));
        let fp = File::create(file_path.clone()).map_err(|e| {
            format!("Failed to create {:?}: {}", file_path.to_str(), e)
        })?;

        let mut csv_w = csv::WriterBuilder::new().has_headers(true).from_writer(fp);

        csv_w
            .write_record(&table_model.header)
            .map_err(|e| e.to_string())?;
        for row in &table_model.rows {
            csv_w.write_record(row).map_err(|e| e.to_string())?;
        }
        if !table_model.footer.is_empty() {
            csv_w
                .write_record(&table_model.footer)
                .map_err(|e| e.to_string())?;
        }

        let n_cols = table_model.header.len();
        for note in &table_model.notes {
            let mut note_record = Vec::<String>::with_capacity(n_cols);
            note_record.resize(n_cols, String::new());
            note_record[0] = note.clone();
            csv_w.write_record(note_record).map_err(|e| e.to_string())?;
        }

        csv_w.flush().map_err(|e| e.to_string())?;

        Ok(())
    }
}
