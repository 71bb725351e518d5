use std::io::Write;

use tabled::settings::{object::Rows, Alignment, Style};

use crate::{portfolio::render::RenderTable, util::rw::WriteHandle};

use super::model::{OutputType, ReportWriter};

pub struct TextWriter {
    w: WriteHandle,
}

impl TextWriter {
    pub fn new(w: WriteHandle) -> TextWriter {
        TextWriter { w }
    }
}

impl ReportWriter for TextWriter {
    fn print_render_table(
        &mut self,
        out_type: OutputType,
        name: &str,
        table_model: &RenderTable,
    ) -> Result<(), super::model::Error> {
        let map_write_err = |e| format!("{e}");

        for err in &table_model.errors {
            writeln!(self.w, "[!] {}", err).map_err(map_write_err)?;
        }

        let title = match out_type {
            OutputType::Facts => "CSV Facts".to_string(),
            OutputType::Scenario => format!("Scenario: {}", name),
            OutputType::Comparison => "Scenario Comparison".to_string(),
            OutputType::TopGains => "Top Gains".to_string(),
            OutputType::PerIsin => "Per-Instrument Gains".to_string(),
        };
        writeln!(self.w, "{}", title).map_err(map_write_err)?;

        let mut table_bldr = tabled::builder::Builder::default();
        table_bldr.push_record(
            table_model
                .header
                .iter()
                .map(|h| h.to_uppercase())
                .collect::<Vec<String>>(),
        );
        for row in &table_model.rows {
            table_bldr.push_record(row);
        }
        if !table_model.footer.is_empty() {
            table_bldr.push_record(table_model.footer.clone());
        }

        let mut table = table_bldr.build();
        table.with(Style::ascii());
        table.modify(Rows::first(), Alignment::center());

        writeln!(self.w, "{table}").map_err(map_write_err)?;

        for note in &table_model.notes {
            writeln!(self.w, "{note}").map_err(map_write_err)?;
        }

        writeln!(self.w).map_err(map_write_err)?;
        Ok(())
    }
}

// MARK: Tests
#[cfg(test)]
mod tests {
    use crate::app::outfmt::model::{OutputType, ReportWriter};
    use crate::portfolio::render::RenderTable;
    use crate::util::rw::WriteHandle;

    use super::TextWriter;

    #[test]
    fn test_print_render_table() {
        let (wh, buff) = WriteHandle::string_buff_write_handle();
        let mut writer = TextWriter::new(wh);

        let table = RenderTable {
            header: vec!["Item".to_string(), "EUR".to_string()],
            rows: vec![vec!["tax_refund".to_string(), "40.00".to_string()]],
            footer: vec![],
            notes: vec!["a note".to_string()],
            errors: vec![],
        };
        writer
            .print_render_table(OutputType::Scenario, "Couple", &table)
            .unwrap();

        let out = buff.borrow().as_str().to_string();
        assert!(out.contains("Scenario: Couple"));
        assert!(out.contains("ITEM"));
        assert!(out.contains("tax_refund"));
        assert!(out.contains("40.00"));
        assert!(out.contains("a note"));
    }
}
