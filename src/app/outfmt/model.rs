use crate::portfolio::render::RenderTable;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum OutputType {
    Facts,
    Scenario,
    Comparison,
    TopGains,
    PerIsin,
}

pub type Error = String;

pub trait ReportWriter {
    fn print_render_table(
        &mut self,
        out_type: OutputType,
        name: &str,
        table_model: &RenderTable,
    ) -> Result<(), Error>;

    fn finish(self: Box<Self>) -> Result<(), Error> {
        Ok(())
    }
}
