//! CSV and JSON export of run results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::engine::RunResults;
use crate::ensemble::Value;

/// Column header of the results table. Ensemble cells are written as their
/// mean; metric cells skip sentinel samples.
const HEADER: &str = "measure,scheme,stage,year,\
                      energy_savings_total,energy_savings_annual,\
                      energy_cost_savings_total,energy_cost_savings_annual,\
                      carbon_savings_total,carbon_savings_annual,\
                      carbon_cost_savings_total,carbon_cost_savings_annual,\
                      stock_cost_savings_total,stock_cost_savings_annual,\
                      cce,cce_carbon_benefit,ccc,ccc_energy_benefit";

/// Exports the results table to a CSV file at the given path.
///
/// One row per measure, adoption scheme, stage and year.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(results: &RunResults, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(results, buf)
}

/// Writes the results table as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(results: &RunResults, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for m in &results.measures {
        for s in &m.stages {
            let sv = &s.savings;
            for (y, p) in s.portfolio.iter().enumerate() {
                let mean = |series: &[Value]| {
                    series.get(y).map_or(0.0, |v| v.mean())
                };
                wtr.write_record(&[
                    m.name.clone(),
                    s.scheme.to_string(),
                    s.stage.to_string(),
                    (results.first_year + y as i32).to_string(),
                    format!("{:.4}", mean(&sv.energy.total)),
                    format!("{:.4}", mean(&sv.energy.annual)),
                    format!("{:.4}", mean(&sv.energy_cost.total)),
                    format!("{:.4}", mean(&sv.energy_cost.annual)),
                    format!("{:.6}", mean(&sv.carbon.total)),
                    format!("{:.6}", mean(&sv.carbon.annual)),
                    format!("{:.4}", mean(&sv.carbon_cost.total)),
                    format!("{:.4}", mean(&sv.carbon_cost.annual)),
                    format!("{:.4}", mean(&sv.stock_cost.total)),
                    format!("{:.4}", mean(&sv.stock_cost.annual)),
                    format!("{:.4}", p.cce.applicable_mean()),
                    format!("{:.4}", p.cce_carbon_benefit.applicable_mean()),
                    format!("{:.4}", p.ccc.applicable_mean()),
                    format!("{:.4}", p.ccc_energy_benefit.applicable_mean()),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Exports the full result set as pretty-printed JSON.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or serialization fails.
pub fn export_json(results: &RunResults, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_json(results, io::BufWriter::new(file))
}

/// Writes the full result set as pretty-printed JSON to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if serialization or writing fails.
pub fn write_json(results: &RunResults, mut writer: impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, results)?;
    writer.flush()
}
