//! qgeom - export design geometry tables to GDS-II
//!
//! Usage:
//!   qgeom <tables.json> <out.gds>                 Export with default options
//!   qgeom <tables.json> <out.gds> --config o.json Export with options from a file
//!   qgeom <tables.json> <out.gds> --fail-fast     Abort on the first unsupported record

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use qgeom_core::GeometryTables;
use qgeom_io::{ErrorPolicy, ExportError, ExportOptions, GdsExporter};

#[derive(Debug, Parser)]
#[command(name = "qgeom", version, about = "Export design geometry tables to a GDS-II file")]
struct Cli {
    /// JSON file with "poly" and "path" geometry tables.
    input: PathBuf,

    /// Destination GDS-II file; overwritten if present.
    output: PathBuf,

    /// JSON export options.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name of the top-level cell.
    #[arg(long)]
    top_cell: Option<String>,

    /// User unit in meters.
    #[arg(long)]
    unit: Option<f64>,

    /// Database unit in meters.
    #[arg(long)]
    precision: Option<f64>,

    /// Abort on the first record that cannot be encoded.
    #[arg(long)]
    fail_fast: bool,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn export_options(&self) -> Result<ExportOptions> {
        let mut options = match &self.config {
            Some(path) => ExportOptions::from_file(path)?,
            None => ExportOptions::default(),
        };
        if let Some(top_cell) = &self.top_cell {
            options.top_cell = top_cell.clone();
        }
        if let Some(unit) = self.unit {
            options.unit = unit;
        }
        if let Some(precision) = self.precision {
            options.precision = precision;
        }
        if self.fail_fast {
            options.error_policy = ErrorPolicy::FailFast;
        }
        Ok(options)
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let options = cli.export_options()?;
    let tables = GeometryTables::from_file(&cli.input)
        .with_context(|| format!("loading geometry from {}", cli.input.display()))?;

    let mut exporter = GdsExporter::new(options)?;
    let report = match exporter.export(&tables, &cli.output) {
        Ok(report) => report,
        Err(ExportError::WriteDenied { directory }) => {
            eprintln!("Cannot write to {}; nothing exported.", directory.display());
            return Ok(ExitCode::from(2));
        }
        Err(err) => {
            return Err(err).with_context(|| format!("exporting to {}", cli.output.display()))
        }
    };

    let (min_x, min_y, max_x, max_y) = report.bounds.as_tuple();
    println!("Wrote {}", report.destination.display());
    println!("  polygons: {}", report.polygons);
    println!("  paths:    {}", report.paths);
    println!("  bounds:   ({min_x}, {min_y}) - ({max_x}, {max_y})");
    if !report.skipped.is_empty() {
        println!("  skipped:  {}", report.skipped.len());
        for err in &report.skipped {
            println!("    - {}", err);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            log::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_on_defaults() {
        let cli = Cli::parse_from([
            "qgeom",
            "in.json",
            "out.gds",
            "--top-cell",
            "CHIP",
            "--unit",
            "1e-3",
            "--fail-fast",
        ]);
        let options = cli.export_options().unwrap();
        assert_eq!(options.top_cell, "CHIP");
        assert_eq!(options.unit, 1e-3);
        assert_eq!(options.error_policy, ErrorPolicy::FailFast);
        assert_eq!(options.precision, 1e-9);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
