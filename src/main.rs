//! Command line entry point: run one raster scan with the simulated devices.
use anyhow::{Context, Result};
use clap::Parser;
use rust_scan::{
    config::{Settings, DEFAULT_CONFIG_PATH},
    data::{storage::write_report, CsvWriter},
    hardware::{SimSensor, SimStage},
    logging, ScanRunner,
};
use std::path::PathBuf;

/// Pixels per grid cell in the rendered heatmap.
#[cfg(feature = "heatmap_png")]
const HEATMAP_CELL_PX: u32 = 40;

/// Raster scan with retrying stage and sensor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Results CSV path (overrides `output.csv`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Heatmap PNG path (overrides `output.heatmap`)
    #[arg(long)]
    heatmap: Option<PathBuf>,

    /// Leave the peak summary out of the CSV
    #[arg(long)]
    no_peak: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load_from(&args.config)
        .with_context(|| format!("Failed to load configuration from {:?}", args.config))?;
    if let Some(output) = args.output {
        settings.output.csv = output;
    }
    if let Some(heatmap) = args.heatmap {
        settings.output.heatmap = Some(heatmap);
    }
    if args.no_peak {
        settings.output.include_peak = false;
    }

    if args.print_config {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    logging::init(&settings.application)?;
    tracing::info!(
        "{} starting: {} points",
        settings.application.name,
        settings.scan.num_points()
    );

    let seed = settings.devices.seed;
    let sensor_seed = if seed == 0 { 0 } else { seed.wrapping_add(1) };
    let stage = SimStage::from_config(&settings.devices.stage, seed);
    let sensor = SimSensor::from_config(&settings.devices.sensor, sensor_seed);

    let mut runner = ScanRunner::new(stage, sensor);
    let report = runner.run(&settings.scan).await?;
    tracing::info!(
        measured = report.measured_points(),
        skipped = report.skipped_points(),
        failed_attempts = report.failed_attempts,
        "Scan finished"
    );

    let mut writer = CsvWriter::new(&settings.output.csv);
    write_report(&mut writer, &report, settings.output.include_peak).await?;

    if let Some(path) = &settings.output.heatmap {
        render_heatmap(&settings, path)?;
    }

    Ok(())
}

#[cfg(feature = "heatmap_png")]
fn render_heatmap(settings: &Settings, path: &std::path::Path) -> Result<()> {
    use rust_scan::data::Heatmap;

    let heatmap = Heatmap::from_csv(
        &settings.output.csv,
        settings.scan.x_range.steps,
        settings.scan.y_range.steps,
    )?;
    heatmap.save_png(path, HEATMAP_CELL_PX)
}

#[cfg(not(feature = "heatmap_png"))]
fn render_heatmap(_settings: &Settings, path: &std::path::Path) -> Result<()> {
    tracing::warn!(
        "Heatmap requested at '{}' but the heatmap_png feature is disabled",
        path.display()
    );
    Ok(())
}
