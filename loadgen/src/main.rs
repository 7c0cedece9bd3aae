use anyhow::Context;
use clap::Parser;
use loadgen::config::{Cli, OutputFormat};
use loadgen::logging;
use loadgen::report::ReportSummary;
use loadgen::{run_targets, TargetReport};
use tracing::Instrument;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_config = cli.log_config();
    logging::init(&log_config)?;
    let targets = cli.run_configs()?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    let _guard = rt.enter();
    let reports = rt.block_on(run_targets(targets).instrument(logging::run_span(&log_config)))?;
    print_reports(&reports, cli.format)
}

fn print_reports(reports: &[TargetReport], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            for report in reports {
                println!("{}", report.report());
            }
        }
        OutputFormat::Json => {
            let summaries: Vec<ReportSummary> = reports.iter().map(TargetReport::summary).collect();
            let json = serde_json::to_string_pretty(&summaries)
                .context("Failed to encode reports as JSON")?;
            println!("{json}");
        }
    }
    Ok(())
}
