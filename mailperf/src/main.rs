use clap::Parser;
use mailperf::{Config, telemetry};

fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = mailperf::config::Args::parse();

    // Load configuration
    let config = Config::load(&args)?;

    // If --validate flag is set, exit successfully after config validation
    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry()?;

    tracing::debug!("{:?}", args);

    let summary = mailperf::run(&config)?;
    tracing::info!(
        records = summary.records,
        failed = summary.failed_runs,
        "Analysis complete, report saved to {}",
        summary.report_path.display()
    );

    Ok(())
}
