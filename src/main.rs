use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fill_pnl::config::{load_config, Config};
use fill_pnl::{
    obs, summarise, ConsoleReporter, CostAttribution, JsonReporter, OutputFormat, Reporter,
    RoundTripEngine,
};

#[derive(Parser)]
#[command(name = "fill-pnl")]
#[command(
    about = "Round-trip PnL, cost, win rate and volume from a JSON-lines fill log",
    version
)]
#[command(
    after_help = "Examples:\n  fill-pnl orders.json\n  fill-pnl --cost-attribution opening-only orders.json\n  cat orders.json | fill-pnl --format json -\n"
)]
struct Cli {
    /// Fill log with one JSON object per line, or `-` for stdin.
    #[arg(default_value = "orders.json")]
    input: PathBuf,
    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Costs charged to each round trip: round-trip (open + close) or opening-only.
    #[arg(long)]
    cost_attribution: Option<CostAttribution>,
    /// Report format: text or json.
    #[arg(long)]
    format: Option<OutputFormat>,
    /// Log filter such as `warn` or `fill_pnl=debug`. FILL_PNL_LOG overrides it.
    #[arg(long)]
    log_level: Option<String>,
    /// Log format: text or json.
    #[arg(long)]
    log_format: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    let log_level = cli.log_level.as_deref().unwrap_or(config.logging.level.as_str());
    let log_format = cli.log_format.as_deref().unwrap_or(config.logging.format.as_str());
    obs::init_tracing(log_level, log_format)?;

    let attribution = cli
        .cost_attribution
        .unwrap_or(config.pnl.cost_attribution);
    let format = cli.format.unwrap_or(config.output.format);
    tracing::debug!(
        input = %cli.input.display(),
        cost_attribution = %attribution,
        ?format,
        "starting run"
    );

    let reader: Box<dyn BufRead> = if cli.input.as_os_str() == "-" {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(&cli.input)
            .with_context(|| format!("failed to open fill log {}", cli.input.display()))?;
        Box::new(BufReader::new(file))
    };

    let stdout = io::stdout().lock();
    let mut reporter: Box<dyn Reporter> = match format {
        OutputFormat::Text => Box::new(ConsoleReporter::new(stdout)),
        OutputFormat::Json => Box::new(JsonReporter::new(stdout)),
    };

    summarise(reader, RoundTripEngine::new(attribution), reporter.as_mut())
        .with_context(|| format!("failed to summarise {}", cli.input.display()))?;
    Ok(())
}
