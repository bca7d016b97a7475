use std::io::Read;
use std::path::PathBuf;
use std::{fs, io};

use anyhow::{anyhow, Context, Result};
use cart_pricing::{calculate, load_pricing_config, CalculationRequest, CalculationResponse, PriceBook};
use common_money::log_rounding_mode_once;
use common_observability::{PricingMetrics, OUTCOME_ERROR, OUTCOME_OK};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "pricing-quote")]
struct Cli {
    /// JSON price catalog (falls back to PRICING_CATALOG_PATH)
    #[structopt(long, parse(from_os_str))]
    catalog: Option<PathBuf>,
    /// Calculation request JSON; read from stdin when omitted
    #[structopt(long, parse(from_os_str))]
    request: Option<PathBuf>,
    /// Pretty-print the response
    #[structopt(long)]
    pretty: bool,
    /// Emit Prometheus metrics file
    #[structopt(long, parse(from_os_str))]
    metrics_out: Option<PathBuf>,
}

fn read_request(path: Option<&PathBuf>) -> Result<CalculationRequest> {
    let text = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read request {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("Failed to read request from stdin")?;
            buf
        }
    };
    serde_json::from_str(&text).context("Failed to parse calculation request JSON")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").with_writer(io::stderr).init();
    log_rounding_mode_once();

    let cli = Cli::from_args();
    let config = load_pricing_config()?;
    let catalog_path = cli
        .catalog
        .clone()
        .or(config.catalog_path)
        .ok_or_else(|| anyhow!("No price catalog given (use --catalog or PRICING_CATALOG_PATH)"))?;
    let book = PriceBook::load(&catalog_path)?;
    let request = read_request(cli.request.as_ref())?;

    let metrics = PricingMetrics::new();
    let timer = metrics.calculation_seconds.start_timer();
    let outcome = calculate(&book, &request);
    timer.observe_duration();
    metrics.record_outcome(if outcome.is_ok() { OUTCOME_OK } else { OUTCOME_ERROR });
    if let Some(path) = &cli.metrics_out {
        fs::write(path, metrics.render()).with_context(|| format!("Failed to write metrics {}", path.display()))?;
    }

    let result = outcome.map_err(|err| anyhow!("Calculation failed ({}): {err}", err.code()))?;
    tracing::info!(
        items = result.lines.len(),
        final_price = %result.final_price,
        discount_percentage = %result.discount_percentage,
        "Quote calculated"
    );
    let response = CalculationResponse::from(result);
    let json = if cli.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{json}");
    Ok(())
}
