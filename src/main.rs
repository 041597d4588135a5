// trip-planner: generate one itinerary from a trip request
//
//   OPENAI_API_KEY=sk-... trip-planner --request trip.json
//   cat trip.json | trip-planner --log-format json
//
// The response JSON goes to stdout, logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trip_planner::{
    AppConfig, FlightApiClient, FlightProvider, HotelCatalog, HotelProvider, OpenAiChatService,
    PlanResponse, TripPlanner, TripRequest,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "trip-planner", version, about)]
struct Cli {
    #[arg(short = 'r', long = "request", help = "Trip request JSON file; read from stdin when omitted")]
    request: Option<PathBuf>,

    #[arg(long = "catalog", help = "Hotel catalog JSON file replacing the built-in dataset")]
    catalog: Option<PathBuf>,

    #[arg(long = "log-format", value_enum, default_value = "compact", help = "Log output format")]
    log_format: LogFormat,

    #[arg(
        short = 'l',
        long = "log-level",
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error); RUST_LOG takes precedence"
    )]
    log_level: String,
}

fn init_logging(format: LogFormat, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn read_request(path: Option<&Path>) -> Result<TripRequest> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading trip request from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading trip request from stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("parsing trip request")
}

fn load_catalog(path: Option<&Path>) -> Result<HotelCatalog> {
    match path {
        Some(path) => HotelCatalog::from_path(path)
            .with_context(|| format!("loading hotel catalog from {}", path.display())),
        None => HotelCatalog::embedded().context("loading built-in hotel catalog"),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level);

    let config = AppConfig::from_env()?;
    let request = read_request(cli.request.as_deref())?;
    let catalog = load_catalog(cli.catalog.as_deref())?;
    info!(cities = catalog.len(), model = %config.planner.model, "trip planner starting");

    let flights = FlightProvider::new(
        Arc::new(FlightApiClient::new(config.flight_api.clone())?),
        config.flight_api.currency.clone(),
    );
    let hotels = HotelProvider::new(Arc::new(catalog));
    let inference = OpenAiChatService::new(config.inference.clone())?;
    let planner = TripPlanner::new(Arc::new(inference), flights, hotels, config.planner);

    let response = PlanResponse::from_outcome(planner.generate_plan(&request).await);
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["trip-planner"]);
        assert_eq!(cli.log_format, LogFormat::Compact);
        assert_eq!(cli.log_level, "info");
        assert!(cli.request.is_none());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "trip-planner",
            "--request",
            "trip.json",
            "--catalog",
            "hotels.json",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.request, Some(PathBuf::from("trip.json")));
        assert_eq!(cli.catalog, Some(PathBuf::from("hotels.json")));
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_missing_catalog_file_is_reported() {
        let err = load_catalog(Some(Path::new("/nonexistent/hotels.json"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/hotels.json"));
    }
}
