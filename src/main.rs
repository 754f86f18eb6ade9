//! Flight tracking backend CLI
//!
//! Serves OpenSky flight data over a REST API, or queries it once from the
//! command line.

use clap::{Parser, Subcommand};
use skytrack::{
    api::{self, pagination, AppState},
    collector::{Collector, CollectorBuilder},
    config::Config,
    region,
    stats::calculate_flight_statistics,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal::{self, ctrl_c};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "skytrack")]
#[command(about = "Flight tracking backend for the OpenSky Network", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    config: Config,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,

    /// Print one page of flights
    Flights {
        /// Region name, or "all"
        #[arg(short, long, default_value = region::ALL)]
        region: String,

        #[arg(short, long, default_value_t = pagination::DEFAULT_PAGE)]
        page: usize,

        #[arg(long, default_value_t = pagination::DEFAULT_LIMIT)]
        limit: usize,
    },

    /// Look up a single flight by ICAO24 address
    Flight {
        /// ICAO24 address (hex, e.g. "3c6444")
        id: String,
    },

    /// Print the statistics snapshot as JSON
    Stats {
        /// Region name, or "all"
        #[arg(short, long, default_value = region::ALL)]
        region: String,
    },

    /// List the known regions
    Regions,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve => serve(cli.config).await?,

        Commands::Flights {
            region,
            page,
            limit,
        } => {
            let collector = build_collector(&cli.config)?;
            print_flights(&collector, &region, page, limit).await?;
        }

        Commands::Flight { id } => {
            let collector = build_collector(&cli.config)?;
            print_flight(&collector, &id).await?;
        }

        Commands::Stats { region } => {
            let collector = build_collector(&cli.config)?;
            let flights = collector.flights().await?;
            let filtered = region::filter_flights(&flights, &region);
            let stats = calculate_flight_statistics(&filtered, &region);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Commands::Regions => {
            for name in region::region_names() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

fn build_collector(config: &Config) -> Result<Collector, Box<dyn std::error::Error>> {
    config.validate()?;

    let collector = CollectorBuilder::new()
        .client_config(config.client_config())
        .flights_ttl(config.flights_ttl())
        .build()?;

    Ok(collector)
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting flight tracking backend");
    config.log_summary();

    let collector = build_collector(&config)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let state = AppState::new(collector, config);
    let stats = state.collector.stats();
    let app = api::create_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    tracing::info!("API endpoints:");
    tracing::info!("  GET /api/flights");
    tracing::info!("  GET /api/flights/{{id}}");
    tracing::info!("  GET /api/regions");
    tracing::info!("  GET /api/statistics");
    tracing::info!("  GET /health");
    #[cfg(feature = "diagnostics")]
    tracing::info!("  GET /api/debug/opensky");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let final_stats = stats.snapshot();
    tracing::info!("Final statistics:");
    tracing::info!("  Upstream fetches: {}", final_stats.fetches);
    tracing::info!("  Cache hits: {}", final_stats.cache_hits);
    tracing::info!("  Unauthenticated fallbacks: {}", final_stats.fallbacks);
    tracing::info!("  Flights received: {}", final_stats.flights_received);
    tracing::info!("  Errors: {}", final_stats.errors);

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        tracing::info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn print_flights(
    collector: &Collector,
    region_name: &str,
    page: usize,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let flights = collector.flights().await?;
    let filtered = region::filter_flights(&flights, region_name);
    let (slice, info) = pagination::paginate(&filtered, page.max(1), limit.max(1));

    println!(
        "{} flights in {} (page {}/{})",
        info.total_flights, region_name, info.current_page, info.total_pages
    );
    println!();

    for flight in slice {
        print!("{:<8} {:<9} {:<20}", flight.id, flight.callsign, flight.origin);

        if let Some((lat, lon)) = flight.position() {
            print!(" {:>10.4} {:>10.4}", lat, lon);
        }

        if flight.on_ground {
            print!("  on ground");
        } else if let Some(alt) = flight.altitude {
            print!("  {:.0} m", alt);
        }

        println!();
    }

    Ok(())
}

async fn print_flight(collector: &Collector, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let flights = collector.flights().await?;

    match flights.iter().find(|f| f.id == id) {
        Some(flight) => {
            println!("ICAO24: {}", flight.id);
            println!("  Callsign: {}", flight.callsign);
            println!("  Origin: {}", flight.origin);

            if let Some((lat, lon)) = flight.position() {
                println!("  Position: {:.6}, {:.6}", lat, lon);
            }

            if let Some(alt) = flight.altitude {
                println!("  Altitude (geo): {} m", alt);
            }

            if let Some(alt) = flight.baro_altitude {
                println!("  Altitude (baro): {} m", alt);
            }

            if let Some(speed) = flight.velocity {
                println!("  Velocity: {:.1} m/s", speed);
            }

            if let Some(track) = flight.true_track {
                println!("  Track: {:.1}°", track);
            }

            if let Some(ref squawk) = flight.squawk {
                println!("  Squawk: {}", squawk);
            }

            println!("  On ground: {}", flight.on_ground);
        }
        None => {
            println!("Flight not found: {}", id);
        }
    }

    Ok(())
}
