//! Flight tracking backend for the OpenSky Network.
//!
//! This library provides functionality to:
//! - Acquire and cache OAuth2 client-credentials tokens
//! - Fetch state vectors, falling back to unauthenticated access
//! - Filter flights by named region
//! - Aggregate flight statistics
//! - Serve all of it over a REST API
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │   Client    │───▶│  Protocol   │───▶│  Collector  │
//! │ (token+HTTP)│    │  (Parser)   │    │  (cached)   │
//! └─────────────┘    └─────────────┘    └─────────────┘
//!                                              │
//!                      ┌───────────────────────┤
//!                      ▼                       ▼
//!              ┌─────────────┐         ┌─────────────┐
//!              │   Region    │────────▶│    Stats    │
//!              │  (Filter)   │         │ (Aggregate) │
//!              └─────────────┘         └─────────────┘
//!                      │                       │
//!                      └───────────┬───────────┘
//!                                  ▼
//!                          ┌─────────────┐
//!                          │     API     │
//!                          └─────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use skytrack::{
//!     client::ClientConfig,
//!     collector::CollectorBuilder,
//!     region,
//!     stats::calculate_flight_statistics,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client_config = ClientConfig::default()
//!         .with_credentials("client_id".to_string(), "client_secret".to_string());
//!
//!     let collector = CollectorBuilder::new()
//!         .client_config(client_config)
//!         .build()?;
//!
//!     let flights = collector.flights().await?;
//!     let europe = region::filter_flights(&flights, "Europe");
//!     let stats = calculate_flight_statistics(&europe, "Europe");
//!
//!     println!("{} flights over Europe", stats.total_flights);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod client;
pub mod collector;
pub mod config;
pub mod protocol;
pub mod region;
pub mod retry;
pub mod stats;
pub mod types;

pub use cache::{Clock, ExpiringCache, ManualClock, SystemClock};
pub use client::{ClientConfig, ClientError, OpenSkyClient};
pub use collector::{Collector, CollectorBuilder, CollectorConfig};
pub use config::Config;
pub use protocol::parse_states;
pub use region::{filter_flights, is_flight_in_region};
pub use retry::{Backoff, RetryPolicy};
pub use stats::{calculate_flight_statistics, FlightStatistics};
pub use types::{Flight, PositionSource};
