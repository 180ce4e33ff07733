//! Core library for the `cityweather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The WeatherAPI.com client and the icon fetcher
//! - Shared domain models and the loading/error/content state of a query
//! - `WeatherSession`, which runs one lookup at a time and cancels superseded ones
//!
//! It is used by `cityweather-cli`, but can also back other front ends.

pub mod config;
pub mod error;
pub mod icon;
pub mod model;
pub mod provider;
pub mod session;
pub mod state;

pub use config::Config;
pub use error::{ImageError, WeatherError};
pub use icon::{HttpImageFetcher, ImageBuffer, ImageFetcher, fetcher_from_config};
pub use model::{CurrentWeather, Location, WeatherQuery, WeatherResult};
pub use provider::{WeatherClient, client_from_config, weatherapi::WeatherApiClient};
pub use session::{Snapshot, WeatherSession};
pub use state::FetchState;
