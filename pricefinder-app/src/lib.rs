//! HTTP boundary and configuration wiring for the `pricefinder` binary.

pub mod server;
pub mod wiring;

pub use server::{AppState, PriceFinderServer, build_router};
pub use wiring::build_from_config;
