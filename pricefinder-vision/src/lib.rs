//! Image understanding for pricefinder.
//!
//! This crate exposes the [`traits::VisionClient`] interface, a Gemini
//! implementation, and the [`photo`] helpers that validate and shrink a
//! product photo before it is sent anywhere.
//!
//! # Examples
//! ```no_run
//! use pricefinder_common::Result;
//! use pricefinder_vision::{build_vision_client, config::VisionConfig};
//!
//! # fn main() -> Result<()> {
//! let cfg = VisionConfig {
//!     api_key: "gemini-key".into(),
//!     ..VisionConfig::default()
//! };
//! let client = build_vision_client(&cfg)?;
//! assert_eq!(client.model_name(), "gemini-1.5-flash-latest");
//! # Ok(())
//! # }
//! ```
pub mod config;
pub mod gemini;
pub mod photo;
pub mod traits;

use std::sync::Arc;

use config::VisionConfig;
use gemini::GeminiVisionClient;
use traits::VisionClient;

/// Build the shared vision client from resolved configuration.
pub fn build_vision_client(
    config: &VisionConfig,
) -> pricefinder_common::Result<Arc<dyn VisionClient>> {
    let client = GeminiVisionClient::new(config)?;
    tracing::info!(model = %client.model_name(), "vision.client.ready");
    Ok(Arc::new(client))
}
