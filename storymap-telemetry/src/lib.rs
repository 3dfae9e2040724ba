//! # Storymap Telemetry
//!
//! Structured logging for the story map pipeline built on `tracing`.
//!
//! ## Usage
//!
//! ```rust
//! use storymap_telemetry::{init_telemetry, info, instrument};
//!
//! fn main() -> Result<(), storymap_telemetry::TelemetryError> {
//!     init_telemetry("storymap")?;
//!
//!     #[instrument]
//!     async fn generate() {
//!         info!("generating");
//!     }
//!     Ok(())
//! }
//! ```

pub mod init;
pub mod spans;

// Re-export tracing macros for convenience
pub use tracing::{Span, debug, error, info, instrument, trace, warn};

pub use init::{TelemetryError, init_json_telemetry, init_telemetry};
pub use spans::*;
