//! Temperature sensor-grid analysis.
//!
//! ```text
//!  dataset ──► data::loader ──► SensorTable
//!                                   │
//!            analysis::average ◄────┤ (once per window)
//!                   │               │
//!                   ▼               ▼
//!  analysis::{series, deviation, derivative, screening}
//!                   │
//!                   ▼
//!       pipeline ──► plot ──► PNG files
//! ```

pub mod analysis;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod plot;
