/// Data layer: table types, column keys and loading.
///
/// Architecture:
/// ```text
///  .csv (semicolon) / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse header keys → per-sensor columns
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ SensorTable │  sensor id → (values, status), one row per time step
///   └─────────────┘
/// ```

pub mod loader;
pub mod model;
