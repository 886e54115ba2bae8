pub mod calculators;
pub mod config;
pub mod envelope;
pub mod error;
pub mod marketplace;
pub mod telemetry;
