//! GridLab Runner: run orchestration on top of `gridlab-core`.
//!
//! This crate provides:
//! - TOML simulation config with validation
//! - CSV bar loading with optional precomputed indicator columns
//! - Single and batch runs over the grid engine or the order replay
//! - Augmented CSV and JSON summary export
//! - Run fingerprinting and seeded synthetic data

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod fingerprint;
pub mod runner;
pub mod synthetic;

pub use batch::{run_batch, BatchItem, BatchReport};
pub use config::{ConfigError, Mode, SimulationConfig};
pub use data_loader::{load_bars_csv, read_bars, LoadError, LoadedData};
pub use fingerprint::RunFingerprint;
pub use runner::{run_on_data, run_simulation, RunError, RunOutcome, RunSummary, SCHEMA_VERSION};
pub use synthetic::{generate_bars, SyntheticConfig};
