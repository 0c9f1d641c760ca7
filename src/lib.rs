// src/lib.rs
pub mod blocking;
pub mod clustering;
pub mod config;
pub mod errors;
pub mod matching;
pub mod models;
pub mod pipeline;
pub mod utils;

pub use errors::{ConfigurationError, DataIntegrityError, LinkageError, Result};
pub use pipeline::{MatchEngine, MatchRun, Resolution, RunMode, RunReport};
