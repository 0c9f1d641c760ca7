// src/config/settings.rs
//! Process-level knobs read from the environment. These never change what a
//! run produces, only how much hardware it uses and how much it reports.

use log::{debug, info, warn};
use std::env;

pub const DEFAULT_SCORE_BINS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    /// Worker threads for field comparison
    pub workers: usize,
    /// Shards for clustering; 1 means the plain sequential forest
    pub cluster_shards: usize,
    /// Bins in the score histogram of the run summary
    pub score_bins: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            cluster_shards: 1,
            score_bins: DEFAULT_SCORE_BINS,
        }
    }
}

impl RunSettings {
    /// Create settings from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let settings = Self {
            workers: positive(&lookup, "LINKAGE_WORKERS", defaults.workers),
            cluster_shards: positive(&lookup, "LINKAGE_CLUSTER_SHARDS", defaults.cluster_shards),
            score_bins: positive(&lookup, "LINKAGE_SCORE_BINS", defaults.score_bins),
        };
        debug!("Run settings: {:?}", settings);
        settings
    }

    pub fn log_config(&self) {
        info!("⚙️  Run settings:");
        info!("   Comparison workers: {}", self.workers);
        if self.cluster_shards > 1 {
            info!("   Clustering shards: {} (parallel local unions + merge)", self.cluster_shards);
        } else {
            info!("   Clustering shards: 1 (sequential)");
        }
        info!("   Score histogram bins: {}", self.score_bins);
    }
}

fn positive<F>(lookup: &F, key: &str, default: usize) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(value) if value > 0 => value,
            _ => {
                warn!("Ignoring {}={:?}, expected a positive integer; using {}", key, raw, default);
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = RunSettings::from_lookup(lookup(&[]));
        assert_eq!(settings, RunSettings::default());
        assert!(settings.workers >= 1);
        assert_eq!(settings.cluster_shards, 1);
    }

    #[test]
    fn test_values_read_and_bad_values_ignored() {
        let settings = RunSettings::from_lookup(lookup(&[
            ("LINKAGE_WORKERS", "3"),
            ("LINKAGE_CLUSTER_SHARDS", "0"),
            ("LINKAGE_SCORE_BINS", "ten"),
        ]));
        assert_eq!(settings.workers, 3);
        assert_eq!(settings.cluster_shards, 1);
        assert_eq!(settings.score_bins, DEFAULT_SCORE_BINS);
    }
}
