// src/utils/logging.rs - Stage logging helpers for a matching run
use log::{debug, info, warn};
use std::time::Instant;

use crate::models::{ClusterStats, ScoreSummary};

/// The stages of a matching run, each with its own log tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Blocking,
    Compare,
    Classify,
    Cluster,
}

impl Stage {
    pub fn tag(&self) -> (&'static str, &'static str) {
        match self {
            Stage::Blocking => ("BLOCKING", "🧱"),
            Stage::Compare => ("COMPARE", "🔬"),
            Stage::Classify => ("CLASSIFY", "🏷️"),
            Stage::Cluster => ("CLUSTER", "🔗"),
        }
    }
}

#[derive(Clone)]
pub struct LinkageLogger {
    stage_name: &'static str,
    stage_emoji: &'static str,
    start_time: Instant,
}

impl LinkageLogger {
    pub fn new(stage: Stage) -> Self {
        let (stage_name, stage_emoji) = stage.tag();
        Self {
            stage_name,
            stage_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        let msg = if let Some(details) = details {
            format!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.stage_name, self.stage_emoji, phase, details, elapsed.as_secs_f32()
            )
        } else {
            format!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.stage_name, self.stage_emoji, phase, elapsed.as_secs_f32()
            )
        };
        info!("{}", msg);
    }

    pub fn log_data_loaded(&self, count: usize, data_type: &str) {
        info!(
            "[{}] {} 📊 Received {} {} records",
            self.stage_name, self.stage_emoji, count, data_type
        );
    }

    pub fn log_pair_generation(&self, total_pairs: usize, key_groups: usize) {
        info!(
            "[{}] {} 📈 Candidate pairs to compare: {} (from {} distinct blocking keys)",
            self.stage_name, self.stage_emoji, total_pairs, key_groups
        );
    }

    pub fn log_comparison_start(&self, pairs: usize, fields: usize, workers: usize) {
        info!(
            "[{}] {} ⚙️  Comparing {} pairs on {} fields with {} workers",
            self.stage_name, self.stage_emoji, pairs, fields, workers
        );
    }

    pub fn log_missing_values(&self, field: &str, count: usize, total: usize) {
        if count > 0 {
            let percent = (count as f64 / total.max(1) as f64) * 100.0;
            warn!(
                "[{}] {} ⚠️  Field '{}' missing on at least one side for {} pairs ({:.1}%), scored 0",
                self.stage_name, self.stage_emoji, field, count, percent
            );
        }
    }

    pub fn log_summary(&self, summary: &ScoreSummary) {
        info!(
            "[{}] {} 🎯 {} pairs: {} certain, {} potential, {} negative ({} below the potential range)",
            self.stage_name,
            self.stage_emoji,
            summary.total_pairs,
            summary.certain,
            summary.potential,
            summary.negative,
            summary.below_potential
        );
    }

    pub fn log_cluster_stats(&self, stats: &ClusterStats) {
        info!(
            "[{}] {} 🎉 {} entity groups covering {} records (largest: {}, avg size: {:.1})",
            self.stage_name,
            self.stage_emoji,
            stats.groups,
            stats.records_clustered,
            stats.largest_group,
            stats.avg_group_size
        );
    }

    pub fn log_completion(&self, what: &str) {
        info!(
            "[{}] {} ✅ {} in {:.2?}",
            self.stage_name,
            self.stage_emoji,
            what,
            self.start_time.elapsed()
        );
    }

    pub fn log_data_quality_issue(&self, issue_type: &str, count: usize) {
        if count > 0 {
            warn!(
                "[{}] {} ⚠️  Data quality: {} instances of {}",
                self.stage_name, self.stage_emoji, count, issue_type
            );
        }
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.stage_name, self.stage_emoji, message);
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {} {}", self.stage_name, self.stage_emoji, message);
    }

    pub fn get_elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

pub fn log_run_start(run_id: &str, mode: &str, fingerprint: &str, workers: usize) {
    info!("🚀 ===== RECORD LINKAGE RUN STARTING =====");
    info!("📅 Run ID: {}", run_id);
    info!("⚙️  Configuration:");
    info!("   • Mode: {}", mode);
    info!("   • Config fingerprint: {}", fingerprint);
    info!("   • Comparison workers: {}", workers);
    info!("==========================================");
}

pub fn log_run_completion(run_id: &str, duration: std::time::Duration, summary: &ScoreSummary) {
    info!("🎉 ===== RECORD LINKAGE RUN COMPLETED =====");
    info!("📅 Run ID: {}", run_id);
    info!("⏱️  Total Duration: {:.2?}", duration);
    info!("📊 Summary:");
    info!("  • Candidate pairs compared: {}", summary.total_pairs);
    info!("  • Certain: {}", summary.certain);
    info!("  • Potential (for review): {}", summary.potential);
    info!("  • Negative: {}", summary.negative);
    info!("===========================================");
}
