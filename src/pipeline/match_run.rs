// src/pipeline/match_run.rs

use chrono::{DateTime, Utc};
use indicatif::MultiProgress;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use uuid::Uuid;

use crate::blocking::{BlockingOutput, SortedNeighbourhood};
use crate::clustering::{cluster_sharded, group_by_left, EntityGroups, LinkedGroups};
use crate::config::{ClassificationRanges, MatchingConfig, RunSettings};
use crate::errors::{DataIntegrityError, Result};
use crate::matching::{classify_table, summarize_table, ComparisonTable, FieldComparator};
use crate::models::{CandidatePair, ClassifiedPairs, RecordId, RecordSet, ScoreSummary};
use crate::utils::logging::{log_run_completion, log_run_start, LinkageLogger, Stage};
use crate::utils::progress_config::ProgressConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Deduplication,
    Linkage,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Deduplication => "deduplication",
            RunMode::Linkage => "linkage",
        }
    }
}

/// Owns the config and settings for any number of runs. Nothing is shared
/// between runs except these read-only values.
pub struct MatchEngine {
    config: MatchingConfig,
    settings: RunSettings,
    progress: ProgressConfig,
    multi_progress: Option<MultiProgress>,
}

impl MatchEngine {
    /// Engine without progress bars.
    pub fn new(config: MatchingConfig, settings: RunSettings) -> Self {
        Self {
            config,
            settings,
            progress: ProgressConfig::silent(),
            multi_progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressConfig) -> Self {
        self.multi_progress = progress.create_multi_progress();
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Blocks, compares, aggregates and classifies pairs within one record set.
    pub fn deduplicate(&self, records: &RecordSet) -> Result<MatchRun> {
        let (run_id, started_at, clock) = self.start(RunMode::Deduplication);

        let blocking_logger = LinkageLogger::new(Stage::Blocking);
        blocking_logger.log_data_loaded(records.len(), "records");
        let blocking = SortedNeighbourhood::from_config(&self.config).index(records)?;
        self.log_blocking(&blocking_logger, &blocking, records.len());

        let run = self.score(RunMode::Deduplication, run_id, started_at, blocking, records, records)?;
        log_run_completion(&run_id.to_string(), clock.elapsed(), &run.summary);
        Ok(run)
    }

    /// Same as [`deduplicate`](Self::deduplicate) across two record sets.
    /// Pairs always hold the left set's id first.
    pub fn link(&self, left: &RecordSet, right: &RecordSet) -> Result<MatchRun> {
        let (run_id, started_at, clock) = self.start(RunMode::Linkage);

        let blocking_logger = LinkageLogger::new(Stage::Blocking);
        blocking_logger.log_data_loaded(left.len(), "left records");
        blocking_logger.log_data_loaded(right.len(), "right records");
        let blocking = SortedNeighbourhood::from_config(&self.config).index_link(left, right)?;
        self.log_blocking(&blocking_logger, &blocking, left.len() + right.len());

        let run = self.score(RunMode::Linkage, run_id, started_at, blocking, left, right)?;
        log_run_completion(&run_id.to_string(), clock.elapsed(), &run.summary);
        Ok(run)
    }

    fn start(&self, mode: RunMode) -> (Uuid, DateTime<Utc>, Instant) {
        let run_id = Uuid::new_v4();
        log_run_start(
            &run_id.to_string(),
            mode.as_str(),
            &self.config.fingerprint(),
            self.settings.workers,
        );
        (run_id, Utc::now(), Instant::now())
    }

    fn log_blocking(&self, logger: &LinkageLogger, blocking: &BlockingOutput, total: usize) {
        logger.log_pair_generation(blocking.pairs.len(), blocking.key_groups);
        if blocking.skipped_missing_key > 0 {
            logger.log_data_quality_issue(
                &format!("records without '{}'", self.config.blocking_field()),
                blocking.skipped_missing_key,
            );
            logger.log_missing_values(self.config.blocking_field(), blocking.skipped_missing_key, total);
        }
        logger.log_completion("candidate pair generation");
    }

    fn score(
        &self,
        mode: RunMode,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        blocking: BlockingOutput,
        left: &RecordSet,
        right: &RecordSet,
    ) -> Result<MatchRun> {
        let compare_logger = LinkageLogger::new(Stage::Compare);
        compare_logger.log_comparison_start(
            blocking.pairs.len(),
            self.config.rules().len(),
            self.settings.workers,
        );
        let pb = self.progress.stage_bar(
            self.multi_progress.as_ref(),
            blocking.pairs.len() as u64,
            "Comparing candidate pairs",
        );
        let vectors = FieldComparator::new(&self.config).compare_all(
            &blocking.pairs,
            left,
            right,
            self.settings.workers,
            pb.as_ref(),
        )?;
        if let Some(pb) = &pb {
            pb.finish_with_message(format!("Compared {} pairs", vectors.len()));
        }
        let table = ComparisonTable::from_vectors(&self.config, vectors);
        for (field, missing) in table.missing_counts() {
            if missing > 0 {
                compare_logger.log_missing_values(&field, missing, table.len());
            }
        }
        compare_logger.log_completion("field comparison");

        let mut run = MatchRun {
            run_id,
            started_at,
            mode,
            config: self.config.clone(),
            score_bins: self.settings.score_bins,
            known_ids: KnownIds::new(mode, left, right),
            skipped_missing_key: blocking.skipped_missing_key,
            table,
            classified: ClassifiedPairs::default(),
            summary: ScoreSummary::default(),
        };
        run.classify()?;
        Ok(run)
    }
}

/// Everything one matching run produced. Raw similarities are kept in the
/// table, so ranges and rule thresholds can change without comparing again.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub mode: RunMode,
    pub config: MatchingConfig,
    #[serde(skip)]
    pub score_bins: usize,
    #[serde(skip)]
    known_ids: KnownIds,
    pub skipped_missing_key: usize,
    pub table: ComparisonTable,
    pub classified: ClassifiedPairs,
    pub summary: ScoreSummary,
}

/// Ids of the record sets a run was built from. A deduplication run has
/// only the left set.
#[derive(Debug, Clone, Default)]
struct KnownIds {
    left: HashSet<RecordId>,
    right: Option<HashSet<RecordId>>,
}

impl KnownIds {
    fn new(mode: RunMode, left: &RecordSet, right: &RecordSet) -> Self {
        let ids = |set: &RecordSet| set.iter().map(|r| r.id.clone()).collect::<HashSet<_>>();
        match mode {
            RunMode::Deduplication => Self {
                left: ids(left),
                right: None,
            },
            RunMode::Linkage => Self {
                left: ids(left),
                right: Some(ids(right)),
            },
        }
    }

    fn check(&self, pair: &CandidatePair) -> Result<()> {
        let right = self.right.as_ref().unwrap_or(&self.left);
        let missing = if !self.left.contains(&pair.left) {
            &pair.left
        } else if !right.contains(&pair.right) {
            &pair.right
        } else {
            return Ok(());
        };
        Err(DataIntegrityError::UnknownRecordId {
            left: pair.left.to_string(),
            right: pair.right.to_string(),
            missing: missing.to_string(),
        }
        .into())
    }
}

impl MatchRun {
    pub fn candidates(&self) -> &[CandidatePair] {
        &self.table.pairs
    }

    fn classify(&mut self) -> Result<()> {
        let logger = LinkageLogger::new(Stage::Classify);
        logger.log_phase("Classifying pairs", Some(self.config.score_column()));
        self.classified = classify_table(&self.table, self.config.score_column(), self.config.ranges())?;
        self.summary = summarize_table(&self.table, &self.config, self.score_bins);
        logger.log_summary(&self.summary);
        Ok(())
    }

    /// Relabels every pair under new ranges.
    pub fn reclassify(&mut self, ranges: ClassificationRanges) -> Result<()> {
        self.config = self.config.with_ranges(ranges)?;
        self.classify()
    }

    /// Rebuilds field scores, sums and labels from the stored raw
    /// similarities. `config` must compare the same fields.
    pub fn rescore(&mut self, config: MatchingConfig) -> Result<()> {
        self.table.rescore(&config)?;
        self.config = config;
        self.classify()
    }

    /// Certain pairs plus the `confirmed` pairs that are potential matches.
    ///
    /// A confirmed pair naming an id outside the run's record sets is a
    /// data-integrity error. Known pairs that are not potentials in this run
    /// are skipped with a warning. The result is sorted and free of repeats.
    pub fn matched_pairs(&self, confirmed: &[CandidatePair]) -> Result<Vec<CandidatePair>> {
        let logger = LinkageLogger::new(Stage::Classify);
        let potentials: HashSet<&CandidatePair> =
            self.classified.potential.iter().map(|c| &c.pair).collect();
        let certain: HashSet<&CandidatePair> = self.classified.certain.iter().map(|c| &c.pair).collect();

        let mut matched: Vec<CandidatePair> =
            self.classified.certain.iter().map(|c| c.pair.clone()).collect();
        let mut ignored = 0usize;
        for pair in confirmed {
            let pair = match self.mode {
                RunMode::Deduplication => CandidatePair::unordered(pair.left.clone(), pair.right.clone()),
                RunMode::Linkage => pair.clone(),
            };
            self.known_ids.check(&pair)?;
            if potentials.contains(&pair) {
                matched.push(pair);
            } else if !certain.contains(&pair) {
                logger.log_warning(&format!(
                    "Confirmed pair {} is not a potential match in run {}, ignoring",
                    pair, self.run_id
                ));
                ignored += 1;
            }
        }
        matched.sort();
        matched.dedup();
        if ignored > 0 {
            logger.log_data_quality_issue("confirmed pairs ignored", ignored);
        }
        info!(
            "Matched pairs: {} ({} certain, {} confirmed supplied)",
            matched.len(),
            self.classified.certain.len(),
            confirmed.len()
        );
        Ok(matched)
    }

    /// Final grouping of the matched pairs: transitive clusters for a
    /// deduplication run, left-to-right links for a linkage run.
    pub fn resolve(&self, confirmed: &[CandidatePair], shards: usize) -> Result<Resolution> {
        self.group(&self.matched_pairs(confirmed)?, shards)
    }

    /// Groups already assembled matched pairs, see [`matched_pairs`](Self::matched_pairs).
    pub fn group(&self, matched: &[CandidatePair], shards: usize) -> Result<Resolution> {
        let logger = LinkageLogger::new(Stage::Cluster);
        logger.log_phase("Grouping matched pairs", Some(self.mode.as_str()));
        let resolution = match self.mode {
            RunMode::Deduplication => {
                let groups = cluster_sharded(matched, shards)?;
                logger.log_cluster_stats(&groups.stats());
                Resolution::Entities(groups)
            }
            RunMode::Linkage => {
                let links = group_by_left(matched);
                logger.log_debug(&format!("{} left records linked to {} right records", links.len(), links.links()));
                Resolution::Links(links)
            }
        };
        logger.log_completion("grouping");
        Ok(resolution)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resolution {
    Entities(EntityGroups),
    Links(LinkedGroups),
}

impl Resolution {
    pub fn len(&self) -> usize {
        match self {
            Resolution::Entities(groups) => groups.len(),
            Resolution::Links(links) => links.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entities(&self) -> Option<&EntityGroups> {
        match self {
            Resolution::Entities(groups) => Some(groups),
            Resolution::Links(_) => None,
        }
    }

    pub fn links(&self) -> Option<&LinkedGroups> {
        match self {
            Resolution::Links(links) => Some(links),
            Resolution::Entities(_) => None,
        }
    }
}

/// Serialized output of a run, as written by the `linkage` binary.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub run: &'a MatchRun,
    pub config_fingerprint: String,
    pub matched_pairs: usize,
    pub groups: &'a Resolution,
}

impl<'a> RunReport<'a> {
    pub fn new(run: &'a MatchRun, matched_pairs: usize, groups: &'a Resolution) -> Self {
        Self {
            run,
            config_fingerprint: run.config.fingerprint(),
            matched_pairs,
            groups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldRule, ScoreRange, StringMethod};
    use crate::errors::LinkageError;
    use crate::models::{FieldValue, MatchLabel, Record};

    fn ranges(certain: (f64, f64), potential: (f64, f64)) -> ClassificationRanges {
        ClassificationRanges::new(
            ScoreRange::new(certain.0, certain.1),
            ScoreRange::new(potential.0, potential.1),
        )
        .unwrap()
    }

    fn engine() -> MatchEngine {
        let config = MatchingConfig::new(
            "surname",
            3,
            vec![FieldRule::string("surname", 0.8, StringMethod::JaroWinkler)],
            vec![],
            None,
            ranges((0.95, 1.01), (0.8, 0.95)),
            None,
        )
        .unwrap();
        let settings = RunSettings {
            workers: 2,
            cluster_shards: 1,
            score_bins: 10,
        };
        MatchEngine::new(config, settings)
    }

    fn people(names: &[(&str, &str)]) -> RecordSet {
        RecordSet::new(
            names
                .iter()
                .map(|(id, name)| Record::new(*id).with_field("surname", FieldValue::Text(name.to_string())))
                .collect(),
        )
        .unwrap()
    }

    fn pair(a: &str, b: &str) -> CandidatePair {
        CandidatePair::unordered(a.into(), b.into())
    }

    #[test]
    fn test_deduplicate_labels_and_summary() {
        // SILVA/SALVA scores about 0.88 under Jaro-Winkler
        let records = people(&[("1", "SILVA"), ("2", "SILVA"), ("3", "SALVA")]);
        let run = engine().deduplicate(&records).unwrap();
        assert_eq!(run.mode, RunMode::Deduplication);
        assert_eq!(run.candidates().len(), 3);
        assert_eq!(run.summary.total_pairs, 3);
        assert_eq!(run.summary.certain, 1);
        assert_eq!(run.summary.potential, 2);
        assert_eq!(run.summary.negative, 0);
        assert_eq!(run.classified.certain[0].pair, pair("1", "2"));
        assert_eq!(run.summary.histogram.total(), 3);
    }

    #[test]
    fn test_matched_pairs_accepts_only_confirmed_potentials() {
        let records = people(&[("1", "SILVA"), ("2", "SILVA"), ("3", "SALVA"), ("4", "MOURA")]);
        let run = engine().deduplicate(&records).unwrap();
        let potentials: Vec<CandidatePair> = run
            .classified
            .by_label(MatchLabel::Potential)
            .iter()
            .map(|c| c.pair.clone())
            .collect();
        assert_eq!(potentials, vec![pair("1", "3"), pair("2", "3")]);

        // reversed order is normalized; (1, 4) is known but never a potential
        let confirmed = vec![
            CandidatePair::linked("3".into(), "1".into()),
            pair("1", "4"),
            pair("1", "2"),
        ];
        let matched = run.matched_pairs(&confirmed).unwrap();
        assert_eq!(matched, vec![pair("1", "2"), pair("1", "3")]);
        assert_eq!(run.matched_pairs(&[]).unwrap(), vec![pair("1", "2")]);
    }

    #[test]
    fn test_confirmed_pair_with_unknown_id_is_an_error() {
        let records = people(&[("1", "SILVA"), ("2", "SILVA"), ("3", "SALVA")]);
        let run = engine().deduplicate(&records).unwrap();
        let err = run.matched_pairs(&[pair("1", "99")]).unwrap_err();
        assert_eq!(
            err,
            LinkageError::from(DataIntegrityError::UnknownRecordId {
                left: "1".into(),
                right: "99".into(),
                missing: "99".into(),
            })
        );
        assert!(run.resolve(&[pair("1", "99")], 1).unwrap_err().is_data_integrity());

        // in a linkage run each side is checked against its own record set
        let left = people(&[("L1", "SILVA")]);
        let right = people(&[("R1", "SALVA")]);
        let linked = engine().link(&left, &right).unwrap();
        let swapped = CandidatePair::linked("R1".into(), "L1".into());
        assert!(linked.matched_pairs(&[swapped]).unwrap_err().is_data_integrity());
        let both = CandidatePair::linked("L1".into(), "R1".into());
        assert_eq!(linked.matched_pairs(&[both.clone()]).unwrap(), vec![both]);
    }

    #[test]
    fn test_resolve_clusters_dedup_runs() {
        let records = people(&[("3", "SILVA"), ("1", "SILVA"), ("2", "SILVA"), ("4", "MOURA")]);
        let run = engine().deduplicate(&records).unwrap();
        let resolution = run.resolve(&[], 2).unwrap();
        let groups = resolution.entities().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups.get(&RecordId::from("1")),
            Some([RecordId::from("2"), RecordId::from("3")].as_slice())
        );
        assert!(resolution.links().is_none());
    }

    #[test]
    fn test_reclassify_keeps_table() {
        let records = people(&[("1", "SILVA"), ("2", "SILVA"), ("3", "SALVA")]);
        let mut run = engine().deduplicate(&records).unwrap();
        let table = run.table.clone();
        run.reclassify(ranges((0.5, 1.01), (0.1, 0.5))).unwrap();
        assert_eq!(run.table, table);
        assert_eq!(run.summary.certain, run.classified.certain.len());
        assert!(run.summary.certain >= 2);
        assert!(run.reclassify(ranges((0.5, 1.01), (0.1, 0.5))).is_ok());
    }

    #[test]
    fn test_link_keeps_sides() {
        let left = people(&[("L1", "SILVA"), ("L2", "MOURA")]);
        let right = people(&[("R1", "SILVA"), ("R2", "SILVA")]);
        let run = engine().link(&left, &right).unwrap();
        assert_eq!(run.mode, RunMode::Linkage);
        for candidate in run.candidates() {
            assert!(left.contains(&candidate.left));
            assert!(right.contains(&candidate.right));
        }
        let links = run.resolve(&[], 1).unwrap();
        let links = links.links().unwrap();
        assert_eq!(
            links.get(&RecordId::from("L1")),
            Some([RecordId::from("R1"), RecordId::from("R2")].as_slice())
        );
        assert!(links.get(&RecordId::from("L2")).is_none());
    }

    #[test]
    fn test_report_serializes() {
        let records = people(&[("1", "SILVA"), ("2", "SILVA")]);
        let run = engine().deduplicate(&records).unwrap();
        let resolution = run.resolve(&[], 1).unwrap();
        let report = RunReport::new(&run, 1, &resolution);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["run"]["mode"], "deduplication");
        assert_eq!(json["config_fingerprint"], run.table.config_fingerprint.as_str());
        assert_eq!(json["groups"]["1"][0], "2");
    }
}
