pub mod match_run;

pub use self::match_run::{MatchEngine, MatchRun, Resolution, RunMode, RunReport};
