// src/matching/comparators.rs - Value-level similarity functions
//
// String similarities come from `strsim`; numeric kernels map an absolute
// distance onto [0, 1]. Values of a type a rule cannot read score 0.

use strsim::{jaro, jaro_winkler, normalized_damerau_levenshtein, normalized_levenshtein};

use crate::config::{ComparisonRule, NumericMethod, StringMethod};
use crate::models::FieldValue;

/// Raw similarity of two present values under `rule`, before any threshold.
pub fn similarity(rule: &ComparisonRule, a: &FieldValue, b: &FieldValue) -> f64 {
    match *rule {
        ComparisonRule::Exact => exact(a, b),
        ComparisonRule::StringSim { method, .. } => match (a.as_text(), b.as_text()) {
            (Some(a), Some(b)) => string_similarity(method, a, b),
            _ => 0.0,
        },
        ComparisonRule::Date => match (a.as_date(), b.as_date()) {
            (Some(a), Some(b)) if a == b => 1.0,
            _ => 0.0,
        },
        ComparisonRule::Numeric {
            method,
            offset,
            scale,
        } => match (a.as_number(), b.as_number()) {
            (Some(a), Some(b)) => numeric_similarity(method, (a - b).abs(), offset, scale),
            _ => 0.0,
        },
    }
}

pub fn exact(a: &FieldValue, b: &FieldValue) -> f64 {
    let equal = match (a, b) {
        (FieldValue::Number(x), FieldValue::Number(y)) => x == y,
        (FieldValue::Date(x), FieldValue::Date(y)) => x == y,
        _ => match (a.as_text(), b.as_text()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    };
    if equal {
        1.0
    } else {
        0.0
    }
}

pub fn string_similarity(method: StringMethod, a: &str, b: &str) -> f64 {
    match method {
        StringMethod::JaroWinkler => jaro_winkler(a, b),
        StringMethod::Jaro => jaro(a, b),
        StringMethod::Levenshtein => normalized_levenshtein(a, b),
        StringMethod::DamerauLevenshtein => normalized_damerau_levenshtein(a, b),
    }
}

/// Similarity for an absolute distance `d`. Every kernel is 1.0 up to
/// `offset` and non-increasing after it.
pub fn numeric_similarity(method: NumericMethod, d: f64, offset: f64, scale: f64) -> f64 {
    if d <= offset {
        return 1.0;
    }
    let excess = d - offset;
    let score = match method {
        NumericMethod::Step => 0.0,
        NumericMethod::Linear => {
            if excess > 2.0 * scale {
                0.0
            } else {
                1.0 - excess / (2.0 * scale)
            }
        }
        NumericMethod::Squared => {
            if excess > std::f64::consts::SQRT_2 * scale {
                0.0
            } else {
                1.0 - 0.5 * (excess / scale).powi(2)
            }
        }
        NumericMethod::Exp => 2f64.powf(-excess / scale),
        NumericMethod::Gauss => 2f64.powf(-(excess / scale).powi(2)),
    };
    score.clamp(0.0, 1.0)
}
