//! Tolerant equality between a head value and a tail value.
//!
//! Numbers are similar when close in absolute terms; everything else is compared through a
//! case-insensitive edit distance over the values' string forms.

use serde::{Deserialize, Serialize};
use smartseed_types::Value;

use crate::config::SensitivityConfig;

/// Edit distance where letters differing only in case cost nothing.
pub fn edit_distance(head: &str, tail: &str) -> usize {
    let head: Vec<char> = head.chars().collect();
    let tail: Vec<char> = tail.chars().collect();
    if head.is_empty() {
        return tail.len();
    }
    if tail.is_empty() {
        return head.len();
    }

    // single rolling row of the DP table
    let mut row: Vec<usize> = (0..=tail.len()).collect();
    for (i, &ch1) in head.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &ch2) in tail.iter().enumerate() {
            let cost = if same_letter(ch1, ch2) { 0 } else { 1 };
            let next = (row[j + 1] + 1).min(row[j] + 1).min(diagonal + cost);
            diagonal = row[j + 1];
            row[j + 1] = next;
        }
    }
    row[tail.len()]
}

fn same_letter(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// `1 - distance / max_len`, boosted by `1 + 1/max_len` for strings of at most 3 characters.
///
/// The boost can push short-string scores above 1.0.
pub fn similarity_ratio(head: &str, tail: &str) -> f64 {
    let max = head.chars().count().max(tail.chars().count());
    if max == 0 {
        return 1.0;
    }
    let max = max as f64;
    let mut score = 1.0 - edit_distance(head, tail) as f64 / max;
    if max <= 3.0 {
        score *= 1.0 + 1.0 / max;
    }
    score
}

/// The similarity metric used to decide value preservation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueSimilarity {
    /// Minimum [`similarity_ratio`] for non-numeric values.
    pub threshold: f64,
    /// Largest absolute difference for numeric values.
    pub tolerance: f64,
}

impl ValueSimilarity {
    pub fn new(threshold: f64, tolerance: f64) -> Self {
        Self {
            threshold,
            tolerance,
        }
    }

    pub fn from_config(config: &SensitivityConfig) -> Self {
        Self::new(config.value_similarity_threshold, config.numeric_tolerance)
    }

    /// Whether `tail` approximately preserves `head`.
    ///
    /// Numeric pairs pass when either the integer or the floating difference is within
    /// tolerance, which over-approximates closeness for fractional values.
    pub fn similar(&self, head: &Value, tail: &Value) -> bool {
        if head.is_null() || tail.is_null() {
            return false;
        }
        if head == tail {
            return true;
        }

        if head.is_numeric() && tail.is_numeric() {
            let int_close = match (head.as_integer(), tail.as_integer()) {
                (Some(h), Some(t)) => ((h - t).abs() as f64) <= self.tolerance,
                _ => false,
            };
            let float_close = match (head.as_float(), tail.as_float()) {
                (Some(h), Some(t)) => (h - t).abs() <= self.tolerance,
                _ => false,
            };
            return int_close || float_close;
        }

        let head_str = head.to_string();
        let tail_str = tail.to_string();
        if similarity_ratio(&head_str, &tail_str) >= self.threshold {
            return true;
        }
        head_str == tail_str
    }
}

impl Default for ValueSimilarity {
    fn default() -> Self {
        Self::from_config(&SensitivityConfig::default())
    }
}
