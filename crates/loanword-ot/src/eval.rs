//! Accuracy of decoded result lines against gold source words.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::decode::{ResultEntry, ResultLine};

/// Entries heavier than this never count.
pub const DEFAULT_MAX_WEIGHT: f64 = 1e12;

/// The entries of `line` within the `n` best distinct weights.
///
/// Entries are taken in order until one weighs more than `max_weight` or
/// the `n + 1`-th distinct weight is reached, so every candidate tied at
/// the `n`-th weight counts.
pub fn results_at_n(line: &ResultLine, n: usize, max_weight: f64) -> &[ResultEntry] {
    let mut remaining = n;
    let mut previous: Option<f64> = None;
    let mut taken = 0;
    for entry in &line.entries {
        if entry.weight > max_weight {
            break;
        }
        if previous != Some(entry.weight) {
            if remaining == 0 {
                break;
            }
            remaining -= 1;
            previous = Some(entry.weight);
        }
        taken += 1;
    }
    &line.entries[..taken]
}

/// What evaluation knows about one sample.
#[derive(Debug, Clone)]
pub struct EvalRecord {
    pub id: String,
    pub result: ResultLine,
    /// Gold source pronunciations, phones concatenated.
    pub gold: BTreeSet<String>,
    /// Source pronunciations that can reach the target, phones concatenated.
    pub reachable: BTreeSet<String>,
}

impl EvalRecord {
    /// Whether some gold pronunciation can reach the target at all.
    pub fn is_correct_reachable(&self) -> bool {
        !self.gold.is_disjoint(&self.reachable)
    }
}

/// Summary of one evaluation.
///
/// `accuracy` sums the soft accuracy of every sample with at least one
/// result and divides by the number of samples whose gold is reachable.
/// It is the value the weight optimizer maximizes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccuracyReport {
    pub samples: usize,
    /// Samples with no result within the weight limit.
    pub unreachable: usize,
    pub reachable: usize,
    pub reachable_correct: usize,
    pub hard_sum: f64,
    pub soft_sum: f64,
    pub total_hard_accuracy: f64,
    pub total_soft_accuracy: f64,
    pub hard_accuracy: f64,
    pub accuracy: f64,
}

fn ratio(sum: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Accuracy at `n` over `records`.
pub fn evaluate(records: &[EvalRecord], n: usize, max_weight: f64) -> AccuracyReport {
    let mut report = AccuracyReport::default();
    for record in records {
        report.samples += 1;
        let results = results_at_n(&record.result, n, max_weight);
        if results.is_empty() {
            report.unreachable += 1;
            continue;
        }
        report.reachable += 1;
        let correct = results
            .iter()
            .filter(|e| record.gold.contains(&e.candidate))
            .count();
        let hard = if correct > 0 { 1.0 } else { 0.0 };
        let soft = correct as f64 / results.len() as f64;
        report.hard_sum += hard;
        report.soft_sum += soft;
        if record.is_correct_reachable() {
            report.reachable_correct += 1;
        } else {
            tracing::debug!(sample = %record.id, "no gold pronunciation is reachable");
        }
    }
    report.total_hard_accuracy = ratio(report.hard_sum, report.reachable);
    report.total_soft_accuracy = ratio(report.soft_sum, report.reachable);
    report.hard_accuracy = ratio(report.hard_sum, report.reachable_correct);
    report.accuracy = ratio(report.soft_sum, report.reachable_correct);
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(candidate: &str, weight: f64) -> ResultEntry {
        ResultEntry {
            candidate: candidate.to_string(),
            markers: Vec::new(),
            weight,
            output: String::new(),
            alignment: Vec::new(),
        }
    }

    fn line(entries: &[(&str, f64)]) -> ResultLine {
        ResultLine {
            target_word: "w".to_string(),
            entries: entries.iter().map(|&(c, w)| entry(c, w)).collect(),
        }
    }

    fn set(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn candidates(entries: &[ResultEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.candidate.as_str()).collect()
    }

    #[test]
    fn ties_at_n_all_count() {
        let l = line(&[("a", 1.0), ("b", 1.0), ("c", 2.0), ("d", 3.0)]);
        assert_eq!(candidates(results_at_n(&l, 1, DEFAULT_MAX_WEIGHT)), vec!["a", "b"]);
        assert_eq!(candidates(results_at_n(&l, 2, DEFAULT_MAX_WEIGHT)), vec!["a", "b", "c"]);
        assert_eq!(results_at_n(&l, 10, DEFAULT_MAX_WEIGHT).len(), 4);
        assert!(results_at_n(&l, 0, DEFAULT_MAX_WEIGHT).is_empty());
    }

    #[test]
    fn heavy_results_are_cut() {
        let l = line(&[("a", 1.0), ("b", 5.0)]);
        assert_eq!(candidates(results_at_n(&l, 2, 4.0)), vec!["a"]);
        assert!(results_at_n(&l, 2, 0.5).is_empty());
    }

    #[test]
    fn accuracy_counts_soft_hits() {
        let records = vec![
            // Tie between a gold and a non-gold candidate: soft 0.5.
            EvalRecord {
                id: "0_x".into(),
                result: line(&[("kitab", 2.0), ("katab", 2.0)]),
                gold: set(&["kitab"]),
                reachable: set(&["kitab", "katab"]),
            },
            // Best candidate is wrong.
            EvalRecord {
                id: "1_y".into(),
                result: line(&[("bard", 1.0), ("barid", 2.0)]),
                gold: set(&["barid"]),
                reachable: set(&["bard", "barid"]),
            },
            // Reachable, but not from gold.
            EvalRecord {
                id: "2_z".into(),
                result: line(&[("sabr", 1.0)]),
                gold: set(&["sabar"]),
                reachable: set(&["sabr"]),
            },
            EvalRecord {
                id: "3_q".into(),
                result: line(&[]),
                gold: set(&["qalam"]),
                reachable: set(&[]),
            },
        ];
        let report = evaluate(&records, 1, DEFAULT_MAX_WEIGHT);
        assert_eq!(report.samples, 4);
        assert_eq!(report.unreachable, 1);
        assert_eq!(report.reachable, 3);
        assert_eq!(report.reachable_correct, 2);
        assert_eq!(report.hard_sum, 1.0);
        assert_eq!(report.soft_sum, 0.5);
        assert_eq!(report.accuracy, 0.25);
        assert_eq!(report.hard_accuracy, 0.5);

        let at_two = evaluate(&records, 2, DEFAULT_MAX_WEIGHT);
        assert_eq!(at_two.soft_sum, 1.0);
        assert_eq!(at_two.accuracy, 0.5);
    }

    #[test]
    fn nothing_reachable_scores_zero() {
        assert_eq!(evaluate(&[], 1, DEFAULT_MAX_WEIGHT).accuracy, 0.0);
    }
}
