//! Cross-source agreement scoring.
//!
//! Candidates arrive in strategy priority order. Each one is compared only
//! with its immediate predecessor:
//!
//! ```text
//! agree(prev, next) = |next - prev| <= atol + 1e-5 * |prev|
//! ```
//!
//! The result is the earlier value of the first agreeing pair, with the tier
//! `CONFIDENCE_TIERS[number of agreeing pairs]`. A single agreeing pair
//! therefore lands on the 95% tier, and the 68% tier is never produced. When
//! nothing agrees, or the pair count runs past the tier list, the highest
//! priority candidate is kept at [`Confidence::NoAgreement`].

use crate::domain::{CONFIDENCE_TIERS, Confidence, MetricResult};

/// Relative term added to the absolute tolerance.
pub const RELATIVE_TOLERANCE: f64 = 1e-5;

pub fn agrees(prev: f64, next: f64, atol: f64) -> bool {
    (next - prev).abs() <= atol + RELATIVE_TOLERANCE * prev.abs()
}

/// Reduce priority-ordered candidate values to one value and a confidence.
pub fn reconcile(candidates: &[f64], atol: f64) -> MetricResult {
    let Some(&first) = candidates.first() else {
        return MetricResult::absent();
    };

    let agreeing: Vec<usize> = candidates
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| agrees(pair[0], pair[1], atol))
        .map(|(idx, _)| idx)
        .collect();

    match (agreeing.first(), CONFIDENCE_TIERS.get(agreeing.len())) {
        (Some(&idx), Some(&tier)) => MetricResult::new(candidates[idx], tier),
        _ => MetricResult::new(first, Confidence::NoAgreement),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_candidates_is_absent() {
        let result = reconcile(&[], 0.1);
        assert_eq!(result, MetricResult::absent());
        assert!(result.confidence.is_none());
    }

    #[test]
    fn single_candidate_has_no_agreement() {
        assert_eq!(reconcile(&[2.5], 0.1), MetricResult::new(2.5, Confidence::NoAgreement));
    }

    #[test]
    fn one_agreeing_pair_is_95_percent() {
        assert_eq!(reconcile(&[2.50, 2.54], 0.1), MetricResult::new(2.50, Confidence::Sigma2));
    }

    #[test]
    fn value_comes_from_first_agreeing_pair() {
        // (3.0, 2.5) disagree, (2.5, 2.52) agree.
        assert_eq!(reconcile(&[3.0, 2.5, 2.52], 0.1), MetricResult::new(2.5, Confidence::Sigma2));
    }

    #[test]
    fn two_agreeing_pairs_is_99_7_percent() {
        let result = reconcile(&[2.50, 2.54, 2.50], 0.1);
        assert_eq!(result, MetricResult::new(2.50, Confidence::Sigma3));
        assert_eq!(result.confidence.unwrap().percent(), 99.7);
    }

    #[test]
    fn disagreement_keeps_highest_priority_value() {
        assert_eq!(reconcile(&[1.0, 5.0, 9.0], 0.1), MetricResult::new(1.0, Confidence::NoAgreement));
    }

    #[test]
    fn too_many_agreeing_pairs_falls_back() {
        assert_eq!(
            reconcile(&[1.0, 1.0, 1.0, 1.0], 0.1),
            MetricResult::new(1.0, Confidence::NoAgreement)
        );
    }

    #[test]
    fn tolerance_includes_relative_term() {
        // 0.1 + 1e-5 * 1e6 = 10.1
        assert!(agrees(1e6, 1e6 + 10.0, 0.1));
        assert!(!agrees(1.0, 1.2, 0.1));
    }
}
