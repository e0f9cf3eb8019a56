//! Conversion of raw class scores into ranked probabilities.

use crate::core::errors::{SimpleError, SmearError, SmearResult};

/// One class index with its probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedScore {
    /// Position of the class in the label set.
    pub index: usize,
    /// Softmax probability.
    pub probability: f32,
}

/// Numerically stable softmax: `p_i = exp(s_i - m) / sum_j exp(s_j - m)`
/// with `m = max(s)`, equal to the plain definition.
///
/// # Errors
///
/// Returns a post-processing error for an empty vector or non-finite scores.
pub fn softmax(scores: &[f32]) -> SmearResult<Vec<f32>> {
    if scores.is_empty() {
        return Err(SmearError::post_processing(
            "softmax over an empty score vector",
            SimpleError::new("no class scores"),
        ));
    }
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(SmearError::post_processing(
            "softmax over non-finite scores",
            SimpleError::new(format!("score {bad} is not finite")),
        ));
    }

    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    Ok(exps.into_iter().map(|e| e / sum).collect())
}

/// Orders probabilities best-first.
///
/// The sort is stable, so exactly equal probabilities keep ascending class
/// index order.
pub fn rank(probabilities: &[f32]) -> Vec<RankedScore> {
    let mut ranked: Vec<RankedScore> = probabilities
        .iter()
        .enumerate()
        .map(|(index, &probability)| RankedScore { index, probability })
        .collect();
    ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    ranked
}

/// Softmax followed by [`rank`].
pub fn softmax_ranked(scores: &[f32]) -> SmearResult<Vec<RankedScore>> {
    Ok(rank(&softmax(scores)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[2.0, 1.0, 0.1, -3.0, 7.5]).unwrap();
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_softmax_is_shift_invariant_and_handles_large_scores() {
        let a = softmax(&[1.0, 2.0, 3.0]).unwrap();
        let b = softmax(&[1001.0, 1002.0, 1003.0]).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_softmax_rejects_bad_input() {
        assert!(softmax(&[]).is_err());
        assert!(softmax(&[1.0, f32::NAN]).is_err());
        assert!(softmax(&[f32::INFINITY, 0.0]).is_err());
    }

    #[test]
    fn test_rank_descending() {
        let ranked = rank(&[0.1, 0.6, 0.3]);
        let order: Vec<usize> = ranked.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_rank_ties_keep_index_order() {
        let ranked = softmax_ranked(&[0.5, 2.0, 0.5, 2.0, 0.5]).unwrap();
        let order: Vec<usize> = ranked.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![1, 3, 0, 2, 4]);
        assert_eq!(ranked[0].probability, ranked[1].probability);
    }

    #[test]
    fn test_uniform_scores() {
        let ranked = softmax_ranked(&[0.0; 4]).unwrap();
        assert_eq!(
            ranked.iter().map(|r| r.index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert!(ranked.iter().all(|r| r.probability == 0.25));
    }
}
