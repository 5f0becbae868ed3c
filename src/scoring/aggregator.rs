use super::error::ScoringError;
use super::types::{SequenceMetrics, TokenRecord};

/// Sums logprobs over an answer segment.
///
/// Tokens without a logprob are skipped and not counted. Fails with
/// [`ScoringError::EmptySegment`] when no scored token remains.
pub fn aggregate(segment: &[TokenRecord]) -> Result<SequenceMetrics, ScoringError> {
    let (sum, count) = segment
        .iter()
        .filter_map(|t| t.logprob)
        .fold((0.0_f64, 0_usize), |(sum, count), lp| (sum + lp, count + 1));

    if count == 0 {
        return Err(ScoringError::EmptySegment);
    }

    Ok(SequenceMetrics::from_sum(sum, count))
}
