//! Answer-segment boundary detection for echo scoring.
//!
//! The echo prompt ends with the candidate text, so the answer segment is a
//! token suffix. The detector walks suffixes from the end and returns the
//! start index of the one whose text matches the candidate:
//!
//! 1. An exact match (`concat(tokens[i..]) == candidate`) wins outright.
//! 2. Otherwise the shortest suffix that matches after trimming and collapsing
//!    whitespace runs is used. Tokenizers usually glue the separator before the
//!    answer onto its first token (`"\nParis"`), which this absorbs.
//!
//! Only suffixes are considered, so when the candidate text also occurs inside
//! the prompt the final occurrence is always the one scored.

use tracing::debug;

use super::error::ScoringError;
use super::types::TokenRecord;

/// Returns the index of the first token belonging to `candidate`.
///
/// A blank candidate yields `tokens.len()` (an empty segment), which the
/// aggregator rejects as [`ScoringError::EmptySegment`].
pub fn find_answer_start(tokens: &[TokenRecord], candidate: &str) -> Result<usize, ScoringError> {
    let target = collapse_whitespace(candidate);
    if target.is_empty() {
        return Ok(tokens.len());
    }

    let text: String = tokens.iter().map(|t| t.token.as_str()).collect();
    let starts = token_starts(tokens);

    let mut loose_match = None;
    for i in (0..tokens.len()).rev() {
        let suffix = &text[starts[i]..];
        if suffix == candidate {
            debug!(start = i, "Exact answer boundary");
            return Ok(i);
        }

        let collapsed = collapse_whitespace(suffix);
        if collapsed.len() > target.len() {
            break;
        }
        if loose_match.is_none() && collapsed == target {
            loose_match = Some(i);
        }
    }

    if let Some(start) = loose_match {
        debug!(start, "Whitespace-tolerant answer boundary");
        return Ok(start);
    }

    Err(ScoringError::alignment(explain_misalignment(
        tokens, &starts, &text, candidate,
    )))
}

fn token_starts(tokens: &[TokenRecord]) -> Vec<usize> {
    let mut offset = 0;
    tokens
        .iter()
        .map(|t| {
            let start = offset;
            offset += t.token.len();
            start
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn explain_misalignment(
    tokens: &[TokenRecord],
    starts: &[usize],
    text: &str,
    candidate: &str,
) -> String {
    let trimmed_text = text.trim_end();
    let trimmed_candidate = candidate.trim();

    if tokens.is_empty() {
        return "provider returned no tokens".to_string();
    }
    if !trimmed_text.ends_with(trimmed_candidate) {
        return "echoed text does not end with the candidate text".to_string();
    }

    let answer_offset = trimmed_text.len() - trimmed_candidate.len();
    let straddling = starts.partition_point(|&s| s <= answer_offset).saturating_sub(1);
    format!(
        "candidate text starts inside token {} ({:?})",
        straddling, tokens[straddling].token
    )
}
