//! Logprob normalization.
//!
//! Providers return token logprobs in one of two shapes:
//!
//! - **Flat arrays** (text completions): `{tokens, token_logprobs, top_logprobs?}`
//!   where `top_logprobs[i]` is a `{token: logprob}` map (or `null`).
//! - **Structured content** (chat completions): `{content: [{token, logprob,
//!   top_logprobs?: [{token, logprob}]}]}`.
//!
//! Parsing is an explicit two-step attempt (flat first, then structured) into
//! typed variants; a payload matching neither becomes
//! [`ScoringError::UpstreamShape`] with both parse failures in the reason.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use super::error::ScoringError;
use super::types::{NormalizedCompletion, PayloadShape, TokenRecord, TopAlternative};

#[derive(Debug, Deserialize)]
struct FlatLogprobs {
    tokens: Vec<String>,
    token_logprobs: Vec<Option<f64>>,
    #[serde(default)]
    top_logprobs: Option<Vec<Option<BTreeMap<String, f64>>>>,
}

#[derive(Debug, Deserialize)]
struct StructuredLogprobs {
    content: Vec<ContentToken>,
}

#[derive(Debug, Deserialize)]
struct ContentToken {
    token: String,
    logprob: Option<f64>,
    #[serde(default)]
    top_logprobs: Option<Vec<ContentAlternative>>,
}

#[derive(Debug, Deserialize)]
struct ContentAlternative {
    token: String,
    logprob: f64,
}

#[derive(Debug)]
enum RawLogprobs {
    Flat(FlatLogprobs),
    Structured(StructuredLogprobs),
}

impl RawLogprobs {
    fn parse(logprobs: &Value) -> Result<Self, ScoringError> {
        let flat_err = match FlatLogprobs::deserialize(logprobs) {
            Ok(flat) => return Ok(RawLogprobs::Flat(flat)),
            Err(e) => e,
        };
        let structured_err = match StructuredLogprobs::deserialize(logprobs) {
            Ok(structured) => return Ok(RawLogprobs::Structured(structured)),
            Err(e) => e,
        };

        Err(ScoringError::upstream_shape(
            format!(
                "logprobs match neither shape (flat arrays: {}; structured content: {})",
                flat_err, structured_err
            ),
            logprobs,
        ))
    }
}

/// Normalizes a `logprobs` object of either shape into token records.
pub fn normalize_logprobs(logprobs: &Value) -> Result<Vec<TokenRecord>, ScoringError> {
    normalize_with_shape(logprobs).map(|(tokens, _)| tokens)
}

fn normalize_with_shape(logprobs: &Value) -> Result<(Vec<TokenRecord>, PayloadShape), ScoringError> {
    match RawLogprobs::parse(logprobs)? {
        RawLogprobs::Flat(flat) => Ok((from_flat(flat, logprobs)?, PayloadShape::FlatArrays)),
        RawLogprobs::Structured(structured) => Ok((
            from_structured(structured, logprobs)?,
            PayloadShape::StructuredContent,
        )),
    }
}

/// Normalizes the first choice of a full provider response body.
///
/// Works for both text-completion (`choices[0].text`) and chat-completion
/// (`choices[0].message.content`) bodies.
pub fn normalize_completion(raw: &Value) -> Result<NormalizedCompletion, ScoringError> {
    let choice = raw
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| ScoringError::upstream_shape("response has no choices", raw))?;

    let logprobs = choice
        .get("logprobs")
        .filter(|v| !v.is_null())
        .ok_or_else(|| ScoringError::upstream_shape("first choice carries no logprobs", raw))?;

    let text = choice
        .get("text")
        .and_then(Value::as_str)
        .or_else(|| {
            choice
                .get("message")
                .and_then(|m| m.get("content"))
                .and_then(Value::as_str)
        })
        .map(str::to_string);

    let (tokens, shape) = normalize_with_shape(logprobs)?;
    debug!(tokens = tokens.len(), ?shape, "Normalized upstream logprobs");

    Ok(NormalizedCompletion {
        text,
        tokens,
        shape,
    })
}

fn from_flat(flat: FlatLogprobs, raw: &Value) -> Result<Vec<TokenRecord>, ScoringError> {
    if flat.tokens.len() != flat.token_logprobs.len() {
        return Err(ScoringError::upstream_shape(
            format!(
                "tokens ({}) and token_logprobs ({}) differ in length",
                flat.tokens.len(),
                flat.token_logprobs.len()
            ),
            raw,
        ));
    }

    let mut top = match flat.top_logprobs {
        Some(top) if top.len() != flat.tokens.len() => {
            return Err(ScoringError::upstream_shape(
                format!(
                    "top_logprobs ({}) and tokens ({}) differ in length",
                    top.len(),
                    flat.tokens.len()
                ),
                raw,
            ));
        }
        Some(top) => top.into_iter(),
        None => Vec::new().into_iter(),
    };

    flat.tokens
        .into_iter()
        .zip(flat.token_logprobs)
        .enumerate()
        .map(|(position, (token, logprob))| {
            let alternatives = top
                .next()
                .flatten()
                .unwrap_or_default()
                .into_iter()
                .map(|(token, logprob)| TopAlternative { token, logprob })
                .collect();
            build_record(position, token, logprob, alternatives, raw)
        })
        .collect()
}

fn from_structured(
    structured: StructuredLogprobs,
    raw: &Value,
) -> Result<Vec<TokenRecord>, ScoringError> {
    structured
        .content
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            let alternatives = item
                .top_logprobs
                .unwrap_or_default()
                .into_iter()
                .map(|alt| TopAlternative {
                    token: alt.token,
                    logprob: alt.logprob,
                })
                .collect();
            build_record(position, item.token, item.logprob, alternatives, raw)
        })
        .collect()
}

fn build_record(
    position: usize,
    token: String,
    logprob: Option<f64>,
    mut alternatives: Vec<TopAlternative>,
    raw: &Value,
) -> Result<TokenRecord, ScoringError> {
    if let Some(lp) = logprob {
        check_logprob(lp, position, "token", raw)?;
    }
    for alt in &alternatives {
        check_logprob(alt.logprob, position, "alternative", raw)?;
    }

    alternatives.sort_by(|a, b| {
        b.logprob
            .total_cmp(&a.logprob)
            .then_with(|| a.token.cmp(&b.token))
    });

    Ok(TokenRecord {
        token,
        logprob,
        top_alternatives: alternatives,
    })
}

fn check_logprob(lp: f64, position: usize, what: &str, raw: &Value) -> Result<(), ScoringError> {
    if lp.is_nan() || lp > 0.0 {
        return Err(ScoringError::upstream_shape(
            format!("{} logprob {} at position {} is not <= 0", what, lp, position),
            raw,
        ));
    }
    Ok(())
}
