use serde_json::{Value, json};

use super::*;
use crate::upstream::mock::{flat_echo_response, structured_chat_response, token_logprob};

fn record(token: &str, logprob: f64) -> TokenRecord {
    TokenRecord::new(token, Some(logprob))
}

fn records(tokens: &[&str]) -> Vec<TokenRecord> {
    tokens.iter().map(|t| record(t, -0.5)).collect()
}

fn flat_payload() -> Value {
    json!({
        "tokens": ["The", " capital", " is", " Paris"],
        "token_logprobs": [null, -1.25, -0.5, -0.125],
        "top_logprobs": [
            null,
            {" capital": -1.25, " city": -0.75},
            {" is": -0.5},
            {" Paris": -0.125, " Lyon": -3.0, " Nice": -3.0}
        ]
    })
}

fn structured_payload() -> Value {
    json!({
        "content": [
            {"token": "The", "logprob": null, "top_logprobs": []},
            {"token": " capital", "logprob": -1.25, "top_logprobs": [
                {"token": " city", "logprob": -0.75},
                {"token": " capital", "logprob": -1.25}
            ]},
            {"token": " is", "logprob": -0.5, "top_logprobs": [
                {"token": " is", "logprob": -0.5}
            ]},
            {"token": " Paris", "logprob": -0.125, "top_logprobs": [
                {"token": " Nice", "logprob": -3.0},
                {"token": " Paris", "logprob": -0.125},
                {"token": " Lyon", "logprob": -3.0}
            ]}
        ]
    })
}

#[test]
fn test_normalize_flat_arrays() {
    let tokens = normalize_logprobs(&flat_payload()).expect("flat shape should parse");

    assert_eq!(tokens.len(), 4);
    assert_eq!(tokens[0].token, "The");
    assert_eq!(tokens[0].logprob, None);
    assert!(tokens[0].top_alternatives.is_empty());
    assert_eq!(tokens[1].logprob, Some(-1.25));

    let alt_tokens: Vec<&str> = tokens[1]
        .top_alternatives
        .iter()
        .map(|a| a.token.as_str())
        .collect();
    assert_eq!(alt_tokens, vec![" city", " capital"]);
}

#[test]
fn test_normalize_structured_content() {
    let tokens = normalize_logprobs(&structured_payload()).expect("structured shape should parse");

    assert_eq!(tokens.len(), 4);
    assert_eq!(tokens[3].token, " Paris");
    assert_eq!(tokens[3].top_alternatives[0].token, " Paris");
}

#[test]
fn test_both_shapes_normalize_identically() {
    let flat = normalize_logprobs(&flat_payload()).unwrap();
    let structured = normalize_logprobs(&structured_payload()).unwrap();

    assert_eq!(flat, structured);
}

#[test]
fn test_alternative_ties_are_ordered_by_token() {
    let tokens = normalize_logprobs(&flat_payload()).unwrap();
    let alts: Vec<&str> = tokens[3]
        .top_alternatives
        .iter()
        .map(|a| a.token.as_str())
        .collect();

    assert_eq!(alts, vec![" Paris", " Lyon", " Nice"]);
}

#[test]
fn test_flat_without_top_logprobs() {
    let payload = json!({"tokens": ["a", "b"], "token_logprobs": [-0.1, -0.2]});
    let tokens = normalize_logprobs(&payload).unwrap();

    assert!(tokens.iter().all(|t| t.top_alternatives.is_empty()));
}

#[test]
fn test_null_tokens_fall_through_to_structured_shape() {
    let payload = json!({
        "tokens": null,
        "token_logprobs": null,
        "content": [{"token": "hi", "logprob": -0.3}]
    });
    let tokens = normalize_logprobs(&payload).unwrap();

    assert_eq!(tokens, vec![record("hi", -0.3)]);
}

#[test]
fn test_unrecognized_shape_keeps_payload() {
    let payload = json!({"text_offset": [0, 3], "weird": true});

    match normalize_logprobs(&payload) {
        Err(ScoringError::UpstreamShape { reason, payload: kept }) => {
            assert!(reason.contains("neither shape"));
            assert_eq!(*kept, payload);
        }
        other => panic!("expected UpstreamShape, got {:?}", other),
    }
}

#[test]
fn test_positive_logprob_is_rejected() {
    let payload = json!({"tokens": ["a"], "token_logprobs": [0.25]});
    let err = normalize_logprobs(&payload).unwrap_err();

    assert_eq!(err.kind(), ScoringErrorKind::UpstreamShapeError);
}

#[test]
fn test_positive_alternative_logprob_is_rejected() {
    let payload = json!({"content": [
        {"token": "a", "logprob": -0.1, "top_logprobs": [{"token": "b", "logprob": 0.5}]}
    ]});

    assert!(matches!(
        normalize_logprobs(&payload),
        Err(ScoringError::UpstreamShape { .. })
    ));
}

#[test]
fn test_zero_logprob_is_legal() {
    let payload = json!({"tokens": ["a"], "token_logprobs": [0.0]});
    let tokens = normalize_logprobs(&payload).unwrap();

    assert_eq!(tokens[0].logprob, Some(0.0));
}

#[test]
fn test_flat_length_mismatch_is_rejected() {
    let payload = json!({"tokens": ["a", "b"], "token_logprobs": [-0.1]});
    assert!(matches!(
        normalize_logprobs(&payload),
        Err(ScoringError::UpstreamShape { .. })
    ));

    let payload = json!({
        "tokens": ["a", "b"],
        "token_logprobs": [-0.1, -0.2],
        "top_logprobs": [null]
    });
    assert!(matches!(
        normalize_logprobs(&payload),
        Err(ScoringError::UpstreamShape { .. })
    ));
}

#[test]
fn test_normalize_completion_reads_text_and_message_content() {
    let echo = flat_echo_response("m", "hello there", 1);
    let completion = normalize_completion(&echo).unwrap();
    assert_eq!(completion.text.as_deref(), Some("hello there"));
    assert_eq!(completion.shape, PayloadShape::FlatArrays);
    assert_eq!(completion.reconstructed_text(), "hello there");

    let chat = structured_chat_response("m", "Paris.", 0);
    let completion = normalize_completion(&chat).unwrap();
    assert_eq!(completion.text.as_deref(), Some("Paris."));
    assert_eq!(completion.shape, PayloadShape::StructuredContent);
}

#[test]
fn test_normalize_completion_requires_choices_and_logprobs() {
    assert!(matches!(
        normalize_completion(&json!({"error": "nope"})),
        Err(ScoringError::UpstreamShape { .. })
    ));
    assert!(matches!(
        normalize_completion(&json!({"choices": []})),
        Err(ScoringError::UpstreamShape { .. })
    ));
    assert!(matches!(
        normalize_completion(&json!({"choices": [{"text": "x", "logprobs": null}]})),
        Err(ScoringError::UpstreamShape { .. })
    ));
}

#[test]
fn test_boundary_exact_suffix_reconstructs_answer() {
    let tokens = records(&["<|user|>", "\nQ?", "\n<|assistant|>\n", "Par", "is", "."]);
    let start = find_answer_start(&tokens, "Paris.").unwrap();

    let answer: String = tokens[start..].iter().map(|t| t.token.as_str()).collect();
    assert_eq!(start, 3);
    assert_eq!(answer, "Paris.");
}

#[test]
fn test_boundary_absorbs_leading_separator() {
    let tokens = records(&["<|assistant|>", "\nParis."]);

    assert_eq!(find_answer_start(&tokens, "Paris.").unwrap(), 1);
}

#[test]
fn test_boundary_prefers_last_occurrence() {
    let tokens = records(&["Paris.", " Lyon?", " Paris."]);

    assert_eq!(find_answer_start(&tokens, "Paris.").unwrap(), 2);
}

#[test]
fn test_boundary_prefers_exact_over_whitespace_tolerant() {
    let tokens = records(&["A:", " ", "Paris"]);

    assert_eq!(find_answer_start(&tokens, " Paris").unwrap(), 1);
    assert_eq!(find_answer_start(&tokens, "Paris").unwrap(), 2);
}

#[test]
fn test_boundary_tolerates_internal_whitespace_differences() {
    let tokens = records(&["Q:", " New", "  York"]);

    assert_eq!(find_answer_start(&tokens, "New York").unwrap(), 1);
}

#[test]
fn test_boundary_straddling_token_fails() {
    let tokens = records(&["<|assistant|>", ">Paris."]);

    match find_answer_start(&tokens, "Paris.") {
        Err(ScoringError::SegmentAlignment { reason }) => {
            assert!(reason.contains("inside token 1"), "reason was {}", reason);
        }
        other => panic!("expected SegmentAlignment, got {:?}", other),
    }
}

#[test]
fn test_boundary_missing_candidate_fails() {
    let tokens = records(&["hello", " world"]);

    assert_eq!(
        find_answer_start(&tokens, "Paris.").unwrap_err().kind(),
        ScoringErrorKind::SegmentAlignmentError
    );
    assert!(find_answer_start(&[], "Paris.").is_err());
}

#[test]
fn test_boundary_blank_candidate_is_empty_segment() {
    let tokens = records(&["hello", " "]);

    assert_eq!(find_answer_start(&tokens, "  ").unwrap(), 2);
    assert!(matches!(
        aggregate(&tokens[2..]),
        Err(ScoringError::EmptySegment)
    ));
}

#[test]
fn test_aggregate_metrics_invariants() {
    let segment = vec![record("a", -0.5), record("b", -1.0), record("c", 0.0)];
    let metrics = aggregate(&segment).unwrap();

    assert_eq!(metrics.token_count, 3);
    assert!((metrics.sequence_logprob - -1.5).abs() < 1e-12);
    assert_eq!(metrics.sequence_probability, metrics.sequence_logprob.exp());
    assert_eq!(metrics.avg_logprob, metrics.sequence_logprob / 3.0);
}

#[test]
fn test_aggregate_skips_unscored_tokens() {
    let segment = vec![TokenRecord::new("a", None), record("b", -0.25)];
    let metrics = aggregate(&segment).unwrap();

    assert_eq!(metrics.token_count, 1);
    assert_eq!(metrics.sequence_logprob, -0.25);
}

#[test]
fn test_aggregate_empty_segment() {
    assert!(matches!(aggregate(&[]), Err(ScoringError::EmptySegment)));
    assert!(matches!(
        aggregate(&[TokenRecord::new("a", None)]),
        Err(ScoringError::EmptySegment)
    ));
}

#[test]
fn test_aggregate_is_idempotent() {
    let segment = vec![record("x", -0.3), record("y", -0.7)];

    assert_eq!(aggregate(&segment).unwrap(), aggregate(&segment).unwrap());
}

#[test]
fn test_aggregate_underflow_is_zero_probability() {
    let segment: Vec<TokenRecord> = (0..100).map(|_| record("t", -10.0)).collect();
    let metrics = aggregate(&segment).unwrap();

    assert_eq!(metrics.sequence_logprob, -1000.0);
    assert_eq!(metrics.sequence_probability, 0.0);
    assert_eq!(metrics.avg_logprob, -10.0);
}

#[test]
fn test_probability_from_logprob_bounds() {
    assert_eq!(probability_from_logprob(0.0), 1.0);
    assert_eq!(probability_from_logprob(f64::NEG_INFINITY), 0.0);
    assert!(probability_from_logprob(-0.1) < 1.0);
}

#[test]
fn test_score_echo_payload_end_to_end() {
    let prompt = "<|user|>\nCapital of France?\n\n<|assistant|>\nParis is lovely.";
    let raw = flat_echo_response("m", prompt, 0);

    let metrics = score_echo_payload(&raw, "Paris is lovely.").unwrap();

    let expected = token_logprob("\nParis") + token_logprob(" is") + token_logprob(" lovely.");
    assert_eq!(metrics.token_count, 3);
    assert!((metrics.sequence_logprob - expected).abs() < 1e-12);
    assert!(metrics.sequence_probability > 0.0 && metrics.sequence_probability <= 1.0);
}

#[test]
fn test_error_kinds_are_stable_strings() {
    assert_eq!(
        ScoringError::EmptySegment.kind().as_str(),
        "empty_segment_error"
    );
    assert_eq!(
        serde_json::to_value(ScoringErrorKind::UpstreamShapeError).unwrap(),
        json!("upstream_shape_error")
    );
    assert_eq!(
        ScoringError::Upstream(crate::upstream::UpstreamError::Unavailable {
            attempts: 4,
            message: "503".to_string()
        })
        .kind(),
        ScoringErrorKind::UpstreamUnavailableError
    );
}
