use serde_json::{Map, Value};

use super::ValidationError;

/// Top-level keys every label must carry. Presence only; values are not checked.
pub const REQUIRED_KEYS: [&str; 4] = ["match_score", "summary", "skill_match", "experience_match"];

/// A completion that passed validation. `raw` is kept verbatim for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedLabel {
    pub raw: String,
    pub fields: Map<String, Value>,
}

impl ValidatedLabel {
    /// `match_score` as a number, accepting numeric strings like "45" or "45%".
    pub fn match_score(&self) -> Option<f64> {
        match self.fields.get("match_score")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
            _ => None,
        }
    }
}

/// Check that a completion is a JSON object holding every required key.
///
/// The whole text (surrounding whitespace aside) must be the object;
/// markdown fences or chatter around it make it malformed.
pub fn validate_label(text: &str) -> Result<ValidatedLabel, ValidationError> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| ValidationError::MalformedJson(e.to_string()))?;

    let fields = match value {
        Value::Object(map) => map,
        other => {
            return Err(ValidationError::MalformedJson(format!(
                "expected an object, found {}",
                json_kind(&other)
            )))
        }
    };

    let missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| !fields.contains_key(**key))
        .map(|key| key.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::Schema { missing });
    }

    Ok(ValidatedLabel {
        raw: text.to_string(),
        fields,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETE: &str = r#"{"match_score": 45, "summary": "Partial fit", "skill_match": {"matched": ["Python"], "missing": ["AWS"], "score": 50}, "experience_match": {"matched_years": 3, "required_years": 5, "score": 40}}"#;

    #[test]
    fn accepts_complete_label() {
        let label = validate_label(COMPLETE).unwrap();
        assert_eq!(label.raw, COMPLETE);
        assert_eq!(label.match_score(), Some(45.0));
        assert_eq!(label.fields["summary"], "Partial fit");
    }

    #[test]
    fn extra_keys_are_allowed() {
        let text = r#"{"match_score": "80%", "summary": "", "skill_match": null, "experience_match": [], "final_assessment": "strong"}"#;
        let label = validate_label(text).unwrap();
        assert_eq!(label.match_score(), Some(80.0));
    }

    #[test]
    fn surrounding_whitespace_is_tolerated_and_raw_kept() {
        let text = format!("\n  {COMPLETE}\n");
        let label = validate_label(&text).unwrap();
        assert_eq!(label.raw, text);
    }

    #[test]
    fn prose_is_malformed() {
        let err = validate_label("The candidate is a moderate fit.").unwrap_err();
        assert!(matches!(err, ValidationError::MalformedJson(_)));
    }

    #[test]
    fn fenced_json_is_malformed() {
        let text = format!("```json\n{COMPLETE}\n```");
        assert!(matches!(validate_label(&text), Err(ValidationError::MalformedJson(_))));
    }

    #[test]
    fn non_object_json_is_malformed() {
        for text in ["[1, 2]", "\"summary\"", "45", "null"] {
            assert!(
                matches!(validate_label(text), Err(ValidationError::MalformedJson(_))),
                "{text} should be malformed"
            );
        }
    }

    #[test]
    fn schema_error_names_every_missing_key() {
        let err = validate_label(r#"{"summary": "ok", "skill_match": {}}"#).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Schema {
                missing: vec!["match_score".into(), "experience_match".into()]
            }
        );
        assert_eq!(
            err.to_string(),
            "Response is missing required keys: match_score, experience_match"
        );
    }

    #[test]
    fn empty_object_misses_all_keys() {
        match validate_label("{}").unwrap_err() {
            ValidationError::Schema { missing } => assert_eq!(missing, REQUIRED_KEYS.to_vec()),
            other => panic!("expected Schema, got {other:?}"),
        }
    }

    #[test]
    fn nested_required_keys_do_not_count() {
        let text = r#"{"summary": "x", "details": {"match_score": 1, "skill_match": {}, "experience_match": {}}}"#;
        match validate_label(text).unwrap_err() {
            ValidationError::Schema { missing } => assert_eq!(missing.len(), 3),
            other => panic!("expected Schema, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_match_score_is_none() {
        let text = r#"{"match_score": "high", "summary": "", "skill_match": {}, "experience_match": {}}"#;
        assert_eq!(validate_label(text).unwrap().match_score(), None);
    }
}
