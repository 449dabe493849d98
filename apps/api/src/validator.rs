//! Structured Response Validator: the parser boundary between untrusted provider
//! text and everything downstream.
//!
//! Providers are not guaranteed to return pure JSON, so the reply is scanned for
//! the first syntactically valid JSON object carrying the expected keys. There is
//! no auto-repair: anything that does not validate is a hard failure and the
//! caller decides whether to retry.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::matching::models::ScoreBreakdown;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("field `{field}` is out of range or not numeric: {value}")]
    OutOfRangeValue { field: String, value: String },
}

/// (canonical key, accepted alias) for each sub-score, in breakdown order.
const SCORE_KEYS: [(&str, &str); 4] = [
    ("skillsMatch", "skills_match"),
    ("experienceLevel", "experience_level"),
    ("educationRelevance", "education_relevance"),
    ("overallFit", "overall_fit"),
];

/// Everything the matching prompt asks for, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchReply {
    pub breakdown: ScoreBreakdown,
    pub matching_skills: BTreeSet<String>,
    pub missing_skills: BTreeSet<String>,
    pub remarks: String,
}

/// Validates a raw reply down to its score breakdown.
pub fn validate(raw: &str) -> Result<ScoreBreakdown, ValidationError> {
    validate_match_reply(raw).map(|reply| reply.breakdown)
}

/// Validates a raw matching reply: four sub-scores, skill lists, remarks.
///
/// Any model-reported overall score is ignored; the caller recomputes it.
pub fn validate_match_reply(raw: &str) -> Result<MatchReply, ValidationError> {
    let object = extract_json_object(raw, &SCORE_KEYS)?;

    let breakdown = ScoreBreakdown {
        skills_match: require_score(&object, SCORE_KEYS[0])?,
        experience_level: require_score(&object, SCORE_KEYS[1])?,
        education_relevance: require_score(&object, SCORE_KEYS[2])?,
        overall_fit: require_score(&object, SCORE_KEYS[3])?,
    };
    let matching_skills = string_set(&object, ("matchingSkills", "matching_skills"))?;
    let missing_skills = string_set(&object, ("missingSkills", "missing_skills"))?;

    // Partial overlap cannot be a perfect or a zero skills score.
    if !matching_skills.is_empty()
        && !missing_skills.is_empty()
        && (breakdown.skills_match <= 0.0 || breakdown.skills_match >= 100.0)
    {
        return Err(ValidationError::OutOfRangeValue {
            field: "skillsMatch".to_string(),
            value: format!(
                "{} with {} matching and {} missing skills",
                breakdown.skills_match,
                matching_skills.len(),
                missing_skills.len()
            ),
        });
    }

    Ok(MatchReply {
        breakdown,
        matching_skills,
        missing_skills,
        remarks: optional_str(&object, "remarks")?.unwrap_or_default(),
    })
}

/// Range-checks a breakdown that did not come through `validate` (e.g. one
/// handed back by a caller).
pub fn check_breakdown(breakdown: &ScoreBreakdown) -> Result<(), ValidationError> {
    let values = [
        breakdown.skills_match,
        breakdown.experience_level,
        breakdown.education_relevance,
        breakdown.overall_fit,
    ];
    for ((field, _), value) in SCORE_KEYS.iter().zip(values) {
        if !(0.0..=100.0).contains(&value) {
            return Err(ValidationError::OutOfRangeValue {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

/// Validated email reply: subject and body are required, tone is optional.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailReply {
    pub subject: String,
    pub body: String,
    pub tone: Option<String>,
}

pub fn validate_email_reply(raw: &str) -> Result<EmailReply, ValidationError> {
    let object = extract_json_object(raw, &[("subject", "subject"), ("body", "body")])?;

    Ok(EmailReply {
        subject: require_non_empty_str(&object, "subject")?,
        body: require_non_empty_str(&object, "body")?,
        tone: optional_str(&object, "tone")?
            .map(|tone| tone.trim().to_lowercase())
            .filter(|tone| !tone.is_empty()),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Extraction and field helpers
// ────────────────────────────────────────────────────────────────────────────

/// Finds the first JSON object in `raw` that carries every one of
/// `required_keys` (each as `(key, alias)`). Prose, markdown fences and
/// trailing text around it are ignored.
///
/// Without a complete object, the first one carrying any required key is
/// returned (else the first object at all) so the caller reports the specific
/// missing field.
pub fn extract_json_object(
    raw: &str,
    required_keys: &[(&str, &str)],
) -> Result<Map<String, Value>, ValidationError> {
    let mut partial: Option<Map<String, Value>> = None;
    let mut first_object: Option<Map<String, Value>> = None;

    for (start, _) in raw.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&raw[start..]).into_iter::<Value>();
        if let Some(Ok(Value::Object(object))) = stream.next() {
            let present = required_keys
                .iter()
                .filter(|keys| lookup(&object, **keys).is_some())
                .count();
            if present == required_keys.len() {
                return Ok(object);
            }
            if present > 0 {
                partial.get_or_insert(object);
            } else {
                first_object.get_or_insert(object);
            }
        }
    }

    partial.or(first_object).ok_or_else(|| {
        ValidationError::MalformedResponse(if raw.trim().is_empty() {
            "empty reply".to_string()
        } else {
            "no JSON object found in reply".to_string()
        })
    })
}

fn lookup<'a>(object: &'a Map<String, Value>, (key, alias): (&str, &str)) -> Option<&'a Value> {
    object.get(key).or_else(|| object.get(alias))
}

fn require_score(object: &Map<String, Value>, keys: (&str, &str)) -> Result<f64, ValidationError> {
    let field = keys.0;
    let value = lookup(object, keys).ok_or_else(|| ValidationError::MissingField(field.to_string()))?;

    match value.as_f64() {
        Some(number) if (0.0..=100.0).contains(&number) => Ok(number),
        _ => Err(ValidationError::OutOfRangeValue {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

fn string_set(
    object: &Map<String, Value>,
    keys: (&str, &str),
) -> Result<BTreeSet<String>, ValidationError> {
    let malformed =
        || ValidationError::MalformedResponse(format!("`{}` must be an array of strings", keys.0));

    match lookup(object, keys) {
        None | Some(Value::Null) => Ok(BTreeSet::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::trim).ok_or_else(malformed))
            .filter(|item| !matches!(item, Ok("")))
            .map(|item| item.map(str::to_string))
            .collect(),
        Some(_) => Err(malformed()),
    }
}

/// Required string that must not be blank.
pub fn require_non_empty_str(
    object: &Map<String, Value>,
    field: &str,
) -> Result<String, ValidationError> {
    match optional_str(object, field)? {
        Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        _ => Err(ValidationError::MissingField(field.to_string())),
    }
}

/// Absent or null is `None`; anything other than a string is malformed.
pub fn optional_str(
    object: &Map<String, Value>,
    field: &str,
) -> Result<Option<String>, ValidationError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(ValidationError::MalformedResponse(format!(
            "`{field}` must be a string"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "skillsMatch": 67,
        "experienceLevel": 80.5,
        "educationRelevance": 70,
        "overallFit": 75,
        "matchingSkills": ["Python", "Docker"],
        "missingSkills": ["AWS"],
        "remarks": "Good fit."
    }"#;

    #[test]
    fn test_accepts_pure_json() {
        let breakdown = validate(VALID).unwrap();
        assert_eq!(breakdown.skills_match, 67.0);
        assert_eq!(breakdown.experience_level, 80.5);
        assert_eq!(breakdown.education_relevance, 70.0);
        assert_eq!(breakdown.overall_fit, 75.0);
    }

    #[test]
    fn test_extracts_object_embedded_in_prose() {
        let raw = format!("Sure! Here is my evaluation:\n{VALID}\nLet me know if you need more.");
        let reply = validate_match_reply(&raw).unwrap();
        assert_eq!(reply.remarks, "Good fit.");
        assert!(reply.matching_skills.contains("Python"));
        assert!(reply.missing_skills.contains("AWS"));
    }

    #[test]
    fn test_extracts_object_from_markdown_fence() {
        let raw = format!("```json\n{VALID}\n```");
        assert!(validate(&raw).is_ok());
    }

    #[test]
    fn test_skips_unrelated_objects_before_the_scores() {
        let raw = format!(r#"Context: {{"candidate": "A"}} then the answer {VALID}"#);
        assert_eq!(validate(&raw).unwrap().overall_fit, 75.0);
    }

    #[test]
    fn test_prefers_complete_object_over_earlier_partial_one() {
        let raw = r#"Using {"skillsMatch": 70} as a baseline, my answer: {"skillsMatch": 67, "experienceLevel": 80, "educationRelevance": 70, "overallFit": 75}"#;
        let breakdown = validate(raw).unwrap();
        assert_eq!(breakdown.skills_match, 67.0);
        assert_eq!(breakdown.overall_fit, 75.0);

        let raw = r#"Draft {"subject": "Hi"} final {"subject": "Interview Invitation", "body": "Dear Asha"}"#;
        assert_eq!(validate_email_reply(raw).unwrap().subject, "Interview Invitation");
    }

    #[test]
    fn test_partial_object_alone_reports_its_missing_field() {
        let raw = r#"{"note": "x"} then {"skillsMatch": 70, "experienceLevel": 60}"#;
        assert_eq!(
            validate(raw),
            Err(ValidationError::MissingField("educationRelevance".to_string()))
        );
    }

    #[test]
    fn test_accepts_snake_case_keys() {
        let raw = r#"{"skills_match": 50, "experience_level": 40, "education_relevance": 30, "overall_fit": 20}"#;
        let breakdown = validate(raw).unwrap();
        assert_eq!(breakdown.skills_match, 50.0);
        assert_eq!(breakdown.overall_fit, 20.0);
    }

    #[test]
    fn test_no_json_is_malformed() {
        assert!(matches!(
            validate("I think this candidate is great."),
            Err(ValidationError::MalformedResponse(_))
        ));
        assert!(matches!(validate("   "), Err(ValidationError::MalformedResponse(_))));
        assert!(matches!(
            validate(r#"{"skillsMatch": 70, "experienceLevel": "#),
            Err(ValidationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_rejects_each_missing_sub_score() {
        for (key, _) in SCORE_KEYS {
            let mut object: Map<String, Value> = serde_json::from_str(VALID).unwrap();
            object.remove(key);
            let raw = Value::Object(object).to_string();
            assert_eq!(
                validate(&raw),
                Err(ValidationError::MissingField(key.to_string())),
                "removing {key} must fail"
            );
        }
    }

    #[test]
    fn test_object_without_any_score_reports_missing_field() {
        let raw = r#"{"score": 88, "remarks": "great"}"#;
        assert_eq!(
            validate(raw),
            Err(ValidationError::MissingField("skillsMatch".to_string()))
        );
    }

    #[test]
    fn test_rejects_string_negative_and_over_100_scores() {
        for bad in [r#""85""#, "-1", "100.5", "null", "true"] {
            let raw = VALID.replace(r#""overallFit": 75"#, &format!(r#""overallFit": {bad}"#));
            assert!(
                matches!(validate(&raw), Err(ValidationError::OutOfRangeValue { ref field, .. }) if field == "overallFit"),
                "overallFit = {bad} must be rejected"
            );
        }
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let raw = r#"{"skillsMatch": 100, "experienceLevel": 0, "educationRelevance": 0, "overallFit": 100}"#;
        assert!(validate(raw).is_ok());
    }

    #[test]
    fn test_reported_overall_score_is_ignored() {
        let raw = VALID.replace(r#""remarks""#, r#""overallScore": 99, "remarks""#);
        let reply = validate_match_reply(&raw).unwrap();
        assert_eq!(reply.breakdown.skills_match, 67.0);
    }

    #[test]
    fn test_skill_lists_default_empty_and_are_trimmed() {
        let raw = r#"{"skillsMatch": 10, "experienceLevel": 10, "educationRelevance": 10, "overallFit": 10,
                      "matchingSkills": [" Rust ", "", "Rust"]}"#;
        let reply = validate_match_reply(raw).unwrap();
        assert_eq!(reply.matching_skills.len(), 1);
        assert!(reply.matching_skills.contains("Rust"));
        assert!(reply.missing_skills.is_empty());
        assert_eq!(reply.remarks, "");
    }

    #[test]
    fn test_non_string_skill_is_malformed() {
        let raw = VALID.replace(r#"["AWS"]"#, "[42]");
        assert!(matches!(
            validate_match_reply(&raw),
            Err(ValidationError::MalformedResponse(_))
        ));
        let raw = VALID.replace(r#"["AWS"]"#, r#""AWS""#);
        assert!(matches!(
            validate_match_reply(&raw),
            Err(ValidationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_partial_overlap_must_not_claim_extreme_skills_score() {
        for extreme in ["0", "100"] {
            let raw = VALID.replace(r#""skillsMatch": 67"#, &format!(r#""skillsMatch": {extreme}"#));
            assert!(matches!(
                validate_match_reply(&raw),
                Err(ValidationError::OutOfRangeValue { ref field, .. }) if field == "skillsMatch"
            ));
        }
    }

    #[test]
    fn test_check_breakdown_flags_first_bad_field() {
        let breakdown = ScoreBreakdown {
            skills_match: 50.0,
            experience_level: 120.0,
            education_relevance: 50.0,
            overall_fit: -3.0,
        };
        assert_eq!(
            check_breakdown(&breakdown),
            Err(ValidationError::OutOfRangeValue {
                field: "experienceLevel".to_string(),
                value: "120".to_string()
            })
        );
    }

    #[test]
    fn test_require_non_empty_str() {
        let object: Map<String, Value> =
            serde_json::from_str(r#"{"subject": "  Hello ", "body": "   ", "tone": 3}"#).unwrap();
        assert_eq!(require_non_empty_str(&object, "subject").unwrap(), "Hello");
        assert_eq!(
            require_non_empty_str(&object, "body"),
            Err(ValidationError::MissingField("body".to_string()))
        );
        assert_eq!(
            require_non_empty_str(&object, "signature"),
            Err(ValidationError::MissingField("signature".to_string()))
        );
        assert!(matches!(
            optional_str(&object, "tone"),
            Err(ValidationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_email_reply_requires_subject_and_body() {
        let reply = validate_email_reply(
            r#"Here you go: {"subject": "Interview Invitation", "body": "Dear Asha, ...", "tone": " Warm "}"#,
        )
        .unwrap();
        assert_eq!(reply.subject, "Interview Invitation");
        assert_eq!(reply.tone.as_deref(), Some("warm"));

        assert_eq!(
            validate_email_reply(r#"{"subject": "Hi", "body": ""}"#),
            Err(ValidationError::MissingField("body".to_string()))
        );
        assert_eq!(
            validate_email_reply(r#"{"body": "Dear Asha"}"#),
            Err(ValidationError::MissingField("subject".to_string()))
        );
        assert!(matches!(
            validate_email_reply("SUBJECT: Hi\nBODY: Dear Asha"),
            Err(ValidationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_email_reply_tone_is_optional() {
        let reply = validate_email_reply(r#"{"subject": "Update", "body": "Thank you."}"#).unwrap();
        assert_eq!(reply.tone, None);
    }
}
