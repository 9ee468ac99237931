//! Survey response domain types.
//!
//! A response is an untyped JSON object; the only field the backend looks at
//! is `timestamp`, and only to check that it is present and truthy.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ServiceError;

pub mod repository;

/// One submitted record, passed through verbatim.
pub type SurveyResponse = Map<String, Value>;

pub const TIMESTAMP_FIELD: &str = "timestamp";

/// On-disk layout: `{ "responses": [ ... ] }`.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct ResponseDocument {
    pub responses: Vec<SurveyResponse>,
}

/// Loose truthiness: `null`, `false`, numeric zero and `""` are falsy.
/// Arrays and objects are truthy even when empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Accept a submitted body if it is an object carrying a truthy `timestamp`.
pub fn validate_submission(body: Value) -> Result<SurveyResponse, ServiceError> {
    let Value::Object(record) = body else {
        return Err(ServiceError::Validation("response must be a JSON object".into()));
    };
    match record.get(TIMESTAMP_FIELD) {
        Some(ts) if is_truthy(ts) => Ok(record),
        _ => Err(ServiceError::Validation("missing timestamp".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_table() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(-0.0), json!("")] {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(1), json!(-2.5), json!("0"), json!([]), json!({})] {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }
    }

    #[test]
    fn submission_requires_truthy_timestamp() {
        assert!(validate_submission(json!({"timestamp": "2024-01-01T00:00:00Z", "q1": 0.5})).is_ok());
        assert!(validate_submission(json!({"timestamp": 1700000000})).is_ok());

        for bad in [
            json!({"q1": 1}),
            json!({"timestamp": null}),
            json!({"timestamp": 0}),
            json!({"timestamp": ""}),
            json!([{"timestamp": "x"}]),
            json!("timestamp"),
        ] {
            let err = validate_submission(bad).unwrap_err();
            assert!(err.is_validation());
        }
    }

    #[test]
    fn submission_keeps_field_order() {
        let rec = validate_submission(json!({"z": 1, "timestamp": "t", "a": 2})).unwrap();
        let keys: Vec<&str> = rec.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "timestamp", "a"]);
    }

    #[test]
    fn document_requires_responses_field() {
        assert!(serde_json::from_str::<ResponseDocument>("{}").is_err());
        let doc: ResponseDocument = serde_json::from_str(r#"{"responses":[{"timestamp":"t"}]}"#).unwrap();
        assert_eq!(doc.responses.len(), 1);
    }
}
