use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// The `result` tag of a status reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Pending,
    Completed,
    Error,
    /// A tag this client does not know. Polled like `Pending`.
    Unknown(String),
}

impl JobResult {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "pending" => JobResult::Pending,
            "completed" => JobResult::Completed,
            "error" => JobResult::Error,
            other => JobResult::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobResult::Pending => "pending",
            JobResult::Completed => "completed",
            JobResult::Error => "error",
            JobResult::Unknown(tag) => tag,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobResult::Completed | JobResult::Error)
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StatusDecodeError {
    #[error("response body is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("response body is not a JSON object")]
    NotAnObject,

    #[error("response body has no 'result' field")]
    MissingResult,

    #[error("'result' field is not a string")]
    ResultNotString,
}

/// A decoded status reply: the `result` tag plus the full JSON object it came
/// from. Serializes back to the original body.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusResponse {
    result: JobResult,
    body: Map<String, Value>,
}

impl StatusResponse {
    pub fn decode(raw: &str) -> Result<Self, StatusDecodeError> {
        let value: Value = serde_json::from_str(raw).map_err(StatusDecodeError::Json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, StatusDecodeError> {
        let Value::Object(body) = value else {
            return Err(StatusDecodeError::NotAnObject);
        };

        let result = match body.get("result") {
            None => return Err(StatusDecodeError::MissingResult),
            Some(Value::String(tag)) => JobResult::from_tag(tag),
            Some(_) => return Err(StatusDecodeError::ResultNotString),
        };

        Ok(Self { result, body })
    }

    pub fn result(&self) -> &JobResult {
        &self.result
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn into_body(self) -> Map<String, Value> {
        self.body
    }
}

impl Serialize for StatusResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.body.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod decode {
        use super::*;

        #[test]
        fn decodes_pending() {
            let status = StatusResponse::decode(r#"{"result": "pending"}"#).unwrap();
            assert_eq!(status.result(), &JobResult::Pending);
        }

        #[test]
        fn keeps_extra_fields_of_completed_body() {
            let status = StatusResponse::decode(
                r#"{"result": "completed", "video_url": "https://cdn.example.com/v.mp4"}"#,
            )
            .unwrap();

            assert_eq!(status.result(), &JobResult::Completed);
            assert_eq!(
                status.get("video_url"),
                Some(&json!("https://cdn.example.com/v.mp4"))
            );
        }

        #[test]
        fn unknown_tag_is_preserved() {
            let status = StatusResponse::decode(r#"{"result": "queued"}"#).unwrap();
            assert_eq!(status.result(), &JobResult::Unknown("queued".to_string()));
            assert!(!status.result().is_terminal());
        }

        #[test]
        fn fails_on_invalid_json() {
            let err = StatusResponse::decode("not json").unwrap_err();
            assert!(matches!(err, StatusDecodeError::Json(_)));
        }

        #[test]
        fn fails_on_empty_body() {
            assert!(StatusResponse::decode("").is_err());
        }

        #[test]
        fn fails_on_array() {
            let err = StatusResponse::decode("[]").unwrap_err();
            assert!(matches!(err, StatusDecodeError::NotAnObject));
        }

        #[test]
        fn fails_without_result_field() {
            let err = StatusResponse::decode(r#"{"status": "done"}"#).unwrap_err();
            assert!(matches!(err, StatusDecodeError::MissingResult));
        }

        #[test]
        fn fails_on_non_string_result() {
            let err = StatusResponse::decode(r#"{"result": 1}"#).unwrap_err();
            assert!(matches!(err, StatusDecodeError::ResultNotString));
        }
    }

    mod serialize {
        use super::*;

        #[test]
        fn serializes_to_original_body() {
            let raw = json!({"result": "completed", "duration": 17});
            let status = StatusResponse::from_value(raw.clone()).unwrap();
            assert_eq!(serde_json::to_value(&status).unwrap(), raw);
        }
    }
}
