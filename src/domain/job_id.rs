use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;

const MAX_JOB_ID_LEN: usize = 256;

/// Identifier of a remote translation job.
///
/// Opaque to the client, but it is embedded as a single URL path segment, so
/// anything that would change the request path is rejected up front.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobIdParseError {
    input: String,
    reason: &'static str,
}

impl JobIdParseError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

impl fmt::Display for JobIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid job ID '{}': {}", self.input, self.reason)
    }
}

impl std::error::Error for JobIdParseError {}

impl JobId {
    pub fn parse(s: &str) -> Result<Self, JobIdParseError> {
        if s.is_empty() {
            return Err(JobIdParseError::new(s, "job ID is empty"));
        }

        if s.trim().is_empty() {
            return Err(JobIdParseError::new(s, "job ID is blank"));
        }

        if s.len() > MAX_JOB_ID_LEN {
            return Err(JobIdParseError::new(s, "job ID is too long"));
        }

        if !s.chars().all(is_valid_char) {
            return Err(JobIdParseError::new(
                s,
                "job ID contains whitespace, control or reserved URL characters",
            ));
        }

        if matches!(s, "." | "..") {
            return Err(JobIdParseError::new(s, "job ID is a relative path segment"));
        }

        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_char(c: char) -> bool {
    !c.is_whitespace() && !c.is_control() && !matches!(c, '/' | '\\' | '?' | '#' | '%')
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for JobId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        JobId::parse(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod parse {
        use super::*;

        #[test]
        fn parses_numeric_id() {
            let id = JobId::parse("123").unwrap();
            assert_eq!(id.as_str(), "123");
        }

        #[test]
        fn parses_id_with_hyphens_and_underscores() {
            let id = JobId::parse("test_success-2").unwrap();
            assert_eq!(id.as_str(), "test_success-2");
        }

        #[test]
        fn parses_uuid() {
            assert!(JobId::parse("8f14e45f-ceea-467f-a8f5-2c5bd7c3a6f1").is_ok());
        }

        #[test]
        fn fails_on_empty_string() {
            let err = JobId::parse("").unwrap_err();
            assert_eq!(err.reason(), "job ID is empty");
        }

        #[test]
        fn fails_on_blank_string() {
            assert!(JobId::parse("   ").is_err());
        }

        #[test]
        fn fails_on_slash() {
            assert!(JobId::parse("abc/def").is_err());
        }

        #[test]
        fn fails_on_query_marker() {
            assert!(JobId::parse("abc?x=1").is_err());
        }

        #[test]
        fn fails_on_inner_space() {
            assert!(JobId::parse("my job").is_err());
        }

        #[test]
        fn fails_on_control_character() {
            assert!(JobId::parse("abc\n").is_err());
        }

        #[test]
        fn fails_on_dot_segments() {
            for input in [".", ".."] {
                let err = JobId::parse(input).unwrap_err();
                assert_eq!(err.reason(), "job ID is a relative path segment");
            }
        }

        #[test]
        fn parses_ids_containing_dots() {
            assert!(JobId::parse("...").is_ok());
            assert!(JobId::parse("v1.2").is_ok());
        }

        #[test]
        fn fails_when_too_long() {
            let long = "a".repeat(MAX_JOB_ID_LEN + 1);
            assert!(JobId::parse(&long).is_err());
        }
    }

    mod deserialize {
        use super::*;

        #[test]
        fn deserializes_from_string() {
            let id: JobId = serde_json::from_str(r#""job-42""#).unwrap();
            assert_eq!(id.to_string(), "job-42");
        }

        #[test]
        fn fails_on_non_string() {
            let result: Result<JobId, _> = serde_json::from_str("42");
            assert!(result.is_err());
        }

        #[test]
        fn fails_on_empty_string() {
            let result: Result<JobId, _> = serde_json::from_str(r#""""#);
            assert!(result.is_err());
        }
    }
}
