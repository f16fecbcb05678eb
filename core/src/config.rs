//! Connection settings shared by every resource type.
//!
//! A `Connection` is a plain value. `Course` and `Quiz` each own a copy, so a
//! quiz can be fetched or created without a course object in scope.

use serde::{Deserialize, Serialize};

use crate::error::{LmsError, Result};
use crate::query::ValueEncoding;

const ENV_API_URL: &str = "LMS_API_URL";
const ENV_API_KEY: &str = "LMS_API_KEY";
const ENV_COURSE_ID: &str = "LMS_COURSE_ID";
const ENV_RAW_QUERY: &str = "LMS_RAW_QUERY";

/// Base URL, credential and course identifier for one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Deployment root, e.g. `https://uppsala.instructure.com`.
    pub base_url: String,
    pub access_token: String,
    pub course_id: u64,
    #[serde(default)]
    pub encoding: ValueEncoding,
}

impl Connection {
    pub fn new(base_url: &str, access_token: &str, course_id: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            course_id,
            encoding: ValueEncoding::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: ValueEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Read `LMS_API_URL`, `LMS_API_KEY`, `LMS_COURSE_ID` and the optional
    /// `LMS_RAW_QUERY` flag.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| lookup(key).ok_or_else(|| LmsError::Config(format!("{key} is not set")));

        let base_url = required(ENV_API_URL)?;
        let access_token = required(ENV_API_KEY)?;
        let course_id = required(ENV_COURSE_ID)?
            .trim()
            .parse::<u64>()
            .map_err(|e| LmsError::Config(format!("{ENV_COURSE_ID} is not a course id: {e}")))?;

        let encoding = match lookup(ENV_RAW_QUERY).as_deref().map(str::trim) {
            Some("1") | Some("true") => ValueEncoding::Raw,
            _ => ValueEncoding::Percent,
        };

        Ok(Self::new(&base_url, &access_token, course_id).with_encoding(encoding))
    }

    /// `{base_url}/api/v1`
    pub fn api_root(&self) -> String {
        format!("{}/api/v1", self.base_url)
    }

    /// `{base_url}/api/v1/courses/{course_id}`
    pub fn course_root(&self) -> String {
        format!("{}/api/v1/courses/{}", self.base_url, self.course_id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let conn = Connection::new("https://lms.test/", "t", 5);
        assert_eq!(conn.course_root(), "https://lms.test/api/v1/courses/5");
        assert_eq!(conn.api_root(), "https://lms.test/api/v1");
    }

    #[test]
    fn from_lookup_reads_all_settings() {
        let conn = Connection::from_lookup(lookup(&[
            (ENV_API_URL, "https://lms.test"),
            (ENV_API_KEY, "abc"),
            (ENV_COURSE_ID, " 23503 "),
            (ENV_RAW_QUERY, "true"),
        ]))
        .unwrap();
        assert_eq!(conn.course_id, 23503);
        assert_eq!(conn.access_token, "abc");
        assert_eq!(conn.encoding, ValueEncoding::Raw);
    }

    #[test]
    fn from_lookup_defaults_to_percent_encoding() {
        let conn = Connection::from_lookup(lookup(&[
            (ENV_API_URL, "https://lms.test"),
            (ENV_API_KEY, "abc"),
            (ENV_COURSE_ID, "1"),
        ]))
        .unwrap();
        assert_eq!(conn.encoding, ValueEncoding::Percent);
    }

    #[test]
    fn missing_key_is_config_error() {
        let err = Connection::from_lookup(lookup(&[(ENV_API_URL, "https://lms.test")])).unwrap_err();
        assert!(matches!(err, LmsError::Config(msg) if msg.contains(ENV_API_KEY)));
    }

    #[test]
    fn non_numeric_course_id_is_config_error() {
        let err = Connection::from_lookup(lookup(&[
            (ENV_API_URL, "https://lms.test"),
            (ENV_API_KEY, "abc"),
            (ENV_COURSE_ID, "course-1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, LmsError::Config(_)));
    }
}
