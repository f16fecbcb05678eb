//! Option payloads for write operations, and the reply envelope.
//!
//! # Design
//! Resources themselves stay opaque `Attributes` maps; only the caller-side
//! inputs are typed. Each option struct's `Default` carries the values the
//! LMS tooling has always sent when a field is left unspecified. The structs
//! derive serde traits so scripts can keep them in JSON files.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LmsError, Result};
use crate::http::is_success_status;

/// A raw attribute mapping as returned by the server.
pub type Attributes = serde_json::Map<String, Value>;

/// Question type that carries an answer list.
pub const MULTIPLE_CHOICE: &str = "multiple_choice_question";

/// Inputs for `POST /courses/{id}/assignments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewAssignment {
    pub name: String,
    /// ISO-8601 timestamp; omitted from the request when `None`.
    pub due_at: Option<String>,
    pub description: String,
    /// Single allowed file extension; empty allows any.
    pub allowed_extension: String,
    pub points_possible: u32,
    pub assignment_group_id: u64,
    pub published: bool,
}

impl Default for NewAssignment {
    fn default() -> Self {
        Self {
            name: "Test".to_string(),
            due_at: None,
            description: String::new(),
            allowed_extension: String::new(),
            points_possible: 40,
            assignment_group_id: 0,
            published: false,
        }
    }
}

/// Inputs for `POST /courses/{id}/assignments/{id}/overrides`.
///
/// `due_at` is used for both the lock and due dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOverride {
    pub title: String,
    pub unlock_at: String,
    pub due_at: String,
    pub student_ids: Vec<u64>,
}

/// Inputs for `POST /courses/{id}/quizzes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewQuiz {
    pub title: String,
    pub description: String,
    pub quiz_type: String,
}

impl Default for NewQuiz {
    fn default() -> Self {
        Self {
            title: "Empty".to_string(),
            description: "Empty".to_string(),
            quiz_type: "assignment".to_string(),
        }
    }
}

/// Inputs for `POST /courses/{id}/quizzes/{id}/questions`.
///
/// `answers` is sent only for `multiple_choice_question`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewQuestion {
    pub name: String,
    pub question_type: String,
    pub text: String,
    pub answers: Vec<String>,
    pub points_possible: u32,
}

impl NewQuestion {
    pub fn is_multiple_choice(&self) -> bool {
        self.question_type == MULTIPLE_CHOICE
    }
}

impl Default for NewQuestion {
    fn default() -> Self {
        Self {
            name: "Empty".to_string(),
            question_type: "essay_question".to_string(),
            text: "Empty".to_string(),
            answers: vec![String::new()],
            points_possible: 1,
        }
    }
}

/// Status and parsed body of a write request.
///
/// The body is kept even when the status is not a success so callers can
/// inspect the server's error payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        is_success_status(self.status)
    }

    /// Return the body, or `RemoteRejection` for a non-2xx status.
    pub fn into_success(self) -> Result<Value> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(LmsError::RemoteRejection {
                status: self.status,
                body: self.body.to_string(),
            })
        }
    }

    /// The body as an attribute mapping, or empty when it is not an object.
    pub fn attributes(&self) -> Attributes {
        match &self.body {
            Value::Object(map) => map.clone(),
            _ => Attributes::new(),
        }
    }
}

/// Read the numeric `id` from an attribute mapping.
pub fn id_of(attributes: &Attributes) -> Result<u64> {
    attributes
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| LmsError::Decode("attribute mapping has no numeric `id`".to_string()))
}
