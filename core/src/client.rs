//! Stateless HTTP request builder and response parser for the LMS API.
//!
//! # Design
//! `LmsClient` holds only a `Connection` and carries no mutable state between
//! calls. Every endpoint has a `build_*` method that produces an
//! `HttpRequest`; responses are decoded by the shared `parse_*` methods. The
//! resource model (`Course`, `Quiz`) strings these together with a borrowed
//! `Transport`, which keeps every request shape testable without I/O.
//!
//! Write builders perform no content checks of their own. A blank name or an
//! empty student list is forwarded as given and the server's verdict comes
//! back in the `Reply`.

use serde_json::Value;
use tracing::debug;

use crate::config::Connection;
use crate::error::{LmsError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::query::{flag, QueryBuilder};
use crate::types::{Attributes, NewAssignment, NewOverride, NewQuestion, NewQuiz, Reply};

/// Page size requested for submission listings.
pub const SUBMISSIONS_PER_PAGE: u32 = 1000;

/// Synchronous, stateless request builder for one course's API surface.
#[derive(Debug, Clone)]
pub struct LmsClient {
    connection: Connection,
}

impl LmsClient {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    fn course_path(&self, rest: &str) -> QueryBuilder {
        QueryBuilder::new(format!("{}{rest}", self.connection.course_root()), self.connection.encoding)
    }

    fn api_path(&self, rest: &str) -> QueryBuilder {
        QueryBuilder::new(format!("{}{rest}", self.connection.api_root()), self.connection.encoding)
    }

    fn request(&self, method: HttpMethod, query: QueryBuilder) -> HttpRequest {
        HttpRequest {
            method,
            url: query.build(&self.connection.access_token),
        }
    }

    // -----------------------------------------------------------------------
    // Read path
    // -----------------------------------------------------------------------

    pub fn build_get_course(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.course_path(""))
    }

    pub fn build_list_assignments(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.course_path("/assignments"))
    }

    pub fn build_get_assignment(&self, assignment_id: u64) -> HttpRequest {
        self.request(HttpMethod::Get, self.course_path(&format!("/assignments/{assignment_id}")))
    }

    pub fn build_list_assignment_submissions(&self, assignment_id: u64) -> HttpRequest {
        let query = self
            .course_path(&format!("/assignments/{assignment_id}/submissions"))
            .option("per_page", SUBMISSIONS_PER_PAGE);
        self.request(HttpMethod::Get, query)
    }

    pub fn build_list_quizzes(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.course_path("/quizzes"))
    }

    pub fn build_get_quiz(&self, quiz_id: u64) -> HttpRequest {
        self.request(HttpMethod::Get, self.course_path(&format!("/quizzes/{quiz_id}")))
    }

    pub fn build_list_quiz_submissions(&self, quiz_id: u64) -> HttpRequest {
        let query = self
            .course_path(&format!("/quizzes/{quiz_id}/submissions"))
            .option("per_page", SUBMISSIONS_PER_PAGE);
        self.request(HttpMethod::Get, query)
    }

    pub fn build_list_questions(&self, quiz_id: u64) -> HttpRequest {
        self.request(HttpMethod::Get, self.course_path(&format!("/quizzes/{quiz_id}/questions")))
    }

    pub fn build_get_user_profile(&self, user_id: u64) -> HttpRequest {
        self.request(HttpMethod::Get, self.api_path(&format!("/users/{user_id}/profile")))
    }

    pub fn build_list_students(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.course_path("/students"))
    }

    pub fn build_list_assignment_groups(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.course_path("/assignment_groups"))
    }

    pub fn build_list_group_categories(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.course_path("/group_categories"))
    }

    // -----------------------------------------------------------------------
    // Write path
    // -----------------------------------------------------------------------

    pub fn build_create_assignment(&self, input: &NewAssignment) -> HttpRequest {
        let query = self
            .course_path("/assignments")
            .option("assignment[name]", &input.name)
            .option("assignment[published]", flag(input.published))
            .option("assignment[description]", &input.description)
            .option("assignment[only_visible_to_overrides]", flag(true))
            .option("assignment[allowed_extensions][]", &input.allowed_extension)
            .option("assignment[submission_types][]", "online_upload")
            .option("assignment[points_possible]", input.points_possible)
            .option("assignment[assignment_group_id]", input.assignment_group_id)
            .option_if("assignment[due_at]", input.due_at.as_ref());
        self.request(HttpMethod::Post, query)
    }

    pub fn build_create_override(&self, assignment_id: u64, input: &NewOverride) -> HttpRequest {
        let query = self
            .course_path(&format!("/assignments/{assignment_id}/overrides"))
            .option("assignment_override[title]", &input.title)
            .option("assignment_override[unlock_at]", &input.unlock_at)
            .option("assignment_override[lock_at]", &input.due_at)
            .option("assignment_override[due_at]", &input.due_at)
            .repeated("assignment_override[student_ids][]", &input.student_ids);
        self.request(HttpMethod::Post, query)
    }

    pub fn build_delete_override(&self, assignment_id: u64, override_id: u64) -> HttpRequest {
        let path = format!("/assignments/{assignment_id}/overrides/{override_id}");
        self.request(HttpMethod::Delete, self.course_path(&path))
    }

    pub fn build_create_quiz(&self, input: &NewQuiz) -> HttpRequest {
        let query = self
            .course_path("/quizzes")
            .option("quiz[title]", &input.title)
            .option("quiz[description]", &input.description)
            .option("quiz[quiz_type]", &input.quiz_type);
        self.request(HttpMethod::Post, query)
    }

    /// Multiple-choice questions carry one `answer_text` per answer; other
    /// types ignore `answers`.
    pub fn build_create_question(&self, quiz_id: u64, input: &NewQuestion) -> HttpRequest {
        let mut query = self
            .course_path(&format!("/quizzes/{quiz_id}/questions"))
            .option("question[question_name]", &input.name)
            .option("question[question_text]", &input.text)
            .option("question[question_type]", &input.question_type)
            .option("question[points_possible]", input.points_possible);
        if input.is_multiple_choice() {
            for (index, answer) in input.answers.iter().enumerate() {
                query = query.option(format!("question[answers][{index}][answer_text]"), answer);
            }
        }
        self.request(HttpMethod::Post, query)
    }

    pub fn build_set_quiz_published(&self, quiz_id: u64, published: bool) -> HttpRequest {
        let query = self
            .course_path(&format!("/quizzes/{quiz_id}"))
            .option("quiz[published]", flag(published));
        self.request(HttpMethod::Put, query)
    }

    pub fn build_delete_quiz(&self, quiz_id: u64) -> HttpRequest {
        self.request(HttpMethod::Delete, self.course_path(&format!("/quizzes/{quiz_id}")))
    }

    pub fn build_create_group(&self, group_category_id: u64, name: &str) -> HttpRequest {
        let query = self
            .api_path(&format!("/group_categories/{group_category_id}/groups"))
            .option("name", name)
            .option("join_level", "invitation_only");
        self.request(HttpMethod::Post, query)
    }

    pub fn build_add_membership(&self, group_id: u64, user_id: u64) -> HttpRequest {
        let query = self
            .api_path(&format!("/groups/{group_id}/memberships"))
            .option("user_id", user_id);
        self.request(HttpMethod::Post, query)
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    /// Decode a successful JSON response of any shape.
    pub fn parse_value(&self, response: HttpResponse) -> Result<Value> {
        check_status(&response)?;
        decode(&response.body)
    }

    /// Decode a successful response holding a single JSON object.
    pub fn parse_object(&self, response: HttpResponse) -> Result<Attributes> {
        match self.parse_value(response)? {
            Value::Object(map) => Ok(map),
            other => Err(LmsError::Decode(format!("expected a JSON object, got {}", kind(&other)))),
        }
    }

    /// Decode a successful response holding an array of JSON objects, in
    /// server order.
    pub fn parse_list(&self, response: HttpResponse) -> Result<Vec<Attributes>> {
        match self.parse_value(response)? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    other => Err(LmsError::Decode(format!("expected list of objects, found {}", kind(&other)))),
                })
                .collect(),
            other => Err(LmsError::Decode(format!("expected a JSON array, got {}", kind(&other)))),
        }
    }

    /// Decode a write response without judging its status.
    pub fn parse_reply(&self, response: HttpResponse) -> Result<Reply> {
        let body = if response.body.trim().is_empty() {
            Value::Null
        } else {
            decode(&response.body)?
        };
        Ok(Reply {
            status: response.status,
            body,
        })
    }
}

/// Execute one request through `transport`, logging the masked target.
pub fn send(transport: &dyn Transport, request: &HttpRequest) -> Result<HttpResponse> {
    debug!(method = %request.method, url = %request.redacted_url(), "sending request");
    let response = transport.execute(request)?;
    debug!(status = response.status, "received response");
    Ok(response)
}

fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    Err(LmsError::RemoteRejection {
        status: response.status,
        body: response.body.clone(),
    })
}

fn decode(body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| LmsError::Decode(e.to_string()))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
