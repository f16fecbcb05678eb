//! Quiz resource with its eagerly loaded question list.
//!
//! A `Quiz` owns its own `LmsClient` (and so its own `Connection`) rather
//! than pointing back at a `Course`. It is either fetched by id, which costs
//! two requests (attributes, then questions), or created remotely, in which
//! case the creation reply becomes its attributes.

use tracing::warn;

use crate::client::{send, LmsClient};
use crate::config::Connection;
use crate::error::Result;
use crate::http::Transport;
use crate::types::{id_of, Attributes, NewQuestion, NewQuiz, Reply};

/// Raw data for one quiz, acquired before any entity is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuizSnapshot {
    pub attributes: Attributes,
    pub questions: Vec<Attributes>,
}

impl QuizSnapshot {
    /// Fetch quiz attributes, then its questions. Stops at the first failure.
    pub fn fetch(client: &LmsClient, quiz_id: u64, transport: &dyn Transport) -> Result<Self> {
        let attributes = client.parse_object(send(transport, &client.build_get_quiz(quiz_id))?)?;
        let questions = client.parse_list(send(transport, &client.build_list_questions(id_of(&attributes)?))?)?;
        Ok(Self { attributes, questions })
    }
}

#[derive(Debug, Clone)]
pub struct Quiz {
    client: LmsClient,
    attributes: Attributes,
    questions: Vec<Attributes>,
}

impl Quiz {
    /// Load an existing quiz and its questions.
    pub fn fetch(connection: Connection, quiz_id: u64, transport: &dyn Transport) -> Result<Self> {
        let client = LmsClient::new(connection);
        let snapshot = QuizSnapshot::fetch(&client, quiz_id, transport)?;
        Ok(Self::assemble_with(client, snapshot))
    }

    /// Create a quiz remotely. The reply body becomes the quiz's attributes
    /// whatever the status, so check the returned `Reply` before relying on
    /// the quiz having an id.
    pub fn create(connection: Connection, input: &NewQuiz, transport: &dyn Transport) -> Result<(Self, Reply)> {
        let client = LmsClient::new(connection);
        let request = client.build_create_quiz(input);
        let reply = client.parse_reply(send(transport, &request)?)?;
        let quiz = Self {
            client,
            attributes: reply.attributes(),
            questions: Vec::new(),
        };
        Ok((quiz, reply))
    }

    /// Build a quiz from already acquired data. Performs no I/O.
    pub fn assemble(connection: Connection, snapshot: QuizSnapshot) -> Self {
        Self::assemble_with(LmsClient::new(connection), snapshot)
    }

    fn assemble_with(client: LmsClient, snapshot: QuizSnapshot) -> Self {
        Self {
            client,
            attributes: snapshot.attributes,
            questions: snapshot.questions,
        }
    }

    pub fn id(&self) -> Result<u64> {
        id_of(&self.attributes)
    }

    pub fn connection(&self) -> &Connection {
        self.client.connection()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn questions(&self) -> &[Attributes] {
        &self.questions
    }

    /// Create a question. It is appended locally only on HTTP 200.
    pub fn add_question(&mut self, input: &NewQuestion, transport: &dyn Transport) -> Result<Reply> {
        let request = self.client.build_create_question(self.id()?, input);
        let reply = self.client.parse_reply(send(transport, &request)?)?;
        if reply.status == 200 {
            self.questions.push(reply.attributes());
        } else {
            warn!(status = reply.status, body = %reply.body, "question was not created");
        }
        Ok(reply)
    }

    pub fn publish(&mut self, transport: &dyn Transport) -> Result<Reply> {
        self.set_published(true, transport)
    }

    pub fn unpublish(&mut self, transport: &dyn Transport) -> Result<Reply> {
        self.set_published(false, transport)
    }

    // Attributes are replaced by the reply even when the server refused.
    fn set_published(&mut self, published: bool, transport: &dyn Transport) -> Result<Reply> {
        let request = self.client.build_set_quiz_published(self.id()?, published);
        let reply = self.client.parse_reply(send(transport, &request)?)?;
        self.attributes = reply.attributes();
        Ok(reply)
    }

    /// Delete the quiz remotely. The local value keeps its last state.
    pub fn delete(&self, transport: &dyn Transport) -> Result<Reply> {
        let request = self.client.build_delete_quiz(self.id()?);
        self.client.parse_reply(send(transport, &request)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::LmsError;
    use crate::http::HttpMethod;
    use crate::query::ValueEncoding;
    use crate::testing::ScriptedTransport;
    use crate::types::MULTIPLE_CHOICE;

    const COURSE: &str = "https://lms.test/api/v1/courses/100";

    fn connection() -> Connection {
        Connection::new("https://lms.test", "tok", 100).with_encoding(ValueEncoding::Raw)
    }

    fn fetched_quiz() -> Quiz {
        let transport = ScriptedTransport::new()
            .ok(r#"{"id": 9, "title": "Midterm", "published": false}"#)
            .ok(r#"[{"id": 1, "question_name": "Q1"}]"#);
        Quiz::fetch(connection(), 9, &transport).unwrap()
    }

    #[test]
    fn fetch_issues_quiz_then_questions() {
        let transport = ScriptedTransport::new()
            .ok(r#"{"id": 9, "title": "Midterm"}"#)
            .ok(r#"[{"id": 1}, {"id": 2}]"#);
        let quiz = Quiz::fetch(connection(), 9, &transport).unwrap();

        assert_eq!(
            transport.calls(),
            vec![
                (HttpMethod::Get, format!("{COURSE}/quizzes/9?access_token=tok")),
                (HttpMethod::Get, format!("{COURSE}/quizzes/9/questions?access_token=tok")),
            ]
        );
        assert_eq!(quiz.id().unwrap(), 9);
        assert_eq!(quiz.attributes()["title"], "Midterm");
        assert_eq!(quiz.questions().len(), 2);
    }

    #[test]
    fn fetch_aborts_when_questions_fail() {
        let transport = ScriptedTransport::new()
            .ok(r#"{"id": 9}"#)
            .fail("connection reset");
        let err = Quiz::fetch(connection(), 9, &transport).unwrap_err();
        assert!(matches!(err, LmsError::Transport(_)));
    }

    #[test]
    fn fetch_rejects_malformed_quiz() {
        let transport = ScriptedTransport::new().ok("<html>");
        let err = Quiz::fetch(connection(), 9, &transport).unwrap_err();
        assert!(matches!(err, LmsError::Decode(_)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn create_takes_id_from_reply() {
        let transport = ScriptedTransport::new().ok(r#"{"id": 31, "title": "Week 1"}"#);
        let input = NewQuiz {
            title: "Week 1".to_string(),
            ..NewQuiz::default()
        };
        let (quiz, reply) = Quiz::create(connection(), &input, &transport).unwrap();

        assert!(reply.is_success());
        assert_eq!(quiz.id().unwrap(), 31);
        assert!(quiz.questions().is_empty());
        let calls = transport.calls();
        assert_eq!(calls[0].0, HttpMethod::Post);
        assert!(calls[0].1.starts_with(&format!("{COURSE}/quizzes?quiz[title]=Week 1&")));
    }

    #[test]
    fn create_rejected_leaves_quiz_without_id() {
        let transport = ScriptedTransport::new().reply(401, r#"{"errors":[{"message":"unauthorized"}]}"#);
        let (quiz, reply) = Quiz::create(connection(), &NewQuiz::default(), &transport).unwrap();
        assert!(!reply.is_success());
        assert!(matches!(quiz.id(), Err(LmsError::Decode(_))));
    }

    #[test]
    fn add_question_appends_on_success() {
        let mut quiz = fetched_quiz();
        let transport = ScriptedTransport::new().ok(r#"{"id": 2, "question_name": "Q2"}"#);
        let input = NewQuestion {
            name: "Q2".to_string(),
            question_type: MULTIPLE_CHOICE.to_string(),
            answers: vec!["a".to_string(), "b".to_string()],
            ..NewQuestion::default()
        };
        let reply = quiz.add_question(&input, &transport).unwrap();

        assert!(reply.is_success());
        assert_eq!(quiz.questions().len(), 2);
        assert_eq!(quiz.questions()[1]["question_name"], "Q2");
        assert!(transport.calls()[0].1.contains("question[answers][1][answer_text]=b"));
    }

    #[test]
    fn add_question_failure_leaves_list_unchanged() {
        let mut quiz = fetched_quiz();
        let transport = ScriptedTransport::new().reply(400, r#"{"errors":"bad question"}"#);
        let reply = quiz.add_question(&NewQuestion::default(), &transport).unwrap();

        assert_eq!(reply.status, 400);
        assert_eq!(quiz.questions().len(), 1);
        assert!(reply.into_success().is_err());
    }

    #[test]
    fn add_question_only_counts_200_as_success() {
        let mut quiz = fetched_quiz();
        let transport = ScriptedTransport::new().reply(201, r#"{"id": 3}"#);
        quiz.add_question(&NewQuestion::default(), &transport).unwrap();
        assert_eq!(quiz.questions().len(), 1);
    }

    #[test]
    fn publish_then_unpublish_issues_two_puts() {
        let mut quiz = fetched_quiz();
        let transport = ScriptedTransport::new()
            .ok(r#"{"id": 9, "published": true}"#)
            .ok(r#"{"id": 9, "published": false}"#);

        quiz.publish(&transport).unwrap();
        assert_eq!(quiz.attributes()["published"], json!(true));
        quiz.unpublish(&transport).unwrap();
        assert_eq!(quiz.attributes()["published"], json!(false));

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|(method, _)| *method == HttpMethod::Put));
        assert_eq!(calls[0].1, format!("{COURSE}/quizzes/9?quiz[published]=True&access_token=tok"));
        assert_eq!(calls[1].1, format!("{COURSE}/quizzes/9?quiz[published]=False&access_token=tok"));
    }

    #[test]
    fn publish_overwrites_attributes_even_on_error() {
        let mut quiz = fetched_quiz();
        let transport = ScriptedTransport::new().reply(403, r#"{"status":"unauthorized"}"#);
        let reply = quiz.publish(&transport).unwrap();
        assert_eq!(reply.status, 403);
        assert_eq!(quiz.attributes()["status"], "unauthorized");
        assert!(quiz.attributes().get("title").is_none());
    }

    #[test]
    fn delete_keeps_local_state() {
        let quiz = fetched_quiz();
        let transport = ScriptedTransport::new().ok(r#"{"id": 9, "title": "Midterm"}"#);
        let reply = quiz.delete(&transport).unwrap();
        assert!(reply.is_success());
        assert_eq!(transport.calls()[0], (HttpMethod::Delete, format!("{COURSE}/quizzes/9?access_token=tok")));
        assert_eq!(quiz.id().unwrap(), 9);
    }

    #[test]
    fn assemble_performs_no_io() {
        let snapshot = QuizSnapshot {
            attributes: json!({"id": 4}).as_object().unwrap().clone(),
            questions: Vec::new(),
        };
        let quiz = Quiz::assemble(connection(), snapshot);
        assert_eq!(quiz.id().unwrap(), 4);
        assert_eq!(quiz.connection().course_id, 100);
    }
}
