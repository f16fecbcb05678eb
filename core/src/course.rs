//! Course resource: the root of the eagerly loaded object graph.
//!
//! # Design
//! Construction is split in two phases. `CourseSnapshot::fetch` performs the
//! sequential reads (course, assignments, quizzes) and returns raw data or the
//! first error; `Course::assemble` applies the assignment filter and builds
//! the entities without touching the network. A `Course` therefore either
//! exists fully populated or not at all.
//!
//! Graded quizzes also show up in the assignment list carrying a `quiz_id`.
//! Those entries are dropped from `Course::assignments` because the same
//! resource is already represented in `Course::quizzes`.

use serde_json::Value;
use tracing::{debug, info};

use crate::client::{send, LmsClient};
use crate::config::Connection;
use crate::error::Result;
use crate::http::Transport;
use crate::quiz::{Quiz, QuizSnapshot};
use crate::types::{id_of, Attributes, NewAssignment, NewOverride, NewQuiz, Reply};

/// Non-owning reference from an assignment back to its course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CourseHandle {
    course_id: u64,
}

impl CourseHandle {
    pub fn course_id(self) -> u64 {
        self.course_id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    course: CourseHandle,
    attributes: Attributes,
}

impl Assignment {
    pub fn id(&self) -> Result<u64> {
        id_of(&self.attributes)
    }

    pub fn course(&self) -> CourseHandle {
        self.course
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// How much of the quiz tree to load with a course.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CourseLoad {
    deep_quizzes: bool,
}

impl CourseLoad {
    /// Quizzes are built from the quiz list alone, with empty question lists.
    pub fn shallow() -> Self {
        Self { deep_quizzes: false }
    }

    /// Every listed quiz is re-fetched by id together with its questions.
    pub fn deep() -> Self {
        Self { deep_quizzes: true }
    }
}

/// Raw data behind a `Course`, in server order and unfiltered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseSnapshot {
    pub course: Attributes,
    pub assignments: Vec<Attributes>,
    pub quizzes: Vec<QuizSnapshot>,
}

impl CourseSnapshot {
    pub fn fetch(client: &LmsClient, load: CourseLoad, transport: &dyn Transport) -> Result<Self> {
        let course = client.parse_object(send(transport, &client.build_get_course())?)?;
        let assignments = client.parse_list(send(transport, &client.build_list_assignments())?)?;
        let listed = client.parse_list(send(transport, &client.build_list_quizzes())?)?;

        let quizzes = if load.deep_quizzes {
            listed
                .iter()
                .map(|entry| QuizSnapshot::fetch(client, id_of(entry)?, transport))
                .collect::<Result<Vec<_>>>()?
        } else {
            listed
                .into_iter()
                .map(|attributes| QuizSnapshot {
                    attributes,
                    questions: Vec::new(),
                })
                .collect()
        };

        Ok(Self {
            course,
            assignments,
            quizzes,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Course {
    client: LmsClient,
    attributes: Attributes,
    assignments: Vec<Assignment>,
    quizzes: Vec<Quiz>,
}

impl Course {
    /// Load the course, its assignments and its quiz list: three requests.
    pub fn fetch(connection: Connection, transport: &dyn Transport) -> Result<Self> {
        Self::fetch_with(connection, CourseLoad::shallow(), transport)
    }

    pub fn fetch_with(connection: Connection, load: CourseLoad, transport: &dyn Transport) -> Result<Self> {
        let client = LmsClient::new(connection);
        let snapshot = CourseSnapshot::fetch(&client, load, transport)?;
        let course = Self::assemble(client.connection().clone(), snapshot);
        info!(
            course_id = course.id(),
            assignments = course.assignments.len(),
            quizzes = course.quizzes.len(),
            "course loaded"
        );
        Ok(course)
    }

    /// Build a course from already acquired data. Performs no I/O.
    pub fn assemble(connection: Connection, snapshot: CourseSnapshot) -> Self {
        let handle = CourseHandle {
            course_id: connection.course_id,
        };
        let assignments = snapshot
            .assignments
            .into_iter()
            .filter(|attributes| !attributes.contains_key("quiz_id"))
            .map(|attributes| Assignment {
                course: handle,
                attributes,
            })
            .collect();
        let quizzes = snapshot
            .quizzes
            .into_iter()
            .map(|quiz| Quiz::assemble(connection.clone(), quiz))
            .collect();

        Self {
            client: LmsClient::new(connection),
            attributes: snapshot.course,
            assignments,
            quizzes,
        }
    }

    pub fn id(&self) -> u64 {
        self.client.connection().course_id
    }

    pub fn handle(&self) -> CourseHandle {
        CourseHandle { course_id: self.id() }
    }

    pub fn connection(&self) -> &Connection {
        self.client.connection()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn quizzes(&self) -> &[Quiz] {
        &self.quizzes
    }

    /// The loaded quiz with the given id, for publishing or adding questions.
    pub fn quiz_mut(&mut self, quiz_id: u64) -> Option<&mut Quiz> {
        self.quizzes
            .iter_mut()
            .find(|quiz| quiz.id().is_ok_and(|id| id == quiz_id))
    }

    // -----------------------------------------------------------------------
    // Reads returning raw server data
    // -----------------------------------------------------------------------

    pub fn get_assignment(&self, assignment_id: u64, transport: &dyn Transport) -> Result<Attributes> {
        let response = send(transport, &self.client.build_get_assignment(assignment_id))?;
        self.client.parse_object(response)
    }

    /// Fetch the assignment (for its name), then all its submissions.
    pub fn get_assignment_submissions(&self, assignment_id: u64, transport: &dyn Transport) -> Result<Vec<Attributes>> {
        let assignment = self.get_assignment(assignment_id, transport)?;
        info!(assignment = %display_name(&assignment, "name"), "fetching submissions");
        let response = send(transport, &self.client.build_list_assignment_submissions(assignment_id))?;
        let submissions = self.client.parse_list(response)?;
        debug!(count = submissions.len(), "submissions fetched");
        Ok(submissions)
    }

    /// Fetch the quiz (for its title), then its submissions document.
    pub fn get_quiz_submissions(&self, quiz_id: u64, transport: &dyn Transport) -> Result<Value> {
        let quiz = self.client.parse_object(send(transport, &self.client.build_get_quiz(quiz_id))?)?;
        info!(quiz = %display_name(&quiz, "title"), "fetching submissions");
        let response = send(transport, &self.client.build_list_quiz_submissions(quiz_id))?;
        self.client.parse_value(response)
    }

    pub fn get_group_categories(&self, transport: &dyn Transport) -> Result<Vec<Attributes>> {
        self.client.parse_list(send(transport, &self.client.build_list_group_categories())?)
    }

    pub fn get_user(&self, user_id: u64, transport: &dyn Transport) -> Result<Attributes> {
        self.client.parse_object(send(transport, &self.client.build_get_user_profile(user_id))?)
    }

    pub fn get_students(&self, transport: &dyn Transport) -> Result<Vec<Attributes>> {
        self.client.parse_list(send(transport, &self.client.build_list_students())?)
    }

    pub fn get_assignment_groups(&self, transport: &dyn Transport) -> Result<Vec<Attributes>> {
        self.client.parse_list(send(transport, &self.client.build_list_assignment_groups())?)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Create an assignment. The course's assignment list is not refreshed.
    pub fn create_assignment(&self, input: &NewAssignment, transport: &dyn Transport) -> Result<Reply> {
        let request = self.client.build_create_assignment(input);
        self.client.parse_reply(send(transport, &request)?)
    }

    pub fn create_assignment_override(
        &self,
        assignment_id: u64,
        input: &NewOverride,
        transport: &dyn Transport,
    ) -> Result<Reply> {
        let request = self.client.build_create_override(assignment_id, input);
        self.client.parse_reply(send(transport, &request)?)
    }

    pub fn delete_assignment_override(
        &self,
        assignment_id: u64,
        override_id: u64,
        transport: &dyn Transport,
    ) -> Result<Reply> {
        let request = self.client.build_delete_override(assignment_id, override_id);
        self.client.parse_reply(send(transport, &request)?)
    }

    /// Create a quiz and append it to `quizzes`, whatever the reply status.
    pub fn create_quiz(&mut self, input: &NewQuiz, transport: &dyn Transport) -> Result<Reply> {
        let (quiz, reply) = Quiz::create(self.connection().clone(), input, transport)?;
        self.quizzes.push(quiz);
        Ok(reply)
    }

    pub fn create_group(&self, group_category_id: u64, name: &str, transport: &dyn Transport) -> Result<Reply> {
        let request = self.client.build_create_group(group_category_id, name);
        self.client.parse_reply(send(transport, &request)?)
    }

    pub fn add_student_to_group(&self, group_id: u64, user_id: u64, transport: &dyn Transport) -> Result<Reply> {
        let request = self.client.build_add_membership(group_id, user_id);
        self.client.parse_reply(send(transport, &request)?)
    }
}

fn display_name(attributes: &Attributes, key: &str) -> String {
    attributes
        .get(key)
        .and_then(Value::as_str)
        .map(|name| name.replace(' ', "_"))
        .unwrap_or_default()
}
