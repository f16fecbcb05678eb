use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

/// Credential accepted by `app()`.
pub const TEST_TOKEN: &str = "test-token";

/// Id of the single seeded course.
pub const COURSE_ID: u64 = 100;

pub type Db = Arc<RwLock<Lms>>;

/// In-memory state of one seeded course.
#[derive(Debug)]
pub struct Lms {
    token: String,
    next_id: u64,
    course: Value,
    assignments: Vec<Value>,
    overrides: Vec<Value>,
    quizzes: Vec<Value>,
    questions: BTreeMap<u64, Vec<Value>>,
    students: Vec<Value>,
    assignment_groups: Vec<Value>,
    group_categories: Vec<Value>,
    groups: Vec<Value>,
    memberships: Vec<Value>,
    assignment_submissions: BTreeMap<u64, Vec<Value>>,
    quiz_submissions: BTreeMap<u64, Vec<Value>>,
}

impl Lms {
    /// Course 100 "Algorithms" with one plain assignment, one graded quiz
    /// (listed both as quiz 9 and as an assignment carrying `quiz_id`) and
    /// three students.
    pub fn seeded(token: &str) -> Self {
        Self {
            token: token.to_string(),
            next_id: 1000,
            course: json!({"id": COURSE_ID, "name": "Algorithms", "course_code": "ALG"}),
            assignments: vec![
                json!({"id": 1, "course_id": COURSE_ID, "name": "HW1", "points_possible": 40.0, "published": true}),
                json!({"id": 2, "course_id": COURSE_ID, "name": "Quiz-as-assignment", "quiz_id": 9}),
            ],
            overrides: Vec::new(),
            quizzes: vec![json!({"id": 9, "title": "Midterm", "quiz_type": "assignment", "published": false, "question_count": 1})],
            questions: BTreeMap::from([(
                9,
                vec![json!({"id": 70, "quiz_id": 9, "question_name": "Q1", "question_type": "essay_question"})],
            )]),
            students: vec![
                json!({"id": 11, "name": "Ada Lovelace", "short_name": "Ada"}),
                json!({"id": 22, "name": "Grace Hopper", "short_name": "Grace"}),
                json!({"id": 33, "name": "Alan Turing", "short_name": "Alan"}),
            ],
            assignment_groups: vec![
                json!({"id": 5, "name": "Uppgifter", "position": 1}),
                json!({"id": 6, "name": "Exams", "position": 2}),
            ],
            group_categories: vec![json!({"id": 4, "name": "Project groups", "course_id": COURSE_ID})],
            groups: Vec::new(),
            memberships: Vec::new(),
            assignment_submissions: BTreeMap::from([(
                1,
                vec![json!({"id": 300, "assignment_id": 1, "user_id": 11, "workflow_state": "submitted"})],
            )]),
            quiz_submissions: BTreeMap::from([(9, vec![json!({"id": 400, "quiz_id": 9, "user_id": 22})])]),
        }
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Error answered in the LMS's `{"errors":[{"message": ...}]}` shape.
#[derive(Debug)]
pub struct Failure(StatusCode, String);

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.0, Json(json!({"errors": [{"message": self.1}]}))).into_response()
    }
}

type Answer = Result<Json<Value>, Failure>;

fn not_found() -> Failure {
    Failure(StatusCode::NOT_FOUND, "The specified resource does not exist.".to_string())
}

fn bad_request(message: &str) -> Failure {
    Failure(StatusCode::BAD_REQUEST, message.to_string())
}

/// Query-string options in arrival order.
struct Params(Vec<(String, String)>);

impl Params {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn all(&self, key: &str) -> Vec<&str> {
        self.0.iter().filter(|(k, _)| k == key).map(|(_, v)| v.as_str()).collect()
    }

    fn text(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    fn required(&self, key: &str) -> Result<String, Failure> {
        match self.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
            _ => Err(bad_request(&format!("{key} is required"))),
        }
    }

    fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some("True" | "true" | "1"))
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.parse().ok())
    }
}

pub fn app() -> Router {
    app_with_token(TEST_TOKEN)
}

pub fn app_with_token(token: &str) -> Router {
    let db: Db = Arc::new(RwLock::new(Lms::seeded(token)));
    let course = Router::new()
        .route("/assignments", get(list_assignments).post(create_assignment))
        .route("/assignments/{assignment_id}", get(get_assignment))
        .route("/assignments/{assignment_id}/submissions", get(list_assignment_submissions))
        .route("/assignments/{assignment_id}/overrides", post(create_override))
        .route(
            "/assignments/{assignment_id}/overrides/{override_id}",
            delete(delete_override),
        )
        .route("/quizzes", get(list_quizzes).post(create_quiz))
        .route("/quizzes/{quiz_id}", get(get_quiz).put(update_quiz).delete(delete_quiz))
        .route("/quizzes/{quiz_id}/questions", get(list_questions).post(create_question))
        .route("/quizzes/{quiz_id}/submissions", get(list_quiz_submissions))
        .route("/students", get(list_students))
        .route("/assignment_groups", get(list_assignment_groups))
        .route("/group_categories", get(list_group_categories));

    Router::new()
        .route("/api/v1/courses/{course_id}", get(get_course))
        .nest("/api/v1/courses/{course_id}", course)
        .route("/api/v1/users/{user_id}/profile", get(get_profile))
        .route("/api/v1/group_categories/{category_id}/groups", post(create_group))
        .route("/api/v1/groups/{group_id}/memberships", post(create_membership))
        .layer(middleware::from_fn_with_state(db.clone(), require_token))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_token(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_token(token)).await
}

async fn require_token(State(db): State<Db>, request: Request, next: Next) -> Response {
    let supplied = Query::<Vec<(String, String)>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(pairs)| pairs.into_iter().find(|(k, _)| k == "access_token").map(|(_, v)| v));
    debug!(method = %request.method(), path = %request.uri().path(), "request");
    if supplied.as_deref() != Some(db.read().await.token.as_str()) {
        return Failure(StatusCode::UNAUTHORIZED, "Invalid access token.".to_string()).into_response();
    }
    next.run(request).await
}

fn check_course(course_id: u64) -> Result<(), Failure> {
    if course_id == COURSE_ID {
        Ok(())
    } else {
        Err(not_found())
    }
}

fn find(items: &[Value], id: u64) -> Option<&Value> {
    items.iter().find(|item| item["id"].as_u64() == Some(id))
}

fn find_mut(items: &mut [Value], id: u64) -> Option<&mut Value> {
    items.iter_mut().find(|item| item["id"].as_u64() == Some(id))
}

// --- course ---

async fn get_course(State(db): State<Db>, Path(course_id): Path<u64>) -> Answer {
    check_course(course_id)?;
    Ok(Json(db.read().await.course.clone()))
}

async fn list_students(State(db): State<Db>, Path(course_id): Path<u64>) -> Answer {
    check_course(course_id)?;
    Ok(Json(Value::Array(db.read().await.students.clone())))
}

async fn list_assignment_groups(State(db): State<Db>, Path(course_id): Path<u64>) -> Answer {
    check_course(course_id)?;
    Ok(Json(Value::Array(db.read().await.assignment_groups.clone())))
}

async fn list_group_categories(State(db): State<Db>, Path(course_id): Path<u64>) -> Answer {
    check_course(course_id)?;
    Ok(Json(Value::Array(db.read().await.group_categories.clone())))
}

async fn get_profile(State(db): State<Db>, Path(user_id): Path<u64>) -> Answer {
    let lms = db.read().await;
    let student = find(&lms.students, user_id).ok_or_else(not_found)?;
    let short_name = student["short_name"].as_str().unwrap_or_default().to_lowercase();
    Ok(Json(json!({
        "id": user_id,
        "name": student["name"],
        "short_name": student["short_name"],
        "primary_email": format!("{short_name}@example.org"),
    })))
}

// --- assignments ---

async fn list_assignments(State(db): State<Db>, Path(course_id): Path<u64>) -> Answer {
    check_course(course_id)?;
    Ok(Json(Value::Array(db.read().await.assignments.clone())))
}

async fn get_assignment(State(db): State<Db>, Path((course_id, assignment_id)): Path<(u64, u64)>) -> Answer {
    check_course(course_id)?;
    let lms = db.read().await;
    find(&lms.assignments, assignment_id).cloned().map(Json).ok_or_else(not_found)
}

async fn create_assignment(
    State(db): State<Db>,
    Path(course_id): Path<u64>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Answer {
    check_course(course_id)?;
    let params = Params(pairs);
    let name = params.required("assignment[name]")?;
    let mut lms = db.write().await;
    let assignment = json!({
        "id": lms.allocate_id(),
        "course_id": course_id,
        "name": name,
        "description": params.text("assignment[description]"),
        "published": params.flag("assignment[published]"),
        "only_visible_to_overrides": params.flag("assignment[only_visible_to_overrides]"),
        "allowed_extensions": params.all("assignment[allowed_extensions][]"),
        "submission_types": params.all("assignment[submission_types][]"),
        "points_possible": params.number("assignment[points_possible]"),
        "assignment_group_id": params.number("assignment[assignment_group_id]"),
        "due_at": params.get("assignment[due_at]"),
    });
    lms.assignments.push(assignment.clone());
    Ok(Json(assignment))
}

async fn list_assignment_submissions(
    State(db): State<Db>,
    Path((course_id, assignment_id)): Path<(u64, u64)>,
) -> Answer {
    check_course(course_id)?;
    let lms = db.read().await;
    find(&lms.assignments, assignment_id).ok_or_else(not_found)?;
    let submissions = lms.assignment_submissions.get(&assignment_id).cloned().unwrap_or_default();
    Ok(Json(Value::Array(submissions)))
}

async fn create_override(
    State(db): State<Db>,
    Path((course_id, assignment_id)): Path<(u64, u64)>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Answer {
    check_course(course_id)?;
    let params = Params(pairs);
    let student_ids = params
        .all("assignment_override[student_ids][]")
        .into_iter()
        .map(|id| id.parse::<u64>().map_err(|_| bad_request("student_ids must be numeric")))
        .collect::<Result<Vec<_>, _>>()?;
    if student_ids.is_empty() {
        return Err(bad_request("assignment_override needs students"));
    }
    let mut lms = db.write().await;
    find(&lms.assignments, assignment_id).ok_or_else(not_found)?;
    let created = json!({
        "id": lms.allocate_id(),
        "assignment_id": assignment_id,
        "title": params.text("assignment_override[title]"),
        "unlock_at": params.get("assignment_override[unlock_at]"),
        "lock_at": params.get("assignment_override[lock_at]"),
        "due_at": params.get("assignment_override[due_at]"),
        "student_ids": student_ids,
    });
    lms.overrides.push(created.clone());
    Ok(Json(created))
}

async fn delete_override(
    State(db): State<Db>,
    Path((course_id, assignment_id, override_id)): Path<(u64, u64, u64)>,
) -> Answer {
    check_course(course_id)?;
    let mut lms = db.write().await;
    let position = lms
        .overrides
        .iter()
        .position(|o| o["id"].as_u64() == Some(override_id) && o["assignment_id"].as_u64() == Some(assignment_id))
        .ok_or_else(not_found)?;
    Ok(Json(lms.overrides.remove(position)))
}

// --- quizzes ---

async fn list_quizzes(State(db): State<Db>, Path(course_id): Path<u64>) -> Answer {
    check_course(course_id)?;
    Ok(Json(Value::Array(db.read().await.quizzes.clone())))
}

async fn get_quiz(State(db): State<Db>, Path((course_id, quiz_id)): Path<(u64, u64)>) -> Answer {
    check_course(course_id)?;
    let lms = db.read().await;
    find(&lms.quizzes, quiz_id).cloned().map(Json).ok_or_else(not_found)
}

async fn create_quiz(
    State(db): State<Db>,
    Path(course_id): Path<u64>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Answer {
    check_course(course_id)?;
    let params = Params(pairs);
    let title = params.required("quiz[title]")?;
    let mut lms = db.write().await;
    let id = lms.allocate_id();
    let quiz = json!({
        "id": id,
        "title": title,
        "description": params.text("quiz[description]"),
        "quiz_type": params.get("quiz[quiz_type]").unwrap_or("assignment"),
        "published": false,
        "question_count": 0,
    });
    lms.quizzes.push(quiz.clone());
    lms.questions.insert(id, Vec::new());
    Ok(Json(quiz))
}

async fn update_quiz(
    State(db): State<Db>,
    Path((course_id, quiz_id)): Path<(u64, u64)>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Answer {
    check_course(course_id)?;
    let params = Params(pairs);
    let mut lms = db.write().await;
    let quiz = find_mut(&mut lms.quizzes, quiz_id).ok_or_else(not_found)?;
    if params.get("quiz[published]").is_some() {
        quiz["published"] = Value::Bool(params.flag("quiz[published]"));
    }
    if let Some(title) = params.get("quiz[title]") {
        quiz["title"] = Value::String(title.to_string());
    }
    Ok(Json(quiz.clone()))
}

async fn delete_quiz(State(db): State<Db>, Path((course_id, quiz_id)): Path<(u64, u64)>) -> Answer {
    check_course(course_id)?;
    let mut lms = db.write().await;
    let position = lms
        .quizzes
        .iter()
        .position(|q| q["id"].as_u64() == Some(quiz_id))
        .ok_or_else(not_found)?;
    lms.questions.remove(&quiz_id);
    Ok(Json(lms.quizzes.remove(position)))
}

async fn list_questions(State(db): State<Db>, Path((course_id, quiz_id)): Path<(u64, u64)>) -> Answer {
    check_course(course_id)?;
    let lms = db.read().await;
    lms.questions.get(&quiz_id).cloned().map(|q| Json(Value::Array(q))).ok_or_else(not_found)
}

async fn create_question(
    State(db): State<Db>,
    Path((course_id, quiz_id)): Path<(u64, u64)>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Answer {
    check_course(course_id)?;
    let params = Params(pairs);
    let question_type = params.get("question[question_type]").unwrap_or("essay_question").to_string();
    let answers: Vec<Value> = (0..)
        .map_while(|index| params.get(&format!("question[answers][{index}][answer_text]")))
        .map(|text| json!({"text": text}))
        .collect();
    if question_type == "multiple_choice_question" && answers.is_empty() {
        return Err(bad_request("multiple choice questions need answers"));
    }

    let mut lms = db.write().await;
    let id = lms.allocate_id();
    let quiz = find_mut(&mut lms.quizzes, quiz_id).ok_or_else(not_found)?;
    let count = quiz["question_count"].as_u64().unwrap_or_default();
    quiz["question_count"] = json!(count + 1);

    let question = json!({
        "id": id,
        "quiz_id": quiz_id,
        "question_name": params.text("question[question_name]"),
        "question_text": params.text("question[question_text]"),
        "question_type": question_type,
        "points_possible": params.number("question[points_possible]"),
        "answers": answers,
    });
    lms.questions.entry(quiz_id).or_default().push(question.clone());
    Ok(Json(question))
}

async fn list_quiz_submissions(State(db): State<Db>, Path((course_id, quiz_id)): Path<(u64, u64)>) -> Answer {
    check_course(course_id)?;
    let lms = db.read().await;
    find(&lms.quizzes, quiz_id).ok_or_else(not_found)?;
    let submissions = lms.quiz_submissions.get(&quiz_id).cloned().unwrap_or_default();
    Ok(Json(json!({ "quiz_submissions": submissions })))
}

// --- groups ---

async fn create_group(
    State(db): State<Db>,
    Path(category_id): Path<u64>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Answer {
    let params = Params(pairs);
    let name = params.required("name")?;
    let mut lms = db.write().await;
    find(&lms.group_categories, category_id).ok_or_else(not_found)?;
    let group = json!({
        "id": lms.allocate_id(),
        "name": name,
        "group_category_id": category_id,
        "join_level": params.get("join_level").unwrap_or("invitation_only"),
        "members_count": 0,
    });
    lms.groups.push(group.clone());
    Ok(Json(group))
}

async fn create_membership(
    State(db): State<Db>,
    Path(group_id): Path<u64>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Answer {
    let params = Params(pairs);
    let user_id = params
        .required("user_id")?
        .parse::<u64>()
        .map_err(|_| bad_request("user_id must be numeric"))?;
    let mut lms = db.write().await;
    find(&lms.students, user_id).ok_or_else(not_found)?;
    let id = lms.allocate_id();
    let group = find_mut(&mut lms.groups, group_id).ok_or_else(not_found)?;
    let members = group["members_count"].as_u64().unwrap_or_default();
    group["members_count"] = json!(members + 1);
    let membership = json!({
        "id": id,
        "group_id": group_id,
        "user_id": user_id,
        "workflow_state": "accepted",
    });
    lms.memberships.push(membership.clone());
    Ok(Json(membership))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        Params(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn params_keep_repeated_keys_in_order() {
        let p = params(&[("ids[]", "3"), ("x", "y"), ("ids[]", "1")]);
        assert_eq!(p.all("ids[]"), vec!["3", "1"]);
        assert_eq!(p.get("x"), Some("y"));
    }

    #[test]
    fn params_flag_accepts_python_style_booleans() {
        let p = params(&[("a", "True"), ("b", "False"), ("c", "true")]);
        assert!(p.flag("a"));
        assert!(!p.flag("b"));
        assert!(p.flag("c"));
        assert!(!p.flag("missing"));
    }

    #[test]
    fn params_required_rejects_blank() {
        let p = params(&[("name", " ")]);
        assert!(p.required("name").is_err());
        assert!(p.required("other").is_err());
    }

    #[test]
    fn seeded_course_lists_graded_quiz_as_assignment() {
        let lms = Lms::seeded(TEST_TOKEN);
        assert!(lms.assignments.iter().any(|a| a.get("quiz_id").is_some()));
        assert_eq!(find(&lms.quizzes, 9).unwrap()["title"], "Midterm");
    }

    #[test]
    fn allocated_ids_increase() {
        let mut lms = Lms::seeded(TEST_TOKEN);
        let first = lms.allocate_id();
        assert!(lms.allocate_id() > first);
    }
}
