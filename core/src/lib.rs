//! Synchronous client core for a Canvas-style LMS REST API.
//!
//! # Overview
//! A `Course` is loaded eagerly (course attributes, assignment list, quiz
//! list) and exposes reads and writes for assignments, overrides, quizzes,
//! questions, groups and users. Resource state is kept as raw attribute maps
//! exactly as the server returned them.
//!
//! # Design
//! - `LmsClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network (host-does-IO pattern).
//! - Every operation borrows a `Transport` for its round-trips;
//!   `UreqTransport` is the blocking implementation shipped here.
//! - Authentication and every option travel in the query string, built by
//!   `QueryBuilder` in caller order with the `access_token` last.
//! - Writes return a `Reply` (status + body) so callers decide how strict
//!   to be about the status.

pub mod client;
pub mod config;
pub mod course;
pub mod error;
pub mod http;
pub mod query;
pub mod quiz;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::LmsClient;
pub use config::Connection;
pub use course::{Assignment, Course, CourseHandle, CourseLoad, CourseSnapshot};
pub use error::{LmsError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use query::{QueryBuilder, ValueEncoding};
pub use quiz::{Quiz, QuizSnapshot};
pub use transport::UreqTransport;
pub use types::{Attributes, NewAssignment, NewOverride, NewQuestion, NewQuiz, Reply};
