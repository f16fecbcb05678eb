//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `LmsClient` builds `HttpRequest`
//! values and parses `HttpResponse` values; something implementing
//! `Transport` performs the actual round-trip. The resource model borrows a
//! transport per call and never stores one, so tests can substitute a
//! recording fake without any shared state.
//!
//! The LMS authenticates through the `access_token` query parameter and
//! every option travels in the query string, so requests carry no headers
//! and no body.

use std::fmt;

use crate::error::Result;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// An HTTP request described as plain data.
///
/// `url` is the complete request target, query string and credential
/// included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
}

impl HttpRequest {
    /// The request target with the `access_token` value masked, for logs.
    /// The credential is the last pair, so the search runs from the end.
    pub fn redacted_url(&self) -> String {
        match self.url.rfind("access_token=") {
            Some(start) => {
                let value_start = start + "access_token=".len();
                let value_end = self.url[value_start..]
                    .find('&')
                    .map_or(self.url.len(), |offset| value_start + offset);
                format!("{}***{}", &self.url[..value_start], &self.url[value_end..])
            }
            None => self.url.clone(),
        }
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        is_success_status(self.status)
    }
}

/// Any 2xx status.
pub(crate) fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Executes an `HttpRequest` and hands back the raw response.
///
/// Implementations must return non-2xx responses as `Ok` data; only a
/// failure to obtain any response is an `Err` (`LmsError::Transport`).
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_url_masks_trailing_token() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: "https://lms.test/api/v1/courses/1?access_token=secret".to_string(),
        };
        assert_eq!(req.redacted_url(), "https://lms.test/api/v1/courses/1?access_token=***");
    }

    #[test]
    fn redacted_url_keeps_following_pairs() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: "https://lms.test/x?access_token=secret&per_page=1000".to_string(),
        };
        assert_eq!(req.redacted_url(), "https://lms.test/x?access_token=***&per_page=1000");
    }

    #[test]
    fn redacted_url_masks_credential_not_lookalike_value() {
        let req = HttpRequest {
            method: HttpMethod::Post,
            url: "https://lms.test/g?name=access_token=guess&access_token=secret".to_string(),
        };
        assert_eq!(req.redacted_url(), "https://lms.test/g?name=access_token=guess&access_token=***");
    }

    #[test]
    fn success_covers_2xx_only() {
        assert!(is_success_status(200));
        assert!(is_success_status(204));
        assert!(!is_success_status(199));
        assert!(!is_success_status(302));
    }

    #[test]
    fn method_displays_as_verb() {
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }
}
