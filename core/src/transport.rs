//! Blocking `Transport` backed by `ureq`.
//!
//! Non-2xx statuses come back as data so the core decides what they mean.
//! No timeout is configured here; ureq's defaults apply.

use ureq::Agent;

use crate::error::{LmsError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder().http_status_as_error(false).build().new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = request.url.as_str();
        let result = match request.method {
            HttpMethod::Get => self.agent.get(url).call(),
            HttpMethod::Delete => self.agent.delete(url).call(),
            HttpMethod::Post => self.agent.post(url).send_empty(),
            HttpMethod::Put => self.agent.put(url).send_empty(),
        };
        let mut response = result.map_err(|e| LmsError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| LmsError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}
