//! Blocking HTTP transport backed by `ureq`

use cheevos_net::{HttpRequest, HttpResponse, Transport};
use std::io::Read;
use std::time::Duration;

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(30))
            .user_agent(user_agent)
            .build();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> HttpResponse {
        let result = match &request.post_data {
            Some(body) => self
                .agent
                .post(&request.url)
                .set("Content-Type", "application/x-www-form-urlencoded")
                .send_string(body),
            None => self.agent.get(&request.url).call(),
        };

        match result {
            Ok(response) => read_response(response),
            // Error statuses still carry a body worth reporting
            Err(ureq::Error::Status(_, response)) => read_response(response),
            Err(e) => {
                tracing::warn!("HTTP transfer failed: {}", e);
                HttpResponse::transport_error()
            }
        }
    }
}

fn read_response(response: ureq::Response) -> HttpResponse {
    let status = i32::from(response.status());
    let mut body = Vec::new();
    if let Err(e) = response.into_reader().read_to_end(&mut body) {
        tracing::warn!("Failed to read response body: {}", e);
        return HttpResponse::transport_error();
    }
    HttpResponse { status, body }
}
