//! Blocking `Transport` backed by a ureq agent.

use ureq::typestate::WithBody;
use ureq::{Agent, RequestBuilder};

use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};

/// Executes `HttpRequest`s with ureq.
///
/// The agent is configured with `http_status_as_error(false)` so 4xx/5xx
/// responses come back as data and the client decides what they mean.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a preconfigured agent. It must not treat HTTP statuses as errors.
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let headers = request.headers.as_slice();
        let body = request.body.as_deref();

        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), headers).call(),
            HttpMethod::Options => with_headers(self.agent.options(url), headers).call(),
            HttpMethod::Delete => {
                let builder = with_headers(self.agent.delete(url), headers);
                match body {
                    Some(body) => builder.force_send_body().send(body),
                    None => builder.call(),
                }
            }
            HttpMethod::Post => send(with_headers(self.agent.post(url), headers), body),
            HttpMethod::Put => send(with_headers(self.agent.put(url), headers), body),
            HttpMethod::Patch => send(with_headers(self.agent.patch(url), headers), body),
        };
        let mut response = result?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_vec()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: RequestBuilder<B>,
    headers: &[(String, String)],
) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send(
    builder: RequestBuilder<WithBody>,
    body: Option<&[u8]>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body),
        None => builder.send_empty(),
    }
}
