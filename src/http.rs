use crate::{LookupError, Result};
use std::io::Read;
use std::time::Duration;
use url::Url;

pub type HeaderList = [(&'static str, String)];

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Blocking request seam. Status codes are reported, never raised as errors.
pub trait HttpTransport {
    fn get(&self, url: &str, headers: &HeaderList) -> Result<HttpResponse>;

    fn post(&self, url: &str, headers: &HeaderList, body: &[u8]) -> Result<HttpResponse>;
}

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            agent: build_http_agent(timeout_secs),
        }
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str, headers: &HeaderList) -> Result<HttpResponse> {
        let mut request = self.agent.get(url);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }
        let response = request.call().map_err(|e| network_error(url, e))?;
        read_response(url, response)
    }

    fn post(&self, url: &str, headers: &HeaderList, body: &[u8]) -> Result<HttpResponse> {
        let mut request = self.agent.post(url);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }
        let response = request.send(body).map_err(|e| network_error(url, e))?;
        read_response(url, response)
    }
}

fn build_http_agent(timeout_secs: u64) -> ureq::Agent {
    let mut config = ureq::Agent::config_builder();
    config = config
        .http_status_as_error(false)
        .timeout_global(Some(Duration::from_secs(timeout_secs.max(1))));
    config.build().into()
}

fn read_response(
    url: &str,
    mut response: ureq::http::Response<ureq::Body>,
) -> Result<HttpResponse> {
    let status = response.status().as_u16();
    let content_type = header_string(&response, "content-type");
    let mut body = Vec::new();
    response
        .body_mut()
        .as_reader()
        .read_to_end(&mut body)
        .map_err(|e| {
            LookupError::Network(format!(
                "failed to read body from {}: {e}",
                redact_url_for_log(url)
            ))
        })?;
    Ok(HttpResponse {
        status,
        content_type,
        body,
    })
}

fn network_error(url: &str, err: ureq::Error) -> LookupError {
    LookupError::Network(format!("{}: {err}", redact_url_for_log(url)))
}

fn header_string(response: &ureq::http::Response<ureq::Body>, key: &str) -> String {
    response
        .headers()
        .get(key)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase()
}

pub fn redact_url_for_log(value: &str) -> String {
    match Url::parse(value) {
        Ok(uri) => {
            let scheme = uri.scheme();
            let authority = uri.host_str().unwrap_or("unknown-host");
            format!("{scheme}://{authority}/...")
        }
        Err(_) => "[invalid-url]".to_string(),
    }
}
