use crate::http::{redact_url_for_log, HttpTransport};
use crate::models::Candidate;
use crate::probe::{format_extension, probe_bytes};
use crate::{LookupError, Result};

/// Downloads a candidate and replaces its claimed size with what the bytes decode to.
pub struct CandidateFetcher<'a> {
    transport: &'a dyn HttpTransport,
}

impl<'a> CandidateFetcher<'a> {
    pub fn new(transport: &'a dyn HttpTransport) -> Self {
        Self { transport }
    }

    pub fn fetch(&self, candidate: &Candidate) -> Result<Candidate> {
        let response = self
            .transport
            .get(&candidate.url, &[])
            .map_err(|e| LookupError::Fetch {
                url: redact_url_for_log(&candidate.url),
                reason: e.to_string(),
            })?;
        if response.status >= 400 {
            return Err(LookupError::Fetch {
                url: redact_url_for_log(&candidate.url),
                reason: format!("status {}", response.status),
            });
        }
        if response.body.is_empty() {
            return Err(LookupError::Fetch {
                url: redact_url_for_log(&candidate.url),
                reason: "empty body".to_string(),
            });
        }

        let (format, dimensions) = probe_bytes(&response.body)?;
        let mut fetched = candidate.clone();
        fetched.set_fetched(response.body, format_extension(format), dimensions);
        Ok(fetched)
    }
}
