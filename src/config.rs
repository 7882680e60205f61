use crate::{LookupError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

pub const DEFAULT_UPLOAD_URL: &str = "https://images.google.com/searchbyimage/upload";
pub const DEFAULT_SEARCH_ORIGIN: &str = "https://images.google.com/";
pub const DEFAULT_RESULT_ORIGIN: &str = "https://google.com";
pub const DEFAULT_LANGUAGE: &str = "ko";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/101.0.4951.54 Safari/537.36";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CAPTCHA_MARKER: &str = "captcha";
pub const DEFAULT_LARGE_SIZE_MARKER: &str = ",isz:l";
const MAX_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub upload_url: String,
    /// Sent as both `origin` and `referer`.
    pub search_origin: String,
    /// Prefix for the relative large-image listing link found in the upload response.
    pub result_origin: String,
    /// Value of the `hl` form field.
    pub language: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Copy the original when no large result exists instead of skipping the file.
    pub fallback_copy: bool,
    pub captcha_marker: String,
    pub large_size_marker: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            search_origin: DEFAULT_SEARCH_ORIGIN.to_string(),
            result_origin: DEFAULT_RESULT_ORIGIN.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            fallback_copy: true,
            captcha_marker: DEFAULT_CAPTCHA_MARKER.to_string(),
            large_size_marker: DEFAULT_LARGE_SIZE_MARKER.to_string(),
        }
    }
}

impl LookupConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("upload_url", &self.upload_url),
            ("search_origin", &self.search_origin),
            ("result_origin", &self.result_origin),
        ] {
            let parsed = Url::parse(value.trim())
                .map_err(|e| LookupError::InvalidConfig(format!("{name} is not a url: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(LookupError::InvalidConfig(format!(
                    "{name} must be http(s), got {}",
                    parsed.scheme()
                )));
            }
        }
        if self.user_agent.trim().is_empty() {
            return Err(LookupError::InvalidConfig(
                "user_agent must not be empty".to_string(),
            ));
        }
        if self.captcha_marker.is_empty() || self.large_size_marker.is_empty() {
            return Err(LookupError::InvalidConfig(
                "captcha_marker and large_size_marker must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout_secs_clamped(&self) -> u64 {
        self.timeout_secs.clamp(1, MAX_TIMEOUT_SECS)
    }

    pub fn http_profile(&self) -> HttpProfile {
        HttpProfile {
            origin: self.search_origin.trim().to_string(),
            referer: self.search_origin.trim().to_string(),
            user_agent: self.user_agent.trim().to_string(),
        }
    }
}

/// Browser-like header set shared read-only by every request to the search service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpProfile {
    pub origin: String,
    pub referer: String,
    pub user_agent: String,
}

impl HttpProfile {
    pub fn browser_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("origin", self.origin.clone()),
            ("referer", self.referer.clone()),
            ("user-agent", self.user_agent.clone()),
        ]
    }
}

pub fn load_config(path: &Path) -> Result<LookupConfig> {
    if !path.exists() {
        return Ok(LookupConfig::default());
    }
    let bytes = std::fs::read(path)?;
    let parsed: LookupConfig = serde_json::from_slice(&bytes).map_err(|e| {
        LookupError::InvalidConfig(format!(
            "failed to parse lookup config at {}: {e}",
            path.to_string_lossy()
        ))
    })?;
    parsed.validate()?;
    Ok(parsed)
}

pub fn save_config(path: &Path, config: &LookupConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}
