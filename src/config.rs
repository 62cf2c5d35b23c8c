use std::env;
use std::fmt;
use std::time::Duration;

use crate::error::ReportError;

pub const EMAIL_VAR: &str = "CONFLUENCE_EMAIL";
pub const TOKEN_VAR: &str = "CONFLUENCE_API_TOKEN";

const WIKI_URL: &str = "https://overdare.atlassian.net/wiki";
const TEMPLATE_PAGE_ID: &str = "42008650";
// "QA Report" page that collects every generated report.
const PARENT_PAGE_ID: &str = "29698636";
const SPACE_KEY: &str = "NFTMetaverse";
const PLACEHOLDER: &str = "ovdr-6116";

/// Account used for basic auth against the Confluence REST API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub api_token: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ReportError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads both secrets through `lookup`. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ReportError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or(ReportError::Configuration(key))
        };
        Ok(Self {
            email: read(EMAIL_VAR)?,
            api_token: read(TOKEN_VAR)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Where reports come from and where they go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Wiki root without trailing slash; page links are appended to it.
    pub wiki_url: String,
    pub template_page_id: String,
    pub parent_page_id: String,
    pub space_key: String,
    /// Version string baked into the template's query.
    pub placeholder: String,
    pub fetch_timeout: Duration,
    pub create_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wiki_url: WIKI_URL.to_string(),
            template_page_id: TEMPLATE_PAGE_ID.to_string(),
            parent_page_id: PARENT_PAGE_ID.to_string(),
            space_key: SPACE_KEY.to_string(),
            placeholder: PLACEHOLDER.to_string(),
            fetch_timeout: Duration::from_secs(10),
            create_timeout: Duration::from_secs(15),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        let overrides: [(&str, &mut String); 5] = [
            ("CONFLUENCE_WIKI_URL", &mut settings.wiki_url),
            ("CONFLUENCE_TEMPLATE_PAGE_ID", &mut settings.template_page_id),
            ("CONFLUENCE_PARENT_PAGE_ID", &mut settings.parent_page_id),
            ("CONFLUENCE_SPACE_KEY", &mut settings.space_key),
            ("QA_REPORT_PLACEHOLDER", &mut settings.placeholder),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = value.trim().to_string();
            }
        }
        settings.wiki_url = settings.wiki_url.trim_end_matches('/').to_string();
        settings
    }

    pub fn api_base(&self) -> String {
        format!("{}/rest/api", self.wiki_url)
    }
}
