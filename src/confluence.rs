use std::future::Future;

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::config::{Credentials, Settings};
use crate::error::ReportError;

/// The two Confluence operations a report needs.
pub trait ConfluenceApi {
    /// Returns the storage-format body of a page.
    fn fetch_storage_body(&self, page_id: &str) -> impl Future<Output = Result<String, ReportError>> + Send;

    fn create_page(&self, page: &NewPage) -> impl Future<Output = Result<CreatedPage, ReportError>> + Send;
}

/// Payload for `POST /rest/api/content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPage {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub space: SpaceRef,
    pub parent: ParentRef,
    pub body: PageBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceRef {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageBody {
    pub storage: Storage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    pub value: String,
    #[serde(default)]
    pub representation: String,
}

impl NewPage {
    pub fn new(title: String, settings: &Settings, storage_value: String) -> Self {
        Self {
            kind: "page".to_string(),
            title,
            space: SpaceRef {
                key: settings.space_key.clone(),
            },
            parent: ParentRef {
                id: settings.parent_page_id.clone(),
            },
            body: PageBody {
                storage: Storage {
                    value: storage_value,
                    representation: "storage".to_string(),
                },
            },
        }
    }
}

/// The parts of a create response we care about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedPage {
    pub id: String,
    #[serde(rename = "_links")]
    pub links: PageLinks,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageLinks {
    /// Path of the page relative to the wiki root, e.g. `/spaces/X/pages/99`.
    pub webui: String,
}

#[derive(Deserialize)]
struct Content {
    body: PageBody,
}

pub struct ConfluenceClient {
    credentials: Credentials,
    settings: Settings,
    http: Client,
}

impl ConfluenceClient {
    pub fn new(credentials: Credentials, settings: Settings) -> Result<Self, ReportError> {
        let http = Client::builder()
            .user_agent(concat!("qa-report-vercel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReportError::Other(e.to_string()))?;
        Ok(Self {
            credentials,
            settings,
            http,
        })
    }

    async fn check(resp: Response) -> Result<Response, ReportError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) if e.is_timeout() => return Err(network(e)),
            Err(_) => String::new(),
        };
        error!(status = status.as_u16(), body = %text, "Confluence API error response");
        Err(ReportError::from_upstream(
            status.as_u16(),
            status.canonical_reason(),
            &text,
        ))
    }
}

fn network(e: reqwest::Error) -> ReportError {
    error!(error = %e, "Network error talking to Confluence");
    ReportError::Network(e.to_string())
}

/// A timeout while the body is still streaming is a transport failure,
/// anything else means the payload had the wrong shape.
fn decode(what: &str, e: reqwest::Error) -> ReportError {
    if e.is_timeout() {
        return network(e);
    }
    ReportError::Other(format!("unexpected {} response: {}", what, e))
}

impl ConfluenceApi for ConfluenceClient {
    async fn fetch_storage_body(&self, page_id: &str) -> Result<String, ReportError> {
        let url = format!("{}/content/{}", self.settings.api_base(), page_id);
        let resp = self
            .http
            .get(url)
            .query(&[("expand", "body.storage")])
            .basic_auth(&self.credentials.email, Some(&self.credentials.api_token))
            .header("Accept", "application/json")
            .header("X-Atlassian-Token", "no-check")
            .timeout(self.settings.fetch_timeout)
            .send()
            .await
            .map_err(network)?;
        let content: Content = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| decode("template", e))?;
        Ok(content.body.storage.value)
    }

    async fn create_page(&self, page: &NewPage) -> Result<CreatedPage, ReportError> {
        let url = format!("{}/content", self.settings.api_base());
        let resp = self
            .http
            .post(url)
            .basic_auth(&self.credentials.email, Some(&self.credentials.api_token))
            .header("X-Atlassian-Token", "no-check")
            .json(page)
            .timeout(self.settings.create_timeout)
            .send()
            .await
            .map_err(network)?;
        Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| decode("create", e))
    }
}
