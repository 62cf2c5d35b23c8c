use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::common::Reply;
use crate::config::Settings;
use crate::confluence::{ConfluenceApi, NewPage};
use crate::error::ReportError;

/// Body of a report creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub affected_version: String,
    pub page_title: Option<String>,
}

impl ReportRequest {
    pub fn new(affected_version: impl Into<String>, page_title: Option<String>) -> Result<Self, ReportError> {
        let affected_version = affected_version.into();
        if affected_version.is_empty() {
            return Err(ReportError::MissingVersion);
        }
        Ok(Self {
            affected_version,
            page_title,
        })
    }

    /// Parses a JSON request body.
    ///
    /// Bad JSON is a [`ReportError::MalformedRequest`] and a `null` body is
    /// [`ReportError::Other`]. Any other JSON value without a usable
    /// `affectedVersion` (absent, null, false, 0, empty, or not a string or
    /// number) is [`ReportError::MissingVersion`]. Numbers are taken as their
    /// JSON text. A `pageTitle` that is not a string is ignored.
    pub fn parse(body: &[u8]) -> Result<Self, ReportError> {
        let value: Value = serde_json::from_slice(body)?;
        if value.is_null() {
            return Err(ReportError::Other("request body must not be null".to_string()));
        }
        let version = match value.get("affectedVersion") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
            _ => return Err(ReportError::MissingVersion),
        };
        let title = value
            .get("pageTitle")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self::new(version, title)
    }

    pub fn title(&self) -> String {
        match self.page_title.as_deref() {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!("{} Report", self.affected_version),
        }
    }
}

/// Returned to the caller once the page exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOutcome {
    pub success: bool,
    pub page_url: String,
    pub page_title: String,
    pub page_id: String,
}

/// Replaces every literal occurrence of `placeholder` in `template`.
pub fn substitute_version(template: &str, placeholder: &str, version: &str) -> String {
    if placeholder.is_empty() {
        return template.to_string();
    }
    template.replace(placeholder, version)
}

/// Clones the template page into a new report page.
pub async fn create_report<A>(api: &A, settings: &Settings, request: &ReportRequest) -> Result<ReportOutcome, ReportError>
where
    A: ConfluenceApi,
{
    info!(page_id = %settings.template_page_id, "Fetching template page");
    let template = api.fetch_storage_body(&settings.template_page_id).await?;
    info!("Template page fetched");

    let body = substitute_version(&template, &settings.placeholder, &request.affected_version);
    info!("JQL updated: {} -> {}", settings.placeholder, request.affected_version);

    let title = request.title();
    info!(title = %title, "Creating page");
    let created = api.create_page(&NewPage::new(title.clone(), settings, body)).await?;

    let page_url = format!("{}{}", settings.wiki_url, created.links.webui);
    info!(url = %page_url, "Page created");
    Ok(ReportOutcome {
        success: true,
        page_url,
        page_title: title,
        page_id: created.id,
    })
}

/// Full request handling: method dispatch, validation, then the pipeline.
///
/// `connect` is only called once the body is valid, so a missing credential
/// never leads to an outbound call.
pub async fn handle<A, F>(method: &str, body: &[u8], settings: &Settings, connect: F) -> Reply
where
    A: ConfluenceApi,
    F: FnOnce() -> Result<A, ReportError>,
{
    info!(method, "Function called");
    match method {
        "OPTIONS" => return Reply::empty(200),
        "POST" => {}
        _ => return Reply::json(405, json!({ "error": "Method not allowed" })),
    }

    let result = async {
        let request = ReportRequest::parse(body)?;
        info!(affected_version = %request.affected_version, page_title = ?request.page_title, "Request data");
        let api = connect()?;
        let outcome = create_report(&api, settings, &request).await?;
        serde_json::to_value(&outcome).map_err(|e| ReportError::Other(e.to_string()))
    }
    .await;

    match result {
        Ok(value) => Reply::json(200, value),
        Err(err) => {
            match &err {
                ReportError::Configuration(var) => error!(missing = *var, "Missing environment variable"),
                _ => error!(error = %err, "Error creating QA Report"),
            }
            Reply::json(err.status(), err.to_json())
        }
    }
}
