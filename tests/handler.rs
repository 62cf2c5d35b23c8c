use std::sync::{Arc, Mutex};

use qa_report_vercel::common::Reply;
use qa_report_vercel::config::{Credentials, Settings};
use qa_report_vercel::confluence::{ConfluenceApi, CreatedPage, NewPage, PageLinks};
use qa_report_vercel::error::ReportError;
use qa_report_vercel::report::handle;
use serde_json::json;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Fetch(String),
    Create(NewPage),
}

#[derive(Clone)]
enum Outcome<T> {
    Ok(T),
    Status(u16, &'static str),
    Network,
}

/// In-memory Confluence that records every call it receives.
#[derive(Clone)]
struct FakeConfluence {
    calls: Arc<Mutex<Vec<Call>>>,
    template: Outcome<String>,
    created: Outcome<CreatedPage>,
}

impl FakeConfluence {
    fn new(template: &str) -> Self {
        Self {
            calls: Arc::default(),
            template: Outcome::Ok(template.to_string()),
            created: Outcome::Ok(CreatedPage {
                id: "99".into(),
                links: PageLinks {
                    webui: "/spaces/X/pages/99".into(),
                },
            }),
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn created_pages(&self) -> Vec<NewPage> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create(page) => Some(page),
                Call::Fetch(_) => None,
            })
            .collect()
    }
}

fn resolve<T: Clone>(outcome: &Outcome<T>) -> Result<T, ReportError> {
    match outcome {
        Outcome::Ok(value) => Ok(value.clone()),
        Outcome::Status(status, text) => Err(ReportError::from_upstream(*status, None, text)),
        Outcome::Network => Err(ReportError::Network("operation timed out".into())),
    }
}

impl ConfluenceApi for FakeConfluence {
    async fn fetch_storage_body(&self, page_id: &str) -> Result<String, ReportError> {
        self.calls.lock().unwrap().push(Call::Fetch(page_id.to_string()));
        resolve(&self.template)
    }

    async fn create_page(&self, page: &NewPage) -> Result<CreatedPage, ReportError> {
        self.calls.lock().unwrap().push(Call::Create(page.clone()));
        resolve(&self.created)
    }
}

async fn post(fake: &FakeConfluence, body: &str) -> Reply {
    let fake = fake.clone();
    handle("POST", body.as_bytes(), &Settings::default(), move || Ok(fake)).await
}

const TEMPLATE: &str = r#"<ac:structured-macro ac:name="jira"><ac:parameter ac:name="jqlQuery">affectedVersion = ovdr-6116</ac:parameter></ac:structured-macro><p>ovdr-6116 / ovdr-6116</p>"#;

#[tokio::test]
async fn options_is_empty_200() {
    let fake = FakeConfluence::new(TEMPLATE);
    let f = fake.clone();
    let reply = handle("OPTIONS", b"garbage", &Settings::default(), move || Ok(f)).await;
    assert_eq!(reply, Reply::empty(200));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn other_methods_are_405() {
    for method in ["GET", "PUT", "DELETE", "PATCH"] {
        let fake = FakeConfluence::new(TEMPLATE);
        let f = fake.clone();
        let reply = handle(method, br#"{"affectedVersion":"1.0"}"#, &Settings::default(), move || Ok(f)).await;
        assert_eq!(reply, Reply::json(405, json!({ "error": "Method not allowed" })));
        assert!(fake.calls().is_empty());
    }
}

#[tokio::test]
async fn missing_version_is_400() {
    let bodies = [
        r#"{}"#,
        r#"{"affectedVersion":""}"#,
        r#"{"affectedVersion":null}"#,
        r#"{"affectedVersion":false}"#,
        r#"[]"#,
        r#""x""#,
    ];
    for body in bodies {
        let fake = FakeConfluence::new(TEMPLATE);
        let reply = post(&fake, body).await;
        assert_eq!(reply, Reply::json(400, json!({ "error": "AffectedVersion is required" })));
        assert!(fake.calls().is_empty());
    }
}

#[tokio::test]
async fn malformed_json_is_500() {
    let fake = FakeConfluence::new(TEMPLATE);
    let reply = post(&fake, "{affectedVersion:").await;
    assert_eq!(reply.status, 500);
    let body = reply.body.unwrap();
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn null_body_is_500() {
    let fake = FakeConfluence::new(TEMPLATE);
    let reply = post(&fake, "null").await;
    assert_eq!(reply.status, 500);
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn missing_credentials_make_no_calls() {
    let fake = FakeConfluence::new(TEMPLATE);
    let f = fake.clone();
    let reply = handle("POST", br#"{"affectedVersion":"1.2.3"}"#, &Settings::default(), move || {
        Credentials::from_lookup(|_| None).map(|_| f)
    })
    .await;
    assert_eq!(reply, Reply::json(500, json!({ "error": "Server configuration error" })));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn creates_page_from_template() {
    let fake = FakeConfluence::new(TEMPLATE);
    let reply = post(&fake, r#"{"affectedVersion":"1.2.3"}"#).await;

    assert_eq!(
        reply,
        Reply::json(
            200,
            json!({
                "success": true,
                "pageUrl": "https://overdare.atlassian.net/wiki/spaces/X/pages/99",
                "pageTitle": "1.2.3 Report",
                "pageId": "99"
            })
        )
    );

    let calls = fake.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], Call::Fetch("42008650".into()));

    let pages = fake.created_pages();
    assert_eq!(pages.len(), 1);
    let page = &pages[0];
    assert_eq!(page.kind, "page");
    assert_eq!(page.title, "1.2.3 Report");
    assert_eq!(page.space.key, "NFTMetaverse");
    assert_eq!(page.parent.id, "29698636");
    assert_eq!(page.body.storage.representation, "storage");
    assert_eq!(page.body.storage.value.matches("1.2.3").count(), 3);
    assert!(!page.body.storage.value.contains("ovdr-6116"));
}

#[tokio::test]
async fn explicit_title_is_used() {
    let fake = FakeConfluence::new(TEMPLATE);
    let reply = post(&fake, r#"{"affectedVersion":"ovdr-7000","pageTitle":"Sprint 42 QA"}"#).await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body.unwrap()["pageTitle"], "Sprint 42 QA");
    assert_eq!(fake.created_pages()[0].title, "Sprint 42 QA");
}

#[tokio::test]
async fn fetch_network_error_skips_create() {
    let mut fake = FakeConfluence::new(TEMPLATE);
    fake.template = Outcome::Network;
    let reply = post(&fake, r#"{"affectedVersion":"1.2.3"}"#).await;
    assert_eq!(
        reply,
        Reply::json(
            500,
            json!({ "error": "Network error - unable to connect to Confluence", "details": "operation timed out" })
        )
    );
    assert_eq!(fake.calls(), vec![Call::Fetch("42008650".into())]);
}

#[tokio::test]
async fn fetch_upstream_error_skips_create() {
    let mut fake = FakeConfluence::new(TEMPLATE);
    fake.template = Outcome::Status(404, r#"{"statusCode":404,"message":"No content found with id: 42008650"}"#);
    let reply = post(&fake, r#"{"affectedVersion":"1.2.3"}"#).await;
    assert_eq!(reply.status, 404);
    assert_eq!(reply.body.unwrap()["error"], "No content found with id: 42008650");
    assert!(fake.created_pages().is_empty());
}

#[tokio::test]
async fn create_forbidden_passes_status_through() {
    let mut fake = FakeConfluence::new(TEMPLATE);
    fake.created = Outcome::Status(403, r#"{"message":"Forbidden"}"#);
    let reply = post(&fake, r#"{"affectedVersion":"1.2.3"}"#).await;
    assert_eq!(
        reply,
        Reply::json(403, json!({ "error": "Forbidden", "details": { "message": "Forbidden" } }))
    );
    assert_eq!(fake.created_pages().len(), 1);
}
