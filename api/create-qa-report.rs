use qa_report_vercel::common::{body_bytes, Reply};
use qa_report_vercel::config::{Credentials, Settings};
use qa_report_vercel::confluence::ConfluenceClient;
use qa_report_vercel::report::handle;
use tracing_subscriber::EnvFilter;
use vercel_runtime::{run, Body, Error, Request, Response};

async fn handler(req: Request) -> Result<Response<Body>, Error> {
    let settings = Settings::from_env();
    let method = req.method().as_str().to_string();
    let reply: Reply = handle(&method, body_bytes(&req), &settings, || {
        let credentials = Credentials::from_env()?;
        tracing::info!(email = %credentials.email, "Using Confluence account");
        ConfluenceClient::new(credentials, settings.clone())
    })
    .await;
    reply.into_response()
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .without_time()
        .init();

    run(handler).await
}
