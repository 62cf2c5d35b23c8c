use qa_report_vercel::config::{Credentials, Settings};
use qa_report_vercel::confluence::ConfluenceClient;
use qa_report_vercel::report::{create_report, ReportRequest};
use std::env;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

// Creates a report page from the terminal: report <affectedVersion> [pageTitle]
#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let version = args.next().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "usage: report <affectedVersion> [pageTitle]")
    })?;
    let title = args.next();

    let settings = Settings::from_env();
    let result = async {
        let request = ReportRequest::new(version, title)?;
        let client = ConfluenceClient::new(Credentials::from_env()?, settings.clone())?;
        create_report(&client, &settings, &request).await
    }
    .await;

    match result {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{}", serde_json::to_string_pretty(&err.to_json())?);
            Ok(ExitCode::FAILURE)
        }
    }
}
