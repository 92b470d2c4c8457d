use anyhow::{Context, Result, bail};
use chrono::TimeDelta;
use clap::Parser;
use http::{
    HeaderMap, HeaderValue,
    header::{ACCEPT, AUTHORIZATION},
};
use invoice_client::{
    InvoiceApi, RetryableOption, SearchRequest, new_retryable, with_default_headers, with_timeout,
};
use reqwest::Url;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Invoice search endpoint, e.g. https://api.example.com/v1/invoices
    #[clap(env = "INVOICE_API_URL")]
    url: Url,

    #[clap(env = "INVOICE_API_TOKEN", hide_env_values = true)]
    token: String,

    /// Page size, 0 uses the API default of 30
    #[arg(short, long, default_value_t = 0)]
    limit: i64,

    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    offset: i64,

    /// Extra search filter, repeatable
    #[arg(short, long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
    filters: Vec<(String, String)>,

    /// Retries on top of the first attempt
    #[arg(short, long, default_value_t = 3)]
    retries: u32,

    /// Per-request timeout, 0 disables it, negative keeps the default
    #[arg(short, long, default_value_t = 10, allow_negative_numbers = true)]
    timeout_secs: i64,
}

fn parse_filter(raw: &str) -> Result<(String, String)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected KEY=VALUE, got `{raw}`");
    };

    if key.trim().is_empty() {
        bail!("filter key is empty in `{raw}`");
    }

    Ok((key.trim().to_string(), value.to_string()))
}

#[tokio::main]
pub async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let timeout = TimeDelta::try_seconds(args.timeout_secs).context("timeout out of range")?;

    let client = new_retryable(
        args.retries,
        [
            RetryableOption::from(with_timeout(timeout)),
            with_default_headers(api_headers(&args.token)?).into(),
        ],
    )
    .context("failed to build http client")?;

    let api = InvoiceApi::new(client, args.url.clone());

    let mut request = SearchRequest::new(args.limit, args.offset);
    request.filters.extend(args.filters);

    let invoices: Value = api
        .search(&mut request)
        .await
        .with_context(|| format!("failed to search invoices at {}", api.endpoint()))?;

    tracing::info!(
        limit = request.limit,
        offset = request.offset,
        "retrieved invoices"
    );

    println!("{}", serde_json::to_string_pretty(&invoices)?);

    Ok(())
}

fn api_headers(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
        .context("token is not a valid header value")?;
    auth_value.set_sensitive(true);

    headers.insert(AUTHORIZATION, auth_value);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Ok(headers)
}
