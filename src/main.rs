//! `rq`: send a single HTTP request from the command line.
//!
//! ```text
//! rq -H 'Accept: application/json' -q page=2 --retries 5 GET http://localhost:8080/items
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use serde_json::Value;

use rq_client::config::{load_config, ClientConfig};
use rq_client::lifecycle::{signals, Shutdown};
use rq_client::{middleware, observability, validation, Client, Request, Response};

#[derive(Parser, Debug)]
#[command(name = "rq")]
#[command(about = "Send an HTTP request with retries and validation", long_about = None)]
struct Cli {
    /// HTTP method (GET, POST, ...)
    method: String,

    /// Target URL
    url: String,

    /// Header as `name:value` (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Query parameter as `key=value` (repeatable)
    #[arg(short = 'q', long = "query", value_parser = parse_query)]
    query: Vec<(String, String)>,

    /// Raw request body
    #[arg(short = 'd', long = "data", conflicts_with = "json")]
    data: Option<String>,

    /// JSON request body; sets `Content-Type: application/json`
    #[arg(long)]
    json: Option<String>,

    /// Per-attempt timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Total attempts, the first one included
    #[arg(long)]
    retries: Option<u32>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dump the raw exchange to the log
    #[arg(long)]
    dump: bool,

    /// Fail unless the final status equals this code
    #[arg(long = "expect-status")]
    expect_status: Option<u16>,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected name:value, got {raw:?}"))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn parse_query(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::from(2);
            }
        },
        None => ClientConfig::default(),
    };

    observability::init(&config.observability);

    let client = match Client::from_config(&config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };

    let mut policy = client.retry_policy().clone();
    if let Some(retries) = cli.retries {
        policy = policy.with_max_attempts(retries);
    }

    let shutdown = Shutdown::new();
    let listener = signals::spawn_listener(shutdown.clone());

    let request = build_request(&client, &cli);
    let response = request.send_with_retry(&shutdown.token(), &policy).await;

    shutdown.trigger();
    let _ = listener.await;

    match print_response(&response) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn build_request(client: &Client, cli: &Cli) -> Request {
    let mut request = client
        .get(&cli.url)
        .method(cli.method.to_ascii_uppercase())
        .with(&middleware::request_id())
        .with(&middleware::logging());

    for (name, value) in &cli.headers {
        request = request.header(name, value);
    }
    for (key, value) in &cli.query {
        request = request.query_param(key, value);
    }

    if let Some(data) = &cli.data {
        request = request.body_string(data.clone());
    }
    if let Some(json) = &cli.json {
        request = match serde_json::from_str::<Value>(json) {
            Ok(value) => request.body_json(&value),
            Err(e) => request.poison(rq_client::Error::Builder(format!("invalid --json body: {e}"))),
        };
    }

    if let Some(secs) = cli.timeout {
        request = request.timeout(Duration::from_secs(secs));
    }
    if cli.dump {
        request = request.with(&middleware::dump());
    }
    if let Some(code) = cli.expect_status {
        request = request.validate([validation::status_code(code)]);
    }

    request
}

fn print_response(response: &Response) -> Result<(), rq_client::Error> {
    if let Some(status) = response.status() {
        println!("{} ({} attempt(s))", status, response.attempts());
    }
    if let Some(err) = response.error() {
        return Err(err.clone());
    }

    let body = response.bytes()?;
    match serde_json::from_slice::<Value>(&body) {
        Ok(json) => {
            let pretty = serde_json::to_string_pretty(&json)
                .map_err(|e| rq_client::Error::Decode(e.to_string()))?;
            println!("{pretty}");
        }
        Err(_) if !body.is_empty() => println!("{}", String::from_utf8_lossy(&body)),
        Err(_) => {}
    }
    Ok(())
}
