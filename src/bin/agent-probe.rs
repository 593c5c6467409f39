use std::process::ExitCode;
use std::time::Duration;

use agent::health::HealthState;
use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "agent-probe")]
#[command(about = "Query a running agent's health endpoints", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(long, default_value = "/health")]
    liveness_path: String,

    #[arg(long, default_value = "/ready")]
    readiness_path: String,

    #[arg(short, long, default_value_t = 5)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the liveness endpoint
    Live,
    /// Query the readiness endpoint
    Ready,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cli.timeout_secs))
        .build()?;

    let path = match cli.command {
        Commands::Live => &cli.liveness_path,
        Commands::Ready => &cli.readiness_path,
    };
    let res = client
        .get(format!("{}{}", cli.url.trim_end_matches('/'), path))
        .send()
        .await?;

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let status = res.status();
    let body: Value = res.json().await.unwrap_or(Value::Null);

    let state = body
        .get("status")
        .cloned()
        .and_then(|s| serde_json::from_value::<HealthState>(s).ok())
        .unwrap_or(HealthState::Unhealthy);

    println!("{status} ({state})");
    if !body.is_null() {
        println!("{}", serde_json::to_string_pretty(&body)?);
    }

    if status.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
