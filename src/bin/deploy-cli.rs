use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "deploy-cli")]
#[command(about = "Management CLI for the configuration deployment service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8090")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status and the latest live validation
    Status,
    /// Print the live configuration documents
    Export,
    /// Validate and deploy a bundle file ({"config": {...}, "env": {...}})
    Import {
        /// JSON bundle file
        bundle: PathBuf,
    },
    /// Validate the live store, or another directory
    Validate {
        /// Directory to validate (relative paths resolve on the server)
        #[arg(short, long)]
        dir: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = match cli.command {
        Commands::Status => {
            client.get(format!("{}/api/status", cli.url))
                .send()
                .await?
        }
        Commands::Export => {
            client.get(format!("{}/api/config", cli.url))
                .send()
                .await?
        }
        Commands::Import { bundle } => {
            let body: Value = serde_json::from_str(&std::fs::read_to_string(&bundle)?)?;
            client.post(format!("{}/api/config/import", cli.url))
                .json(&body)
                .send()
                .await?
        }
        Commands::Validate { dir } => {
            client.post(format!("{}/api/config/validate", cli.url))
                .json(&json!({ "dir": dir }))
                .send()
                .await?
        }
    };

    let ok = print_response(res).await?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Print the response body; returns whether the service reported success.
async fn print_response(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    let json: Value = match serde_json::from_str(&text) {
        Ok(json) => json,
        Err(_) => {
            eprintln!("Error: service returned status {}", status);
            eprintln!("Response: {}", text);
            return Ok(false);
        }
    };

    println!("{}", serde_json::to_string_pretty(&json)?);
    let ok = json.get("ok").and_then(Value::as_bool).unwrap_or(status.is_success());
    Ok(status.is_success() && ok)
}
