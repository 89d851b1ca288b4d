use anyhow::Result;
use clap::{Parser, Subcommand};
use reqwest::{Client, Response};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "multibrainctl")]
#[command(about = "CLI for the multibrain analysis service")]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:9100")]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Health,

    Analyze {
        request: String,

        #[arg(long)]
        correlation_id: Option<String>,
    },

    #[command(subcommand)]
    Runs(RunCommands),

    #[command(subcommand)]
    Metrics(MetricsCommands),
}

#[derive(Subcommand)]
enum RunCommands {
    List,
    Cancel { correlation_id: String },
    Messages { correlation_id: String },
}

#[derive(Subcommand)]
enum MetricsCommands {
    Show,
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = cli.addr;

    match cli.command {
        Commands::Health => {
            print_json(client.get(format!("{}/health", base_url)).send().await?).await?;
        }
        Commands::Analyze {
            request,
            correlation_id,
        } => {
            let body = serde_json::json!({
                "request": request,
                "correlation_id": correlation_id,
            });
            let resp = client
                .post(format!("{}/analyses", base_url))
                .json(&body)
                .send()
                .await?;
            if !resp.status().is_success() {
                eprintln!("Analysis failed with status {}", resp.status());
            }
            print_json(resp).await?;
        }
        Commands::Runs(cmd) => match cmd {
            RunCommands::List => {
                print_json(client.get(format!("{}/runs", base_url)).send().await?).await?;
            }
            RunCommands::Cancel { correlation_id } => {
                let resp = client
                    .delete(format!("{}/runs/{}", base_url, correlation_id))
                    .send()
                    .await?;
                if resp.status().is_success() {
                    println!("Cancelled {}", correlation_id);
                } else {
                    anyhow::bail!("No active run {} ({})", correlation_id, resp.status());
                }
            }
            RunCommands::Messages { correlation_id } => {
                print_json(
                    client
                        .get(format!("{}/runs/{}/messages", base_url, correlation_id))
                        .send()
                        .await?,
                )
                .await?;
            }
        },
        Commands::Metrics(cmd) => match cmd {
            MetricsCommands::Show => {
                print_json(client.get(format!("{}/metrics", base_url)).send().await?).await?;
            }
            MetricsCommands::Reset => {
                client
                    .post(format!("{}/metrics/reset", base_url))
                    .send()
                    .await?
                    .error_for_status()?;
                println!("Metrics reset");
            }
        },
    }

    Ok(())
}

async fn print_json(resp: Response) -> Result<()> {
    let value: Value = resp.json().await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
