use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "product-cli")]
#[command(about = "Client for ServiceA's product and admin endpoints", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a product through ServiceA
    Product { id: i32 },
    /// Show version and active policy
    Status,
    /// Show circuit breaker state
    Breaker,
    /// Hold the circuit open until reset
    Isolate,
    /// Close the circuit and clear samples
    Reset,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Product { id } => {
            client.get(format!("{}/api/products/{}", cli.url, id)).send().await?
        }
        Commands::Status => {
            client.get(format!("{}/admin/status", cli.url)).headers(headers).send().await?
        }
        Commands::Breaker => {
            client.get(format!("{}/admin/breaker", cli.url)).headers(headers).send().await?
        }
        Commands::Isolate => {
            client.post(format!("{}/admin/breaker/isolate", cli.url)).headers(headers).send().await?
        }
        Commands::Reset => {
            client.post(format!("{}/admin/breaker/reset", cli.url)).headers(headers).send().await?
        }
    };
    print_response(res).await?;

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: ServiceA returned status {}", status);
        if let Some(retry_after) = res.headers().get("retry-after").and_then(|v| v.to_str().ok()) {
            eprintln!("Retry after: {}s", retry_after);
        }
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
