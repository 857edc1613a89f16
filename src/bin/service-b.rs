//! ServiceB: the downstream product endpoint.

use axum::http::StatusCode;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use product_gateway::catalog::{catalog_router, CatalogOptions};
use product_gateway::lifecycle::wait_for_signal;

#[derive(Parser)]
#[command(name = "service-b")]
#[command(about = "Downstream product service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "127.0.0.1:7192")]
    bind: String,

    /// Fraction of requests answered with --failure-status (0.0 - 1.0).
    #[arg(long, default_value_t = 0.0)]
    failure_ratio: f64,

    #[arg(long, default_value_t = 503)]
    failure_status: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "service_b=info,product_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    if !(0.0..=1.0).contains(&cli.failure_ratio) {
        return Err(format!("--failure-ratio must be within [0, 1], got {}", cli.failure_ratio).into());
    }
    let options = CatalogOptions {
        failure_ratio: cli.failure_ratio,
        failure_status: StatusCode::from_u16(cli.failure_status)?,
    };

    let listener = TcpListener::bind(&cli.bind).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        failure_ratio = options.failure_ratio,
        "service-b listening"
    );

    axum::serve(listener, catalog_router(options))
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    tracing::info!("service-b stopped");
    Ok(())
}
