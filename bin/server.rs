// Transaction Insights - Web Server
// REST API over the query layer with Axum

use anyhow::{Context, Result};
use dotenv::dotenv;
use log::info;
use transaction_insights::api::{router, AppState};
use transaction_insights::{Config, RecordSource, TransactionDataFetcher};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    println!("🌐 Transaction Insights - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = Config::from_env().context("Failed to read configuration")?;

    if !config.transactions_file.exists() {
        // Not fatal: every request will answer 503 until the file shows up
        eprintln!("⚠️  Transactions file not found at {:?}", config.transactions_file);
    }

    let fetcher = TransactionDataFetcher::from_config(&config);
    info!("Serving queries from {}", fetcher.source().describe());

    let app = router(AppState::new(fetcher, config.top_n));

    let listener = tokio::net::TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server_addr))?;

    println!("\n🚀 Server running on http://{}", config.server_addr);
    println!("   API: http://{}/api/report", config.server_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
