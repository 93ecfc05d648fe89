//! Curated Newsletter — Binary Entrypoint
//! Boots the Axum HTTP shell; the pipeline itself lives in the library.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("curated_newsletter=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let addr =
        std::env::var("NEWSLETTER_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let router = curated_newsletter::api::create_router();

    tracing::info!(%addr, "newsletter shell listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
