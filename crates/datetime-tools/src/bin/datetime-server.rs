//! Date/time tool provider on stdio
//!
//! stdout carries protocol frames only; logs go to stderr.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let provider = datetime_tools::provider()?;
    provider.serve_stdio().await?;

    Ok(())
}
