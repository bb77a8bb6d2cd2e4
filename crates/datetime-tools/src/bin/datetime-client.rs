//! Demo consumer for the date/time tool provider
//!
//! Lists the provider's tools, then calls each one in a fresh session.
//! Launches `DATETIME_SERVER_CMD` if set, otherwise the `datetime-server`
//! binary next to this executable.

use anyhow::Context;
use serde_json::{Value, json};
use tool_protocol::{ProviderCommand, ToolConsumer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CALLS: [(&str, &str); 8] = [
    ("Current Date", "get_current_date"),
    ("Current Time", "get_current_time"),
    ("Current DateTime", "get_current_datetime"),
    ("Day of Week", "get_day_of_week"),
    ("Unix Timestamp", "get_timestamp"),
    ("ISO DateTime", "get_iso_datetime"),
    ("New York Time", "get_datetime_in_timezone"),
    ("Tokyo Time", "get_datetime_in_timezone"),
];

fn server_command() -> anyhow::Result<ProviderCommand> {
    if let Some(cmd) = ProviderCommand::from_env("DATETIME_SERVER_CMD") {
        return Ok(cmd);
    }
    let exe = std::env::current_exe().context("cannot locate current executable")?;
    let sibling = exe.with_file_name(format!("datetime-server{}", std::env::consts::EXE_SUFFIX));
    Ok(ProviderCommand::new(sibling.to_string_lossy()))
}

fn arguments(label: &str) -> Value {
    match label {
        "New York Time" => json!({ "timezone": "America/New_York" }),
        "Tokyo Time" => json!({ "timezone": "Asia/Tokyo" }),
        _ => json!({}),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let consumer = ToolConsumer::new(server_command()?);
    println!("Testing DateTime tool provider ({})\n", consumer.command());

    println!("Available tools:");
    for tool in consumer.discover().await? {
        println!("  • {}: {}", tool.name, tool.description);
    }

    println!("\n{}\n", "=".repeat(60));
    println!("Testing tools:\n");

    for (label, tool) in CALLS {
        let output = consumer.invoke(tool, arguments(label)).await?;
        println!("{label}: {output}");
    }

    Ok(())
}
