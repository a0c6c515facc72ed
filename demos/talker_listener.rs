//! # Example: Talker / Listener
//!
//! A publisher sends `Hello, world: N` on `chatter` every 500ms; a `LogHandler`
//! subscription prints every message it hears. Stops on Ctrl-C, draining the
//! listener before exit.
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example talker_listener --features logging
//! ```

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use topicbus::{LogHandler, PubSubError, Publisher, RegistryConfig, Schema, TopicRegistry};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut cfg = RegistryConfig::default();
    cfg.grace = Duration::from_secs(2);
    let registry = TopicRegistry::new(cfg);

    let listener = registry.subscribe("chatter", std::sync::Arc::new(LogHandler::new()))?;
    tracing::info!(subscriber = %listener.id(), "listener subscribed");

    let talker =
        Publisher::new(&registry, "chatter")?.with_schema(Schema::utf8("std_msgs/String"));
    let talk = tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_millis(500));
        for count in 0u64.. {
            tick.tick().await;
            let text = format!("Hello, world: {count}");
            tracing::info!("Publishing: '{text}'");
            if let Err(e) = talker.send(text.into_bytes()).await {
                tracing::warn!(error = %e, "publish failed");
                if matches!(e, PubSubError::RegistryClosed) {
                    break;
                }
            }
        }
    });

    registry.shutdown_on_signal().await?;
    talk.abort();

    let stats = registry.stats();
    println!();
    println!("Delivery:");
    println!(" ├─► Published: {}", stats.published);
    println!(" ├─► Delivered: {}", stats.delivered);
    println!(" └─► Failures:  {}", stats.failures);
    Ok(())
}
