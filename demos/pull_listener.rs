//! # Example: Pull Listener
//!
//! Pull-mode subscription: the listener awaits `Subscriber::next()` at its own
//! pace while a talker publishes in bursts. The queue holds 4 messages and the
//! registry drops the oldest one when it is full, so a slow listener always sees
//! the most recent messages.
//!
//! ## Run
//! ```bash
//! cargo run --example pull_listener
//! ```

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use topicbus::{BackpressurePolicy, PubSubError, RegistryConfig, TopicRegistry};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let mut cfg = RegistryConfig::default();
    cfg.backpressure = BackpressurePolicy::DropOldest;
    cfg.recv_timeout = Duration::from_secs(1);
    let registry = TopicRegistry::new(cfg);

    let listener = registry.subscriber("chatter", 4)?;
    let talker = registry.publisher("chatter")?;

    let talk = tokio::spawn(async move {
        for burst in 0..3 {
            for i in 0..6 {
                let seq = talker.send(format!("Hello, world: {burst}.{i}")).await?;
                println!("[talker] sent seq={seq}");
            }
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        Ok::<(), PubSubError>(())
    });

    loop {
        match listener.next().await {
            Ok(Some(msg)) => {
                let text = msg.text().unwrap_or("<binary>");
                println!("[listener] I heard: [{text}] (seq={})", msg.seq);
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok(None) => break,
            Err(PubSubError::Timeout { .. }) => {
                println!("[listener] quiet for a second, closing");
                listener.close();
            }
            Err(e) => return Err(e.into()),
        }
    }
    talk.await??;

    let stats = listener.handle().stats();
    println!();
    println!("Listener:");
    println!(" ├─► Delivered: {}", stats.delivered);
    println!(" └─► Dropped:   {}", stats.dropped);

    registry.shutdown().await?;
    Ok(())
}
