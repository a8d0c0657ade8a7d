//! Ask one question against a local OpenAI-compatible server
//!
//! # Usage
//!
//! ```bash
//! # Start LM Studio (or any compatible server) on localhost:1234, then:
//! cargo run --example simple_chat -- "Why is the sky blue?"
//! ```

use parley::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let question = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Say hello in three languages.".to_string());
    let base_url =
        std::env::var("PARLEY_BASE_URL").unwrap_or_else(|_| "http://localhost:1234/v1".to_string());

    let chat = ChatBuilder::new()
        .base_url(base_url)
        .system_message("Answer in at most three sentences.")
        .build()?;

    println!("> {}\n", question);
    let reply = chat.ask(&question).await?;
    println!("{}", reply);

    let stats = chat.orchestrator().context_stats().await;
    println!(
        "\n[{} messages, ~{} tokens]",
        stats.message_count, stats.estimated_tokens
    );

    Ok(())
}
