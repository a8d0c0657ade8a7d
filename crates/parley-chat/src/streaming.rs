use futures::StreamExt;
use parley_llm::{ByteStream, SseDecoder, SseEvent};
use parley_persist::SessionStore;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{ChatError, Result};

/// Where streamed content lands: one message of one session
///
/// The ids are pinned when the turn starts, so switching sessions while a
/// reply streams does not redirect it.
pub(crate) struct ReplyTarget<'a> {
    pub store: &'a Mutex<SessionStore>,
    pub session_id: &'a str,
    pub message_id: &'a str,
}

impl ReplyTarget<'_> {
    /// Replace the reply's content with the full text so far
    async fn write(&self, content: &str) -> Result<()> {
        let mut store = self.store.lock().await;
        if store.update_message_content(self.session_id, self.message_id, content) {
            Ok(())
        } else {
            Err(ChatError::Stream(
                "reply message was removed while streaming".to_string(),
            ))
        }
    }
}

/// Read `stream` to the end, writing accumulated content into `target`
///
/// Cancellation is checked at every chunk boundary. Malformed lines are
/// logged and skipped. Returns the final content.
pub(crate) async fn pump(
    mut stream: ByteStream,
    cancel: &CancellationToken,
    target: ReplyTarget<'_>,
) -> Result<String> {
    let mut decoder = SseDecoder::new();
    let mut content = String::new();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            chunk = stream.next() => chunk,
        };

        let Some(chunk) = chunk else {
            break;
        };
        let bytes = chunk?;

        let mut changed = false;
        for event in decoder.feed(&bytes) {
            match event {
                SseEvent::Delta(text) => {
                    content.push_str(&text);
                    changed = true;
                }
                SseEvent::Done => {
                    tracing::debug!("Stream sent [DONE]");
                }
                SseEvent::Malformed { data, reason } => {
                    tracing::warn!(%data, %reason, "Skipping malformed stream line");
                }
            }
        }

        if changed {
            target.write(&content).await?;
        }
    }

    if decoder.pending() > 0 {
        tracing::debug!(bytes = decoder.pending(), "Stream ended mid-line");
    }

    Ok(content)
}
