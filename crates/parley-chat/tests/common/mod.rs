#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parley_chat::{ChatOrchestrator, ContextPolicyConfig};
use parley_llm::{ByteStream, ChatClient, ChatRequest, ChatResponse, LlmError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// What the fake transport does for one streaming call
pub enum Script {
    /// Deliver these chunks, then end the stream
    Chunks(Vec<Vec<u8>>),
    /// Deliver these chunks, then never finish
    ChunksThenHang(Vec<Vec<u8>>),
    /// Deliver these chunks, then fail
    ChunksThenError(Vec<Vec<u8>>, LlmError),
    /// Fail before any body arrives
    Fail(LlmError),
    /// Never answer with response headers
    HangBeforeHeaders,
}

/// In-process transport with scripted streaming replies
#[derive(Default)]
pub struct FakeClient {
    scripts: Mutex<VecDeque<Script>>,
    summary: Mutex<Option<String>>,
    summary_hangs: AtomicBool,
    /// Signalled when a call starts hanging
    pub hanging: Notify,
    pub stream_requests: Mutex<Vec<ChatRequest>>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
}

impl FakeClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn set_summary(&self, summary: &str) {
        *self.summary.lock().unwrap() = Some(summary.to_string());
    }

    /// Make every summary request hang until the turn is stopped
    pub fn hang_summaries(&self) {
        self.summary_hangs.store(true, Ordering::SeqCst);
    }

    pub fn last_stream_request(&self) -> ChatRequest {
        self.stream_requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ChatClient for FakeClient {
    async fn chat(&self, request: ChatRequest) -> parley_llm::Result<ChatResponse> {
        self.chat_requests.lock().unwrap().push(request);
        if self.summary_hangs.load(Ordering::SeqCst) {
            self.hanging.notify_one();
            futures::future::pending::<()>().await;
        }
        let summary = self.summary.lock().unwrap().clone();
        match summary {
            Some(content) => Ok(ChatResponse {
                content: Some(content),
                usage: None,
                finish_reason: Some("stop".to_string()),
                raw: serde_json::Value::Null,
            }),
            None => Err(LlmError::Http {
                status: 500,
                body: "summary unavailable".to_string(),
            }),
        }
    }

    async fn chat_stream(
        &self,
        request: ChatRequest,
        _cancel: CancellationToken,
    ) -> parley_llm::Result<ByteStream> {
        self.stream_requests.lock().unwrap().push(request);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left");

        let ok = |chunks: Vec<Vec<u8>>| {
            futures::stream::iter(chunks.into_iter().map(|c| Ok::<Bytes, LlmError>(Bytes::from(c))))
        };

        match script {
            Script::Chunks(chunks) => Ok(Box::pin(ok(chunks))),
            Script::ChunksThenHang(chunks) => {
                Ok(Box::pin(ok(chunks).chain(futures::stream::pending())))
            }
            Script::ChunksThenError(chunks, err) => {
                Ok(Box::pin(ok(chunks).chain(futures::stream::iter([Err(err)]))))
            }
            Script::Fail(err) => Err(err),
            Script::HangBeforeHeaders => {
                self.hanging.notify_one();
                futures::future::pending().await
            }
        }
    }
}

/// `data:` line carrying one content delta
pub fn delta(content: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({"choices": [{"delta": {"content": content}}]})
    )
}

/// A complete streamed reply made of the given deltas
pub fn reply(parts: &[&str]) -> Script {
    let mut body: Vec<Vec<u8>> = parts.iter().map(|p| delta(p).into_bytes()).collect();
    body.push(b"data: [DONE]\n\n".to_vec());
    Script::Chunks(body)
}

pub fn orchestrator(client: Arc<FakeClient>) -> ChatOrchestrator {
    orchestrator_with_policy(client, ContextPolicyConfig::default())
}

pub fn orchestrator_with_policy(
    client: Arc<FakeClient>,
    policy: ContextPolicyConfig,
) -> ChatOrchestrator {
    ChatOrchestrator::builder()
        .client(client)
        .context_policy(policy)
        .build()
        .unwrap()
}
