use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};

use parley_context::{ContextManager, ContextStats, LlmSummarizer};
use parley_llm::{ChatClient, ChatMessage, ChatRequest, Role};
use parley_persist::SessionStore;
use parley_types::{
    ChatConfig, ChatConfigUpdate, ChatStatus, ContextPolicyUpdate, Message, Session, TurnState,
};
use tokio::sync::{watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::builder::ChatOrchestratorBuilder;
use crate::client_factory::ClientFactory;
use crate::error::{ChatError, Result};
use crate::streaming::{pump, ReplyTarget};

/// Messages sent when the history is within budget
const PLAIN_WINDOW: usize = 10;

/// The one in-flight turn that `stop_generation` can reach
struct InFlight {
    turn_id: u64,
    cancel: CancellationToken,
}

/// Drives chat turns against a streaming completion endpoint
///
/// A turn appends the user message and an empty assistant placeholder,
/// builds a budgeted payload, streams the reply into the placeholder and
/// settles as `Completed`, `Aborted` (stopped, partial content kept) or
/// `Failed` (placeholder rolled back, error recorded).
///
/// There is one cancellation slot. Starting a turn while another is in
/// flight cancels the older one, which then settles as `Aborted`.
pub struct ChatOrchestrator {
    client: RwLock<Arc<dyn ChatClient>>,
    owns_client: bool,
    store: Arc<Mutex<SessionStore>>,
    context: RwLock<ContextManager>,
    config: RwLock<ChatConfig>,
    status: watch::Sender<ChatStatus>,
    in_flight: std::sync::Mutex<Option<InFlight>>,
    turn_seq: AtomicU64,
}

impl ChatOrchestrator {
    pub(crate) fn from_parts(
        client: Arc<dyn ChatClient>,
        owns_client: bool,
        store: SessionStore,
        context: ContextManager,
        config: ChatConfig,
    ) -> Self {
        let (status, _) = watch::channel(ChatStatus::idle());
        Self {
            client: RwLock::new(client),
            owns_client,
            store: Arc::new(Mutex::new(store)),
            context: RwLock::new(context),
            config: RwLock::new(config),
            status,
            in_flight: std::sync::Mutex::new(None),
            turn_seq: AtomicU64::new(0),
        }
    }

    pub fn builder() -> ChatOrchestratorBuilder {
        ChatOrchestratorBuilder::new()
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Shared handle to the session store
    pub fn store(&self) -> Arc<Mutex<SessionStore>> {
        Arc::clone(&self.store)
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ChatStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> ChatStatus {
        self.status.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.status.borrow().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.status.borrow().error.clone()
    }

    pub async fn config(&self) -> ChatConfig {
        self.config.read().await.clone()
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.store.lock().await.current_session().cloned()
    }

    pub async fn current_session_id(&self) -> Option<String> {
        self.store.lock().await.current_session_id().map(str::to_string)
    }

    pub async fn current_messages(&self) -> Vec<Message> {
        self.store.lock().await.current_messages().to_vec()
    }

    pub async fn sessions(&self) -> Vec<Session> {
        self.store.lock().await.sessions().to_vec()
    }

    /// Budget figures for the current session
    pub async fn context_stats(&self) -> ContextStats {
        let messages = self.current_messages().await;
        self.context.read().await.stats(&messages)
    }

    // ========================================================================
    // CONFIGURATION
    // ========================================================================

    /// Merge a chat config update
    ///
    /// When the orchestrator built its own client and the endpoint changed,
    /// the client is rebuilt. On failure the previous config stays.
    pub async fn update_config(&self, update: ChatConfigUpdate) -> Result<()> {
        let mut config = self.config.write().await;
        let mut next = config.clone();
        next.update(update);
        ClientFactory::validate_config(&next)?;

        if self.owns_client && ClientFactory::endpoint_changed(&config, &next) {
            let client = ClientFactory::create_client(&next)?;
            *self.client.write().await = client;
            tracing::info!(base_url = %next.base_url, "Chat endpoint changed");
        }

        *config = next;
        Ok(())
    }

    pub async fn update_context_policy(&self, update: ContextPolicyUpdate) {
        self.context.write().await.update_config(update);
    }

    // ========================================================================
    // TURNS
    // ========================================================================

    /// Send a user message and stream the reply
    ///
    /// Blank input is ignored (`Idle`). Failures never surface as errors:
    /// they are reflected in the returned state and in [`ChatStatus`].
    pub async fn send_message(&self, text: &str) -> TurnState {
        if text.trim().is_empty() {
            tracing::debug!("Ignoring blank message");
            return TurnState::Idle;
        }

        let session_id = {
            let mut store = self.store.lock().await;
            let Some(session_id) = store.current_session_id().map(str::to_string) else {
                return TurnState::Idle;
            };
            store.append_message_to(&session_id, Message::user(text));
            session_id
        };

        self.run_turn(session_id).await
    }

    /// Replace the last assistant reply with a fresh one
    ///
    /// Only valid when the current session ends with an assistant message
    /// that follows a user message; otherwise nothing happens (`Idle`).
    pub async fn regenerate_last_response(&self) -> TurnState {
        let session_id = {
            let mut store = self.store.lock().await;
            let Some(session) = store.current_session() else {
                return TurnState::Idle;
            };

            let messages = &session.messages;
            let ends_with_reply = messages.last().is_some_and(|m| m.role == Role::Assistant);
            let has_prompt = messages.iter().rev().skip(1).any(|m| m.role == Role::User);
            if !ends_with_reply || !has_prompt {
                tracing::debug!("Nothing to regenerate");
                return TurnState::Idle;
            }

            let session_id = session.id.clone();
            store.remove_last_message();
            session_id
        };

        self.run_turn(session_id).await
    }

    /// Signal the in-flight turn, if any, to stop
    pub fn stop_generation(&self) -> bool {
        let slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(in_flight) => {
                tracing::info!(turn = in_flight.turn_id, "Stopping generation");
                in_flight.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn edit_message(&self, message_id: &str, new_content: &str) -> bool {
        self.store.lock().await.edit_message(message_id, new_content)
    }

    pub async fn delete_message(&self, message_id: &str) -> bool {
        self.store.lock().await.remove_message(message_id)
    }

    /// Empty the current session and clear the error slot
    pub async fn clear_chat(&self) {
        self.store.lock().await.clear_current_session();
        self.status.send_modify(|status| status.error = None);
    }

    // ========================================================================
    // TURN PIPELINE
    // ========================================================================

    async fn run_turn(&self, session_id: String) -> TurnState {
        let (turn_id, cancel) = self.begin_turn();

        let placeholder = Message::assistant("");
        let placeholder_id = placeholder.id.clone();
        let history = {
            let mut store = self.store.lock().await;
            let history = store
                .session(&session_id)
                .map(|s| s.messages.clone())
                .unwrap_or_default();
            store.append_message_to(&session_id, placeholder);
            history
        };

        let result = self
            .stream_reply(turn_id, &session_id, &placeholder_id, history, &cancel)
            .await;

        self.finish_turn(turn_id, &session_id, &placeholder_id, result)
            .await
    }

    async fn stream_reply(
        &self,
        turn_id: u64,
        session_id: &str,
        placeholder_id: &str,
        history: Vec<Message>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let config = self.config.read().await.clone();
        let client = Arc::clone(&*self.client.read().await);

        let payload = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            payload = self.build_payload(&client, history, &config) => payload,
        };

        let request =
            ChatRequest::new(config.model.clone(), payload).with_options(config.chat_options());
        tracing::debug!(
            turn = turn_id,
            model = %config.model,
            messages = request.messages.len(),
            "Starting completion"
        );

        let stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            stream = client.chat_stream(request, cancel.clone()) => stream?,
        };
        self.set_state(turn_id, TurnState::Streaming);

        let target = ReplyTarget {
            store: &self.store,
            session_id,
            message_id: placeholder_id,
        };
        let content = pump(stream, cancel, target).await?;

        tracing::debug!(turn = turn_id, chars = content.chars().count(), "Completion finished");
        Ok(())
    }

    /// History minus blank assistant replies, compacted when over budget
    async fn build_payload(
        &self,
        client: &Arc<dyn ChatClient>,
        history: Vec<Message>,
        config: &ChatConfig,
    ) -> Vec<ChatMessage> {
        let history: Vec<Message> = history
            .into_iter()
            .filter(|m| !(m.role == Role::Assistant && m.is_blank()))
            .collect();

        let context = self.context.read().await.clone();

        if context.needs_management(&history) {
            let summarizer = LlmSummarizer::new(Arc::clone(client), config.model.clone())
                .with_temperature(config.temperature);
            return context
                .build_payload(&history, &config.system_message, Some(&summarizer))
                .await;
        }

        let start = history.len().saturating_sub(PLAIN_WINDOW);
        let mut payload = vec![ChatMessage::system(config.system_message.clone())];
        payload.extend(history[start..].iter().map(Message::to_chat_message));
        payload
    }

    async fn finish_turn(
        &self,
        turn_id: u64,
        session_id: &str,
        placeholder_id: &str,
        result: Result<()>,
    ) -> TurnState {
        let status = match result {
            Ok(()) => ChatStatus::finished(TurnState::Completed, None),
            Err(e) if e.is_cancellation() => {
                tracing::info!(turn = turn_id, "Generation stopped");
                ChatStatus::finished(TurnState::Aborted, None)
            }
            Err(e) => {
                tracing::error!(turn = turn_id, error = %e, "Chat turn failed");
                self.store
                    .lock()
                    .await
                    .remove_message_in(session_id, placeholder_id);
                ChatStatus::finished(TurnState::Failed, Some(e.to_string()))
            }
        };

        let state = status.state;
        self.end_turn(turn_id, status);
        state
    }

    // ========================================================================
    // TURN BOOKKEEPING
    // ========================================================================

    fn begin_turn(&self) -> (u64, CancellationToken) {
        let turn_id = self.turn_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();

        let previous = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(InFlight {
                turn_id,
                cancel: cancel.clone(),
            });
        if let Some(previous) = previous {
            tracing::warn!(
                previous = previous.turn_id,
                turn = turn_id,
                "New turn started while another was in flight, cancelling it"
            );
            previous.cancel.cancel();
        }

        self.status
            .send_replace(ChatStatus::loading(TurnState::Sending));
        (turn_id, cancel)
    }

    fn is_latest(&self, turn_id: u64) -> bool {
        self.turn_seq.load(Ordering::SeqCst) == turn_id
    }

    fn set_state(&self, turn_id: u64, state: TurnState) {
        if self.is_latest(turn_id) {
            self.status.send_modify(|status| status.state = state);
        }
    }

    /// Release the cancellation slot and publish the final status, unless a
    /// newer turn has taken over
    fn end_turn(&self, turn_id: u64, status: ChatStatus) {
        {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.as_ref().is_some_and(|f| f.turn_id == turn_id) {
                *slot = None;
            }
        }

        if self.is_latest(turn_id) {
            self.status.send_replace(status);
        }
    }
}
