use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use parley_chat::{ChatOrchestrator, SessionEvent, TurnState};
use parley_persist::SessionStore;
use parley_types::Role;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::Mutex;

use crate::commands::{self, Command, Setting, Target, HELP};

enum Flow {
    Continue,
    Quit,
}

/// Echoes a streaming reply as its stored content grows
struct ReplyEcho {
    store: Arc<Mutex<SessionStore>>,
    events: broadcast::Receiver<SessionEvent>,
    message_id: Option<String>,
    printed: usize,
}

impl ReplyEcho {
    fn reset(&mut self) {
        self.message_id = None;
        self.printed = 0;
    }

    async fn handle(&mut self, event: SessionEvent) {
        let SessionEvent::MessageUpdated {
            session_id,
            message_id,
        } = event
        else {
            return;
        };

        let content = {
            let store = self.store.lock().await;
            store
                .session(&session_id)
                .and_then(|s| s.message(&message_id))
                .filter(|m| m.role == Role::Assistant)
                .map(|m| m.content.clone())
        };
        let Some(content) = content else {
            return;
        };

        if self.message_id.as_deref() != Some(message_id.as_str()) {
            self.message_id = Some(message_id);
            self.printed = 0;
        }

        if let Some(fresh) = content.get(self.printed..) {
            print!("{}", fresh);
            let _ = std::io::stdout().flush();
            self.printed = content.len();
        }
    }

    /// Print whatever arrived after the turn future finished
    async fn drain(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.handle(event).await,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Reply echo lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}

pub async fn run(orchestrator: ChatOrchestrator) -> anyhow::Result<()> {
    let store = orchestrator.store();
    let events = store.lock().await.subscribe();
    let mut echo = ReplyEcho {
        store,
        events,
        message_id: None,
        printed: 0,
    };

    let config = orchestrator.config().await;
    println!("parley ({} at {}). /help for commands.", config.model, config.base_url);
    if let Some(session) = orchestrator.current_session().await {
        println!("Session: {}", session.title);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        let command = match commands::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        // Events from commands are not part of any reply
        while !matches!(echo.events.try_recv(), Err(TryRecvError::Empty | TryRecvError::Closed)) {}

        if let Flow::Quit = execute(&orchestrator, &mut echo, command).await {
            break;
        }
    }

    Ok(())
}

async fn execute(orchestrator: &ChatOrchestrator, echo: &mut ReplyEcho, command: Command) -> Flow {
    match command {
        Command::Nothing => {}
        Command::Send(text) => {
            stream_turn(orchestrator, echo, orchestrator.send_message(&text)).await;
        }
        Command::Regenerate => {
            stream_turn(orchestrator, echo, orchestrator.regenerate_last_response()).await;
        }
        Command::New(title) => {
            let store = orchestrator.store();
            let mut store = store.lock().await;
            let id = store.create_session(title.as_deref());
            if let Some(session) = store.session(&id) {
                println!("Started {}", session.title);
            }
        }
        Command::List => {
            let current = orchestrator.current_session_id().await;
            for (i, session) in orchestrator.sessions().await.iter().enumerate() {
                let marker = if current.as_deref() == Some(session.id.as_str()) { "*" } else { " " };
                println!(
                    "{} {:>2}. {} ({} messages, {})",
                    marker,
                    i + 1,
                    session.title,
                    session.messages.len(),
                    session.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::Switch(target) => {
            let store = orchestrator.store();
            let mut store = store.lock().await;
            let switched = match resolve_session(&store, &target) {
                Some(id) => store.switch_session(&id),
                None => false,
            };
            match store.current_session() {
                Some(session) if switched => println!("Switched to {}", session.title),
                _ => println!("No such session"),
            }
        }
        Command::Delete(target) => {
            let store = orchestrator.store();
            let mut store = store.lock().await;
            let id = match target {
                Some(target) => resolve_session(&store, &target),
                None => store.current_session_id().map(str::to_string),
            };
            let deleted = match id {
                Some(id) => store.delete_session(&id),
                None => false,
            };
            match store.current_session() {
                Some(session) if deleted => println!("Deleted. Now in {}", session.title),
                _ => println!("No such session"),
            }
        }
        Command::Rename(title) => {
            let store = orchestrator.store();
            let mut store = store.lock().await;
            let renamed = match store.current_session_id().map(str::to_string) {
                Some(id) => store.update_session_title(&id, title),
                None => false,
            };
            if !renamed {
                println!("Nothing to rename");
            }
        }
        Command::History => {
            for (i, message) in orchestrator.current_messages().await.iter().enumerate() {
                let role = match &message.role {
                    Role::User => "you",
                    other => other.as_str(),
                };
                println!("[{}] {}: {}", i + 1, role, message.content);
            }
        }
        Command::Edit { index, content } => {
            let edited = match message_id(orchestrator, index).await {
                Some(id) => orchestrator.edit_message(&id, &content).await,
                None => false,
            };
            if !edited {
                println!("No message {}", index);
            }
        }
        Command::Remove(index) => {
            let removed = match message_id(orchestrator, index).await {
                Some(id) => orchestrator.delete_message(&id).await,
                None => false,
            };
            if !removed {
                println!("No message {}", index);
            }
        }
        Command::Clear => orchestrator.clear_chat().await,
        Command::Stats => {
            let stats = orchestrator.context_stats().await;
            println!(
                "{} messages (limit {}), ~{} tokens (limit {}){}",
                stats.message_count,
                stats.max_messages,
                stats.estimated_tokens,
                stats.max_tokens,
                if stats.needs_management { ", will be compacted" } else { "" }
            );
        }
        Command::Set(Setting::Chat(update)) => {
            if let Err(e) = orchestrator.update_config(update).await {
                println!("{}", e);
            }
        }
        Command::Set(Setting::Context(update)) => orchestrator.update_context_policy(update).await,
        Command::Help => println!("{}", HELP),
        Command::Quit => return Flow::Quit,
    }

    Flow::Continue
}

/// Drive one turn, echoing the reply; Ctrl-C stops it
async fn stream_turn<F>(orchestrator: &ChatOrchestrator, echo: &mut ReplyEcho, turn: F)
where
    F: Future<Output = TurnState>,
{
    echo.reset();
    tokio::pin!(turn);

    let state = loop {
        tokio::select! {
            state = &mut turn => break state,
            _ = tokio::signal::ctrl_c() => {
                orchestrator.stop_generation();
            }
            event = echo.events.recv() => match event {
                Ok(event) => echo.handle(event).await,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Reply echo lagged");
                }
                Err(RecvError::Closed) => {}
            },
        }
    };
    echo.drain().await;

    match state {
        TurnState::Idle => println!("Nothing to do"),
        TurnState::Aborted => println!("\n[stopped]"),
        TurnState::Failed => {
            let error = orchestrator.error().unwrap_or_else(|| "unknown error".to_string());
            println!("\n[error] {}", error);
        }
        _ => println!(),
    }
}

fn resolve_session(store: &SessionStore, target: &Target) -> Option<String> {
    target.resolve(store.sessions().iter().map(|s| s.id.as_str()))
}

async fn message_id(orchestrator: &ChatOrchestrator, index: usize) -> Option<String> {
    let messages = orchestrator.current_messages().await;
    Target::Index(index).resolve(messages.iter().map(|m| m.id.as_str()))
}
