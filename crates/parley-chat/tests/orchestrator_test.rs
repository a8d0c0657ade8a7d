mod common;

use std::sync::Arc;

use common::{orchestrator, orchestrator_with_policy, reply, FakeClient, Script};
use parley_chat::{
    ChatConfigUpdate, ContextPolicyConfig, ContextPolicyUpdate, Message, SessionEvent, TurnState,
};
use parley_llm::{ChatMessage, LlmError, Role};

const HI_STREAM: &[u8] =
    b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n";

#[tokio::test]
async fn test_send_message_streams_reply_into_session() {
    let client = FakeClient::new();
    client.push(reply(&["Hel", "lo", " there"]));
    let chat = orchestrator(client.clone());

    let state = chat.send_message("Hello").await;

    assert_eq!(state, TurnState::Completed);
    let messages = chat.current_messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "Hello");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Hello there");

    let status = chat.status();
    assert_eq!(status.state, TurnState::Completed);
    assert!(!status.is_loading);
    assert!(status.error.is_none());
}

#[tokio::test]
async fn test_first_message_names_the_session() {
    let client = FakeClient::new();
    client.push(reply(&["Hi"]));
    let chat = orchestrator(client);

    assert_eq!(chat.current_session().await.unwrap().title, "New conversation 1");
    chat.send_message("Hello").await;
    assert_eq!(chat.current_session().await.unwrap().title, "Hello");
}

#[tokio::test]
async fn test_blank_message_is_ignored() {
    let client = FakeClient::new();
    let chat = orchestrator(client.clone());

    assert_eq!(chat.send_message("   \n").await, TurnState::Idle);
    assert!(chat.current_messages().await.is_empty());
    assert!(client.stream_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_request_carries_config_and_system_prompt() {
    let client = FakeClient::new();
    client.push(reply(&["Hi"]));
    let chat = orchestrator(client.clone());

    chat.send_message("Hello").await;

    let request = client.last_stream_request();
    let config = chat.config().await;
    assert_eq!(request.model, config.model);
    assert_eq!(request.options.temperature, Some(config.temperature));
    assert_eq!(request.options.max_tokens, Some(-1));
    assert_eq!(
        request.messages,
        vec![
            ChatMessage::system(config.system_message),
            ChatMessage::user("Hello"),
        ]
    );
}

#[tokio::test]
async fn test_any_split_of_the_stream_yields_same_content() {
    for first in 0..=HI_STREAM.len() {
        for second in first..=HI_STREAM.len() {
            let client = FakeClient::new();
            client.push(Script::Chunks(vec![
                HI_STREAM[..first].to_vec(),
                HI_STREAM[first..second].to_vec(),
                HI_STREAM[second..].to_vec(),
            ]));
            let chat = orchestrator(client);

            assert_eq!(chat.send_message("q").await, TurnState::Completed);
            let messages = chat.current_messages().await;
            assert_eq!(messages[1].content, "Hi", "split at {} / {}", first, second);
        }
    }
}

#[tokio::test]
async fn test_malformed_lines_are_skipped() {
    let client = FakeClient::new();
    client.push(Script::Chunks(vec![
        b"data: {broken\n\n".to_vec(),
        b": keep-alive\n\n".to_vec(),
        common::delta("ok").into_bytes(),
        b"data: [DONE]\n\n".to_vec(),
    ]));
    let chat = orchestrator(client);

    assert_eq!(chat.send_message("q").await, TurnState::Completed);
    assert_eq!(chat.current_messages().await[1].content, "ok");
    assert!(chat.error().is_none());
}

#[tokio::test]
async fn test_http_error_rolls_back_placeholder() {
    let client = FakeClient::new();
    client.push(Script::Fail(LlmError::Http {
        status: 500,
        body: "model not loaded".to_string(),
    }));
    let chat = orchestrator(client);

    let state = chat.send_message("Hello").await;

    assert_eq!(state, TurnState::Failed);
    let messages = chat.current_messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "Hello");

    let status = chat.status();
    assert!(!status.is_loading);
    assert_eq!(
        status.error.as_deref(),
        Some("HTTP error! status: 500 - model not loaded")
    );
}

#[tokio::test]
async fn test_mid_stream_error_removes_partial_reply() {
    let client = FakeClient::new();
    client.push(Script::ChunksThenError(
        vec![common::delta("partial").into_bytes()],
        LlmError::MalformedResponse("connection reset".to_string()),
    ));
    let chat = orchestrator(client);

    assert_eq!(chat.send_message("Hello").await, TurnState::Failed);
    assert_eq!(chat.current_messages().await.len(), 1);
    assert!(chat.error().is_some());
}

#[tokio::test]
async fn test_error_is_cleared_by_next_turn() {
    let client = FakeClient::new();
    client.push(Script::Fail(LlmError::Http {
        status: 502,
        body: String::new(),
    }));
    client.push(reply(&["fine"]));
    let chat = orchestrator(client);

    chat.send_message("one").await;
    assert!(chat.error().is_some());

    chat.send_message("two").await;
    assert!(chat.error().is_none());
}

#[tokio::test]
async fn test_stop_generation_keeps_partial_content() {
    let client = FakeClient::new();
    client.push(Script::ChunksThenHang(vec![common::delta("Hel").into_bytes()]));
    let chat = Arc::new(orchestrator(client));

    let mut events = chat.store().lock().await.subscribe();
    let turn = tokio::spawn({
        let chat = Arc::clone(&chat);
        async move { chat.send_message("Hello").await }
    });

    // wait until the first delta has been written
    loop {
        if let SessionEvent::MessageUpdated { .. } = events.recv().await.unwrap() {
            break;
        }
    }

    assert!(chat.is_loading());
    assert!(chat.stop_generation());
    let state = turn.await.unwrap();

    assert_eq!(state, TurnState::Aborted);
    let status = chat.status();
    assert!(!status.is_loading);
    assert!(status.error.is_none());

    let messages = chat.current_messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Hel");

    assert!(!chat.stop_generation());
}

#[tokio::test]
async fn test_stop_while_waiting_for_response_headers() {
    let client = FakeClient::new();
    client.push(Script::HangBeforeHeaders);
    let chat = Arc::new(orchestrator(client.clone()));

    let turn = tokio::spawn({
        let chat = Arc::clone(&chat);
        async move { chat.send_message("Hello").await }
    });

    client.hanging.notified().await;
    assert_eq!(chat.status().state, TurnState::Sending);
    assert!(chat.stop_generation());

    assert_eq!(turn.await.unwrap(), TurnState::Aborted);
    let status = chat.status();
    assert!(!status.is_loading);
    assert!(status.error.is_none());

    // the empty placeholder is kept, as with any stop
    let messages = chat.current_messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "");
}

#[tokio::test]
async fn test_stop_while_summarizing() {
    let client = FakeClient::new();
    client.hang_summaries();
    let policy = ContextPolicyConfig::default()
        .with_max_messages(4)
        .with_summary_threshold(2);
    let chat = Arc::new(orchestrator_with_policy(client.clone(), policy));

    {
        let store = chat.store();
        let mut store = store.lock().await;
        for i in 0..3 {
            store.append_message(Message::user(format!("q{}", i)));
            store.append_message(Message::assistant(format!("a{}", i)));
        }
    }

    let turn = tokio::spawn({
        let chat = Arc::clone(&chat);
        async move { chat.send_message("latest").await }
    });

    client.hanging.notified().await;
    assert!(chat.stop_generation());

    assert_eq!(turn.await.unwrap(), TurnState::Aborted);
    let status = chat.status();
    assert!(!status.is_loading);
    assert!(status.error.is_none());
    assert!(client.stream_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_streaming_state_is_published() {
    let client = FakeClient::new();
    client.push(Script::ChunksThenHang(vec![]));
    let chat = Arc::new(orchestrator(client));
    let mut status = chat.subscribe_status();

    let turn = tokio::spawn({
        let chat = Arc::clone(&chat);
        async move { chat.send_message("Hello").await }
    });

    status
        .wait_for(|s| s.state == TurnState::Streaming && s.is_loading)
        .await
        .unwrap();
    chat.stop_generation();

    assert_eq!(turn.await.unwrap(), TurnState::Aborted);
}

#[tokio::test]
async fn test_new_turn_supersedes_in_flight_turn() {
    let client = FakeClient::new();
    client.push(Script::ChunksThenHang(vec![common::delta("first").into_bytes()]));
    client.push(reply(&["second"]));
    let chat = Arc::new(orchestrator(client));

    let mut events = chat.store().lock().await.subscribe();
    let first = tokio::spawn({
        let chat = Arc::clone(&chat);
        async move { chat.send_message("one").await }
    });
    loop {
        if let SessionEvent::MessageUpdated { .. } = events.recv().await.unwrap() {
            break;
        }
    }

    assert_eq!(chat.send_message("two").await, TurnState::Completed);
    assert_eq!(first.await.unwrap(), TurnState::Aborted);

    let status = chat.status();
    assert_eq!(status.state, TurnState::Completed);
    assert!(!status.is_loading);

    let contents: Vec<String> = chat
        .current_messages()
        .await
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["one", "first", "two", "second"]);
}

#[tokio::test]
async fn test_reply_stays_in_its_session_after_switch() {
    let client = FakeClient::new();
    client.push(Script::ChunksThenHang(vec![common::delta("for A").into_bytes()]));
    let chat = Arc::new(orchestrator(client));
    let session_a = chat.current_session_id().await.unwrap();

    let mut events = chat.store().lock().await.subscribe();
    let turn = tokio::spawn({
        let chat = Arc::clone(&chat);
        async move { chat.send_message("question").await }
    });
    loop {
        if let SessionEvent::MessageUpdated { .. } = events.recv().await.unwrap() {
            break;
        }
    }

    let session_b = chat.store().lock().await.create_session(None);
    chat.stop_generation();
    turn.await.unwrap();

    let store = chat.store();
    let store = store.lock().await;
    assert_eq!(store.current_session_id(), Some(session_b.as_str()));
    assert!(store.current_messages().is_empty());
    assert_eq!(store.session(&session_a).unwrap().messages[1].content, "for A");
}

#[tokio::test]
async fn test_regenerate_replaces_last_reply() {
    let client = FakeClient::new();
    client.push(reply(&["first answer"]));
    client.push(reply(&["second answer"]));
    let chat = orchestrator(client.clone());

    chat.send_message("Hello").await;
    let state = chat.regenerate_last_response().await;

    assert_eq!(state, TurnState::Completed);
    let messages = chat.current_messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "Hello");
    assert_eq!(messages[1].content, "second answer");

    let request = client.last_stream_request();
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[1], ChatMessage::user("Hello"));
}

#[tokio::test]
async fn test_regenerate_requires_trailing_reply() {
    let client = FakeClient::new();
    let chat = orchestrator(client.clone());

    assert_eq!(chat.regenerate_last_response().await, TurnState::Idle);

    chat.store().lock().await.append_message(Message::user("unanswered"));
    assert_eq!(chat.regenerate_last_response().await, TurnState::Idle);
    assert_eq!(chat.current_messages().await.len(), 1);
    assert!(client.stream_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_assistant_messages_are_not_sent() {
    let client = FakeClient::new();
    client.push(reply(&["ok"]));
    let chat = orchestrator(client.clone());

    {
        let store = chat.store();
        let mut store = store.lock().await;
        store.append_message(Message::user("earlier"));
        store.append_message(Message::assistant(""));
    }
    chat.send_message("now").await;

    let request = client.last_stream_request();
    let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::System, Role::User, Role::User]);
}

#[tokio::test]
async fn test_plain_window_sends_last_ten_messages() {
    let client = FakeClient::new();
    client.push(reply(&["ok"]));
    let chat = orchestrator(client.clone());

    {
        let store = chat.store();
        let mut store = store.lock().await;
        for i in 0..6 {
            store.append_message(Message::user(format!("q{}", i)));
            store.append_message(Message::assistant(format!("a{}", i)));
        }
    }
    chat.send_message("latest").await;

    let request = client.last_stream_request();
    assert_eq!(request.messages.len(), 11);
    assert_eq!(request.messages[0].role, Role::System);
    assert_eq!(request.messages[1], ChatMessage::assistant("a1"));
    assert_eq!(request.messages[10], ChatMessage::user("latest"));
}

#[tokio::test]
async fn test_over_budget_history_is_summarized() {
    let client = FakeClient::new();
    client.set_summary("They said hello.\n### END SUMMARY");
    client.push(reply(&["ok"]));
    let policy = ContextPolicyConfig::default()
        .with_max_messages(4)
        .with_summary_threshold(2);
    let chat = orchestrator_with_policy(client.clone(), policy);

    {
        let store = chat.store();
        let mut store = store.lock().await;
        for i in 0..3 {
            store.append_message(Message::user(format!("q{}", i)));
            store.append_message(Message::assistant(format!("a{}", i)));
        }
    }
    chat.send_message("latest").await;

    let summary_request = client.chat_requests.lock().unwrap()[0].clone();
    assert_eq!(summary_request.options.max_tokens, Some(3000));
    assert_eq!(summary_request.options.temperature, Some(0.7));

    let request = client.last_stream_request();
    assert_eq!(
        request.messages,
        vec![
            ChatMessage::system(chat.config().await.system_message),
            ChatMessage::system("Previous conversation summary: They said hello."),
            ChatMessage::assistant("a2"),
            ChatMessage::user("latest"),
        ]
    );
}

#[tokio::test]
async fn test_summary_failure_falls_back_to_window() {
    let client = FakeClient::new();
    client.push(reply(&["ok"]));
    let policy = ContextPolicyConfig::default()
        .with_max_messages(4)
        .with_summary_threshold(2);
    let chat = orchestrator_with_policy(client.clone(), policy);

    {
        let store = chat.store();
        let mut store = store.lock().await;
        for i in 0..3 {
            store.append_message(Message::user(format!("q{}", i)));
            store.append_message(Message::assistant(format!("a{}", i)));
        }
    }

    assert_eq!(chat.send_message("latest").await, TurnState::Completed);

    let request = client.last_stream_request();
    assert_eq!(request.messages.len(), 5);
    assert_eq!(request.messages[1], ChatMessage::assistant("a1"));
    assert_eq!(request.messages[4], ChatMessage::user("latest"));
    assert!(chat.error().is_none());
}

#[tokio::test]
async fn test_edit_and_delete_do_not_regenerate() {
    let client = FakeClient::new();
    client.push(reply(&["answer"]));
    let chat = orchestrator(client.clone());
    chat.send_message("question").await;

    let messages = chat.current_messages().await;
    assert!(chat.edit_message(&messages[0].id, "better question").await);
    assert!(chat.delete_message(&messages[1].id).await);

    let messages = chat.current_messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "better question");
    assert_eq!(client.stream_requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_clear_chat_empties_session_and_error() {
    let client = FakeClient::new();
    client.push(Script::Fail(LlmError::Http {
        status: 500,
        body: String::new(),
    }));
    let chat = orchestrator(client);

    chat.send_message("Hello").await;
    assert!(chat.error().is_some());

    chat.clear_chat().await;
    assert!(chat.current_messages().await.is_empty());
    assert!(chat.error().is_none());
}

#[tokio::test]
async fn test_config_and_policy_updates_apply_to_next_turn() {
    let client = FakeClient::new();
    client.push(reply(&["ok"]));
    let chat = orchestrator(client.clone());

    chat.update_config(ChatConfigUpdate {
        model: Some("other-model".to_string()),
        system_message: Some("Be brief.".to_string()),
        ..Default::default()
    })
    .await
    .unwrap();
    chat.update_context_policy(ContextPolicyUpdate {
        max_messages: Some(50),
        ..Default::default()
    })
    .await;

    chat.send_message("Hello").await;

    let request = client.last_stream_request();
    assert_eq!(request.model, "other-model");
    assert_eq!(request.messages[0], ChatMessage::system("Be brief."));
    assert_eq!(chat.context_stats().await.max_messages, 50);
}

#[tokio::test]
async fn test_context_stats_for_current_session() {
    let client = FakeClient::new();
    client.push(reply(&["abcd"]));
    let chat = orchestrator(client);

    chat.send_message("abcd").await;

    let stats = chat.context_stats().await;
    assert_eq!(stats.message_count, 2);
    assert_eq!(stats.estimated_tokens, 22);
    assert!(!stats.needs_management);
}
