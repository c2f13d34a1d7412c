//! End-to-end conversation tests against scripted model, speech and microphone backends

mod common;

use common::{Harness, Reply, ScriptedClient};
use echo_tutor::integration::{
    ControllerEvent, StreamEvent, TutorConfig, INIT_ERROR_MESSAGE, NOT_INITIALIZED_MESSAGE,
};
use echo_tutor::llm::prompts::{FALLBACK_REPLY, GREETING, SYSTEM_PROMPT};
use echo_tutor::messages::{MessageId, TYPING_ID};
use echo_tutor::speech::{RecognitionEvent, RecognitionSegment, VoiceGender};
use echo_tutor::TutorError;
use std::time::{Duration, Instant};
use uuid::Uuid;

fn quiet_config() -> TutorConfig {
    TutorConfig::default().without_voice_output()
}

#[tokio::test]
async fn test_initialize_seeds_greeting() {
    let mut h = Harness::new(quiet_config(), ScriptedClient::new());
    h.controller.initialize().unwrap();

    let messages = h.controller.transcript().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id.as_str(), MessageId::INIT);
    assert_eq!(messages[0].text, GREETING);
    assert!(messages[0].is_ai());
    assert!(!h.controller.is_loading());
    assert!(h.controller.error().is_none());
    assert_eq!(*h.client.system_prompts.lock(), vec![SYSTEM_PROMPT.to_string()]);
}

#[tokio::test]
async fn test_initialize_failure_sets_error() {
    let mut h = Harness::new(quiet_config(), ScriptedClient::unavailable());

    let result = h.controller.initialize();
    assert!(matches!(result, Err(TutorError::Init(_))));
    assert_eq!(h.controller.error(), Some(INIT_ERROR_MESSAGE));
    assert!(h.controller.transcript().is_empty());
    assert!(!h.controller.is_loading());
    assert!(!h.controller.is_initialized());
}

#[tokio::test]
async fn test_send_before_initialize() {
    let mut h = Harness::new(quiet_config(), ScriptedClient::new());

    let result = h.controller.send_message("Hello");
    assert!(matches!(result, Err(TutorError::NotInitialized)));
    assert_eq!(h.controller.error(), Some(NOT_INITIALIZED_MESSAGE));
    assert!(h.controller.transcript().is_empty());
    assert!(!h.controller.is_loading());
    assert!(h.client.sent.lock().is_empty());
}

#[tokio::test]
async fn test_streamed_reply_becomes_message() {
    let client = ScriptedClient::new();
    client.push_reply(Reply::chunks(&["Hi", " there", "!"]));
    let mut h = Harness::new(quiet_config(), client);
    h.controller.initialize().unwrap();

    let request_id = h.controller.send_message("Hello").unwrap();
    assert!(h.controller.is_loading());
    let pending = h.controller.transcript().pending().unwrap();
    assert_eq!(pending.request_id, request_id);
    assert!(pending.text.is_empty());

    let events = h.settle().await;
    assert!(events.contains(&ControllerEvent::StateChanged));

    let messages = h.controller.transcript().messages();
    assert_eq!(messages.len(), 3);
    assert!(messages[1].is_user());
    assert_eq!(messages[1].text, "Hello");
    assert!(messages[2].is_ai());
    assert_eq!(messages[2].text, "Hi there!");
    assert_ne!(messages[2].id.as_str(), TYPING_ID);
    assert_ne!(messages[2].id.as_str(), MessageId::INIT);

    assert!(h.controller.transcript().pending().is_none());
    assert!(!h.controller.is_loading());
    assert!(h.controller.error().is_none());
    assert_eq!(*h.client.sent.lock(), vec!["Hello".to_string()]);
}

#[tokio::test]
async fn test_single_typing_entry_while_streaming() {
    let client = ScriptedClient::new();
    let (reply, chunks) = Reply::gated();
    client.push_reply(reply);
    let mut h = Harness::new(quiet_config(), client);
    h.controller.initialize().unwrap();
    h.controller.send_message("How are you?").unwrap();

    chunks.unbounded_send(Ok("I'm".to_string())).unwrap();
    h.poll_until(|c| c.transcript().pending().is_some_and(|p| p.text == "I'm"))
        .await;

    chunks.unbounded_send(Ok(" fine".to_string())).unwrap();
    h.poll_until(|c| c.transcript().pending().is_some_and(|p| p.text == "I'm fine"))
        .await;

    let transcript = h.controller.transcript();
    let typing: Vec<_> = transcript.entries().filter(|e| e.is_pending()).collect();
    assert_eq!(typing.len(), 1);
    let last = transcript.entries().last().unwrap();
    assert_eq!(last.id(), TYPING_ID);
    assert_eq!(last.text(), "I'm fine");
    assert!(h.controller.is_loading());

    drop(chunks);
    h.settle().await;

    let transcript = h.controller.transcript();
    assert!(transcript.entries().all(|e| !e.is_pending()));
    assert_eq!(transcript.messages().last().unwrap().text, "I'm fine");
}

#[tokio::test]
async fn test_error_mid_stream_leaves_fallback() {
    let client = ScriptedClient::new();
    client.push_reply(Reply::failing_after(&["Partial"], "network down"));
    let mut h = Harness::new(quiet_config(), client);
    h.controller.initialize().unwrap();
    h.controller.send_message("Hello").unwrap();

    let events = h.settle().await;

    let messages = h.controller.transcript().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].text, "Hello");
    assert_eq!(messages[2].text, FALLBACK_REPLY);
    assert!(messages[2].is_ai());
    assert!(messages.iter().all(|m| m.text != "Partial"));
    assert!(h.controller.transcript().pending().is_none());

    assert!(!h.controller.is_loading());
    let error = h.controller.error().unwrap();
    assert!(error.contains("network down"));
    assert!(events
        .iter()
        .any(|e| matches!(e, ControllerEvent::Error(msg) if msg.contains("network down"))));
}

#[tokio::test]
async fn test_error_before_first_chunk() {
    let client = ScriptedClient::new();
    client.push_reply(Reply::failing_after(&[], "quota exceeded"));
    let mut h = Harness::new(quiet_config(), client);
    h.controller.initialize().unwrap();
    h.controller.send_message("Hello").unwrap();

    h.settle().await;

    let messages = h.controller.transcript().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2].text, FALLBACK_REPLY);
    assert!(h.controller.error().unwrap().contains("quota exceeded"));
    assert!(!h.controller.is_loading());
}

#[tokio::test]
async fn test_conversation_continues_after_error() {
    let client = ScriptedClient::new();
    client.push_reply(Reply::failing_after(&[], "timeout"));
    client.push_reply(Reply::chunks(&["Welcome back."]));
    let mut h = Harness::new(quiet_config(), client);
    h.controller.initialize().unwrap();

    h.controller.send_message("First").unwrap();
    h.settle().await;
    assert!(h.controller.error().is_some());

    h.controller.clear_error();
    h.controller.send_message("Second").unwrap();
    h.settle().await;

    let texts: Vec<_> = h
        .controller
        .transcript()
        .messages()
        .iter()
        .map(|m| m.text.as_str())
        .collect();
    assert_eq!(texts, vec![GREETING, "First", FALLBACK_REPLY, "Second", "Welcome back."]);
    assert!(h.controller.error().is_none());
}

#[tokio::test]
async fn test_superseded_request_events_are_ignored() {
    let client = ScriptedClient::new();
    let (first, first_chunks) = Reply::gated();
    client.push_reply(first);
    client.push_reply(Reply::chunks(&["Second answer"]));
    let mut h = Harness::new(quiet_config(), client);
    h.controller.initialize().unwrap();

    let first_id = h.controller.send_message("one").unwrap();
    let second_id = h.controller.send_message("two").unwrap();
    assert_ne!(first_id, second_id);
    assert_eq!(h.controller.transcript().pending().unwrap().request_id, second_id);

    h.settle().await;

    first_chunks.unbounded_send(Ok("late".to_string())).unwrap();
    drop(first_chunks);
    for _ in 0..10 {
        h.controller.poll(Instant::now());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let texts: Vec<_> = h
        .controller
        .transcript()
        .messages()
        .iter()
        .map(|m| m.text.as_str())
        .collect();
    assert_eq!(texts, vec![GREETING, "one", "two", "Second answer"]);
    assert!(h.controller.transcript().pending().is_none());
    assert!(!h.controller.is_loading());
    assert!(h.controller.error().is_none());
}

#[tokio::test]
async fn test_unknown_request_event_is_dropped() {
    let mut h = Harness::new(quiet_config(), ScriptedClient::new());
    h.controller.initialize().unwrap();
    let revision = h.controller.transcript().revision();

    let mut events = Vec::new();
    let applied = h.controller.apply_stream_event(
        StreamEvent::Chunk {
            request_id: Uuid::new_v4(),
            text: "ghost".to_string(),
        },
        &mut events,
    );
    assert!(!applied);

    let applied = h.controller.apply_stream_event(
        StreamEvent::Failed {
            request_id: Uuid::new_v4(),
            error: "ghost".to_string(),
        },
        &mut events,
    );
    assert!(!applied);
    assert!(events.is_empty());
    assert_eq!(h.controller.transcript().revision(), revision);
    assert!(h.controller.error().is_none());
}

#[tokio::test]
async fn test_each_reply_is_spoken_once() {
    let client = ScriptedClient::new();
    client.push_reply(Reply::chunks(&["Great ", "question."]));
    let mut h = Harness::new(TutorConfig::default(), client);
    h.controller.initialize().unwrap();

    h.poll_until(|c| c.voice_output().speaking).await;
    assert_eq!(h.spoken_texts(), vec![GREETING.to_string()]);
    assert_eq!(h.synth.lock().spoken[0].voice.id, "en-us+f3");

    for _ in 0..5 {
        h.controller.poll(Instant::now());
    }
    h.finish_speech();
    h.poll_until(|c| !c.voice_output().speaking).await;
    for _ in 0..5 {
        h.controller.poll(Instant::now());
    }
    assert_eq!(h.spoken_texts().len(), 1);

    h.controller.send_message("Why?").unwrap();
    h.settle().await;
    h.poll_until(|c| c.voice_output().speaking).await;
    assert_eq!(
        h.spoken_texts(),
        vec![GREETING.to_string(), "Great question.".to_string()]
    );

    let last_id = h.controller.transcript().messages().last().unwrap().id.clone();
    assert_eq!(h.controller.voice_output().last_spoken_message_id, Some(last_id));

    h.finish_speech();
    h.poll_until(|c| !c.voice_output().speaking).await;
    for _ in 0..5 {
        h.controller.poll(Instant::now());
    }
    assert_eq!(h.spoken_texts().len(), 2);
}

#[tokio::test]
async fn test_fallback_reply_is_spoken() {
    let client = ScriptedClient::new();
    client.push_reply(Reply::failing_after(&[], "offline"));
    let mut h = Harness::new(TutorConfig::default(), client);
    h.controller.initialize().unwrap();
    h.poll_until(|c| c.voice_output().speaking).await;
    h.finish_speech();
    h.poll_until(|c| !c.voice_output().speaking).await;

    h.controller.send_message("Hello").unwrap();
    h.settle().await;
    h.poll_until(|c| c.voice_output().speaking).await;
    assert_eq!(h.spoken_texts().last().map(String::as_str), Some(FALLBACK_REPLY));
}

#[tokio::test]
async fn test_disabling_voice_stops_speech() {
    let mut h = Harness::new(TutorConfig::default(), ScriptedClient::new());
    h.controller.initialize().unwrap();
    h.poll_until(|c| c.voice_output().speaking).await;
    let stops_before = h.synth.lock().stops;

    assert!(!h.controller.toggle_voice_output());
    assert!(!h.controller.voice_output().enabled);
    assert!(!h.controller.voice_output().speaking);
    assert!(h.synth.lock().stops > stops_before);

    // the greeting already counts as spoken
    assert!(h.controller.toggle_voice_output());
    h.controller.poll(Instant::now());
    assert_eq!(h.spoken_texts().len(), 1);
    assert!(!h.controller.voice_output().speaking);
}

#[tokio::test]
async fn test_gender_change_respeaks_with_new_voice() {
    let mut h = Harness::new(TutorConfig::default(), ScriptedClient::new());
    h.controller.initialize().unwrap();
    h.poll_until(|c| c.voice_output().speaking).await;
    assert!(h.controller.has_voice_options());

    h.controller.set_voice_gender(VoiceGender::Male);

    let spoken = h.synth.lock().spoken.clone();
    assert_eq!(spoken.len(), 2);
    assert_eq!(spoken[1].text, GREETING);
    assert_eq!(spoken[1].voice.id, "en-us");
    assert_eq!(h.controller.voice_output().gender, VoiceGender::Male);
    assert!(h.controller.voice_output().speaking);

    // same gender again is a no-op
    h.controller.set_voice_gender(VoiceGender::Male);
    assert_eq!(h.spoken_texts().len(), 2);
}

#[tokio::test]
async fn test_gender_change_while_idle_does_not_respeak() {
    let mut h = Harness::new(TutorConfig::default(), ScriptedClient::new());
    h.controller.initialize().unwrap();
    h.poll_until(|c| c.voice_output().speaking).await;
    h.finish_speech();
    h.poll_until(|c| !c.voice_output().speaking).await;

    h.controller.set_voice_gender(VoiceGender::Male);
    h.controller.poll(Instant::now());
    assert_eq!(h.spoken_texts().len(), 1);
    assert_eq!(
        h.controller.voice_output().selected_voice.as_ref().map(|v| v.id.as_str()),
        Some("en-us")
    );
}

#[tokio::test]
async fn test_sending_cancels_speech() {
    let client = ScriptedClient::new();
    let (reply, _chunks) = Reply::gated();
    client.push_reply(reply);
    let mut h = Harness::new(TutorConfig::default(), client);
    h.controller.initialize().unwrap();
    h.poll_until(|c| c.voice_output().speaking).await;

    h.controller.send_message("Wait").unwrap();
    assert!(!h.controller.voice_output().speaking);

    // nothing is spoken while the reply is loading
    h.controller.poll(Instant::now());
    assert_eq!(h.spoken_texts().len(), 1);
}

#[tokio::test]
async fn test_background_cancels_speech() {
    let mut h = Harness::new(TutorConfig::default(), ScriptedClient::new());
    h.controller.initialize().unwrap();
    h.poll_until(|c| c.voice_output().speaking).await;

    h.controller.on_background();
    assert!(!h.controller.voice_output().speaking);
    assert!(h.synth.lock().stops > 0);
}

#[tokio::test]
async fn test_silence_auto_sends_once() {
    let client = ScriptedClient::new();
    client.push_reply(Reply::chunks(&["It is sunny."]));
    let mut h = Harness::new(quiet_config(), client);
    h.controller.initialize().unwrap();

    h.controller.start_listening().unwrap();
    assert!(h.controller.voice_input().listening);
    assert_eq!(h.mic.lock().starts, 1);

    let start = Instant::now();
    h.mic_events.send(RecognitionEvent::Started).unwrap();
    h.mic_events
        .send(RecognitionEvent::Result(vec![RecognitionSegment::final_text(
            "what is the weather",
        )]))
        .unwrap();
    h.controller.poll(start);
    assert_eq!(h.controller.voice_input().transcript, "what is the weather ");

    h.controller.poll(start + Duration::from_millis(600));
    assert_eq!(h.mic.lock().stops, 0);

    h.controller.poll(start + Duration::from_millis(1300));
    assert_eq!(h.mic.lock().stops, 1);

    h.mic_events.send(RecognitionEvent::Ended).unwrap();
    let events = h.controller.poll(start + Duration::from_millis(1400));
    assert!(events.contains(&ControllerEvent::AutoSent("what is the weather".to_string())));
    assert!(!h.controller.voice_input().listening);
    assert!(h.controller.voice_input().transcript.is_empty());

    h.settle().await;
    for _ in 0..5 {
        h.controller.poll(Instant::now());
    }
    assert_eq!(*h.client.sent.lock(), vec!["what is the weather".to_string()]);

    let texts: Vec<_> = h
        .controller
        .transcript()
        .messages()
        .iter()
        .map(|m| m.text.as_str())
        .collect();
    assert_eq!(texts, vec![GREETING, "what is the weather", "It is sunny."]);
}

#[tokio::test]
async fn test_manual_stop_does_not_send() {
    let mut h = Harness::new(quiet_config(), ScriptedClient::new());
    h.controller.initialize().unwrap();
    h.controller.start_listening().unwrap();

    let now = Instant::now();
    h.mic_events.send(RecognitionEvent::Started).unwrap();
    h.mic_events
        .send(RecognitionEvent::Result(vec![RecognitionSegment::final_text("hello there")]))
        .unwrap();
    h.controller.poll(now);

    h.controller.stop_listening();
    assert_eq!(h.mic.lock().stops, 1);

    h.mic_events.send(RecognitionEvent::Ended).unwrap();
    let events = h.controller.poll(now + Duration::from_secs(5));
    assert!(!events.iter().any(|e| matches!(e, ControllerEvent::AutoSent(_))));
    assert!(h.client.sent.lock().is_empty());
    assert!(!h.controller.voice_input().listening);
    assert_eq!(h.controller.voice_input().transcript.trim(), "hello there");
}

#[tokio::test]
async fn test_typing_stops_listening_without_sending() {
    let mut h = Harness::new(quiet_config(), ScriptedClient::new());
    h.controller.initialize().unwrap();
    h.controller.start_listening().unwrap();

    let now = Instant::now();
    h.mic_events.send(RecognitionEvent::Started).unwrap();
    h.mic_events
        .send(RecognitionEvent::Result(vec![RecognitionSegment::final_text("I goed")]))
        .unwrap();
    h.controller.poll(now);

    h.controller.input_edited();
    assert_eq!(h.mic.lock().stops, 1);

    h.mic_events.send(RecognitionEvent::Ended).unwrap();
    h.controller.poll(now + Duration::from_secs(5));
    assert!(h.client.sent.lock().is_empty());

    // typing while idle leaves the microphone alone
    h.controller.input_edited();
    assert_eq!(h.mic.lock().stops, 1);
}

#[tokio::test]
async fn test_auto_send_disabled() {
    let mut h = Harness::new(quiet_config().without_auto_send(), ScriptedClient::new());
    h.controller.initialize().unwrap();
    h.controller.start_listening().unwrap();

    let now = Instant::now();
    h.mic_events.send(RecognitionEvent::Started).unwrap();
    h.mic_events
        .send(RecognitionEvent::Result(vec![RecognitionSegment::final_text("hello")]))
        .unwrap();
    h.controller.poll(now);

    // no silence timer without auto-send
    h.controller.poll(now + Duration::from_secs(10));
    assert_eq!(h.mic.lock().stops, 0);
    assert!(h.controller.voice_input().listening);
    assert!(h.client.sent.lock().is_empty());
}

#[tokio::test]
async fn test_recognition_error_is_reported() {
    let mut h = Harness::new(quiet_config(), ScriptedClient::new());
    h.controller.initialize().unwrap();
    h.controller.start_listening().unwrap();

    h.mic_events.send(RecognitionEvent::Started).unwrap();
    h.mic_events
        .send(RecognitionEvent::Error("audio-capture".to_string()))
        .unwrap();
    h.mic_events.send(RecognitionEvent::Ended).unwrap();
    h.controller.poll(Instant::now());

    let input = h.controller.voice_input();
    assert!(!input.listening);
    assert_eq!(
        input.last_error.as_deref(),
        Some("Speech recognition error: audio-capture")
    );
    assert!(h.client.sent.lock().is_empty());
}
