//! Google TTS backend against a mock HTTP server.

use std::sync::Arc;

use medremind::ReminderError;
use medremind::tts::{FallbackSpeaker, GttsSpeaker, Speaker};
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{new_medicine, service_with_speaker};

const FAKE_MP3: &[u8] = b"ID3\x03\x00fake-mp3-frame";

#[tokio::test]
async fn speak_sends_expected_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/translate_tts"))
        .and(query_param("client", "tw-ob"))
        .and(query_param("tl", "en"))
        .and(query_param("q", "Take your medicine"))
        .and(query_param("idx", "0"))
        .and(query_param("total", "1"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(FAKE_MP3))
        .expect(1)
        .mount(&mock_server)
        .await;

    let speaker = GttsSpeaker::new(mock_server.uri(), "en");
    let audio = speaker.speak("Take your medicine").await.unwrap();
    assert_eq!(audio.bytes.as_ref(), FAKE_MP3);
    assert_eq!(audio.extension, "mp3");
}

#[tokio::test]
async fn long_text_is_fetched_in_chunks() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/translate_tts"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(FAKE_MP3))
        .expect(2)
        .mount(&mock_server)
        .await;

    let text = "Hello. This is your medicine reminder. It's time to take Aspirin. \
                100mg. Take it now and you will feel better.";
    assert!(text.chars().count() > 100);

    let speaker = GttsSpeaker::new(mock_server.uri(), "en");
    let audio = speaker.speak(text).await.unwrap();
    assert_eq!(audio.bytes.len(), FAKE_MP3.len() * 2);
}

#[tokio::test]
async fn http_error_is_synthesis_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/translate_tts"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let speaker = GttsSpeaker::new(mock_server.uri(), "en");
    let err = speaker.speak("hello").await.unwrap_err();
    assert!(matches!(err, ReminderError::Synthesis(ref m) if m.contains("429")), "{err}");
}

#[tokio::test]
async fn reminder_writes_mp3_from_gtts() {
    let dir = tempfile::tempdir().unwrap();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/translate_tts"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(FAKE_MP3))
        .mount(&mock_server)
        .await;

    let speaker = Arc::new(GttsSpeaker::new(mock_server.uri(), "en"));
    let service = service_with_speaker(dir.path(), speaker);
    let id = service
        .add_medicine(new_medicine("Aspirin", "100mg", &["08:00"]))
        .await
        .unwrap();

    let entry = service.trigger_now(Some(id)).await.unwrap();
    assert!(entry.error.is_none());
    let audio = std::path::PathBuf::from(entry.audio.unwrap());
    assert_eq!(
        audio.file_name().unwrap().to_str().unwrap(),
        format!("reminder-{}.mp3", entry.id)
    );
    assert!(audio.starts_with(dir.path().join("reminder_audio")));
    assert!(std::fs::read(&audio).unwrap().starts_with(b"ID3"));
    service.shutdown().await;
}

#[tokio::test]
async fn server_failure_records_error_on_entry() {
    let dir = tempfile::tempdir().unwrap();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/translate_tts"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let speaker = Arc::new(GttsSpeaker::new(mock_server.uri(), "en"));
    let service = service_with_speaker(dir.path(), speaker);
    let id = service
        .add_medicine(new_medicine("Aspirin", "100mg", &["08:00"]))
        .await
        .unwrap();

    let entry = service.trigger_now(Some(id)).await.unwrap();
    assert!(entry.audio.is_none());
    assert!(entry.error.unwrap().contains("gtts HTTP 500"));
    assert!(!dir.path().join("reminder_audio").exists());
    service.shutdown().await;
}

#[tokio::test]
async fn fallback_uses_second_server() {
    let broken = MockServer::start().await;
    let working = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&broken)
        .await;
    Mock::given(method("GET"))
        .and(path("/translate_tts"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(FAKE_MP3))
        .expect(1)
        .mount(&working)
        .await;

    let speakers: Vec<Arc<dyn Speaker>> = vec![
        Arc::new(GttsSpeaker::new(broken.uri(), "en")),
        Arc::new(GttsSpeaker::new(working.uri(), "en")),
    ];
    let chain = FallbackSpeaker::new(speakers);
    let audio = chain.speak("hello").await.unwrap();
    assert_eq!(audio.bytes.as_ref(), FAKE_MP3);
}
