//! Services built from TOML configuration.

use chrono::NaiveDate;
use medremind::config::TtsBackend;
use medremind::{NewMedicine, ReminderConfig, ReminderService};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{join_all, new_medicine};

fn write_config(dir: &std::path::Path, body: &str) -> ReminderConfig {
    let path = dir.join("config.toml");
    std::fs::write(&path, body).unwrap();
    ReminderConfig::from_file(&path).unwrap()
}

#[tokio::test]
async fn gtts_settings_flow_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/translate_tts"))
        .and(query_param("tl", "de"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3data".to_vec()))
        .mount(&mock_server)
        .await;

    let config = write_config(
        dir.path(),
        &format!(
            r#"
[store]
path = "{store}"

[tts]
timeout_secs = 5
audio_dir = "{audio}"

[tts.gtts]
lang = "de"
base_url = "{base}"
"#,
            store = dir.path().join("med_data.json").display(),
            audio = dir.path().join("audio").display(),
            base = mock_server.uri(),
        ),
    );
    assert_eq!(config.tts.backend, TtsBackend::Gtts);

    let service = ReminderService::new(&config);
    let id = service
        .add_medicine(new_medicine("Aspirin", "100mg", &["08:00"]))
        .await
        .unwrap();
    let entry = service.trigger_now(Some(id)).await.unwrap();
    assert!(entry.error.is_none(), "{:?}", entry.error);
    assert!(entry.audio.unwrap().ends_with(".mp3"));
    assert!(dir.path().join("med_data.json").is_file());
    service.shutdown().await;
}

#[tokio::test]
async fn disabled_backend_with_failing_fallback_records_both() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            r#"
[store]
path = "{store}"

[tts]
backend = "disabled"
fallbacks = ["disabled"]
audio_dir = "{audio}"
"#,
            store = dir.path().join("med_data.json").display(),
            audio = dir.path().join("audio").display(),
        ),
    );

    let service = ReminderService::new(&config);
    service
        .add_medicine(new_medicine("A", "", &["08:00"]))
        .await
        .unwrap();
    let entry = service.trigger_now(None).await.unwrap();
    let error = entry.error.unwrap();
    assert!(error.contains("all speakers failed"), "{error}");
    service.shutdown().await;
}

#[tokio::test]
async fn date_window_is_enforced_for_scheduled_firings_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            r#"
[store]
path = "{store}"

[scheduler]
respect_date_range = true

[tts]
backend = "disabled"
audio_dir = "{audio}"
"#,
            store = dir.path().join("med_data.json").display(),
            audio = dir.path().join("audio").display(),
        ),
    );

    let service = ReminderService::new(&config);
    service.start().await.unwrap();
    let expired = NewMedicine {
        name: "Old course".to_owned(),
        dose: String::new(),
        times: vec!["08:00".to_owned()],
        start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2020, 1, 31).unwrap(),
    };
    let id = service.add_medicine(expired).await.unwrap();

    let due = service.bindings()[0].next_due;
    assert_eq!(join_all(service.scheduler().tick_at(due)).await, 1);
    assert!(service.recent_history(10).await.unwrap().is_empty());

    // Manual trigger ignores the window.
    service.trigger_now(Some(id)).await.unwrap();
    assert_eq!(service.recent_history(10).await.unwrap().len(), 1);
    service.shutdown().await;
}
