//! End-to-end behaviour of the reminder service against a real store file.

use medremind::ReminderError;
use medremind::store::parse_times_list;
use uuid::Uuid;

use crate::helpers::{join_all, new_medicine, temp_service};

#[tokio::test]
async fn aspirin_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let service = temp_service(dir.path());
    service.start().await.unwrap();

    let id = service
        .add_medicine(new_medicine("Aspirin", "100mg", &["08:00"]))
        .await
        .unwrap();

    let bindings = service.bindings();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].key.medicine_id, id);
    assert_eq!(bindings[0].key.time.to_string(), "08:00");
    assert_eq!(bindings[0].key.to_string(), format!("reminder-{id}-08:00"));

    let entry = service.trigger_now(Some(id)).await.unwrap();
    assert!(entry.message.contains("Aspirin"));
    assert_eq!(entry.med_name, "Aspirin");
    assert_eq!(entry.med_id, id);

    let history = service.recent_history(10).await.unwrap();
    assert_eq!(history, vec![entry]);
    service.shutdown().await;
}

#[tokio::test]
async fn two_medicines_at_same_time_both_fire() {
    let dir = tempfile::tempdir().unwrap();
    let service = temp_service(dir.path());
    service.start().await.unwrap();
    let a = service
        .add_medicine(new_medicine("A", "", &["09:00"]))
        .await
        .unwrap();
    let b = service
        .add_medicine(new_medicine("B", "", &["09:00"]))
        .await
        .unwrap();

    let bindings = service.bindings();
    assert_eq!(bindings.len(), 2);
    let due = bindings[0].next_due;
    assert_eq!(bindings[1].next_due, due);

    let fired = join_all(service.scheduler().tick_at(due)).await;
    assert_eq!(fired, 2);

    let mut fired_ids: Vec<Uuid> = service
        .recent_history(10)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.med_id)
        .collect();
    fired_ids.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(fired_ids, expected);
    service.shutdown().await;
}

#[tokio::test]
async fn duplicate_times_collapse_to_one_trigger() {
    let dir = tempfile::tempdir().unwrap();
    let service = temp_service(dir.path());
    service.start().await.unwrap();
    service
        .add_medicine(new_medicine("A", "", &["9:00", "09:00", "21:00"]))
        .await
        .unwrap();
    assert_eq!(service.bindings().len(), 2);
    service.shutdown().await;
}

#[tokio::test]
async fn malformed_stored_time_does_not_block_other_triggers() {
    let dir = tempfile::tempdir().unwrap();
    let bad = Uuid::new_v4();
    let good = Uuid::new_v4();
    let json = format!(
        r#"{{
  "medicines": [
    {{"id": "{bad}", "name": "Broken", "dose": "", "times": ["25:99", "07:00"],
      "start_date": "2026-01-01", "end_date": "2026-12-31"}},
    {{"id": "{good}", "name": "Fine", "dose": "5ml", "times": ["10:00"],
      "start_date": "2026-01-01", "end_date": "2026-12-31"}}
  ],
  "history": []
}}"#
    );
    std::fs::write(dir.path().join("med_data.json"), json).unwrap();

    let service = temp_service(dir.path());
    let report = service.start().await.unwrap();
    assert_eq!(report.installed, 2);
    assert_eq!(report.warnings.len(), 1);
    match &report.warnings[0] {
        ReminderError::Schedule {
            medicine_id,
            medicine_name,
            value,
            ..
        } => {
            assert_eq!(*medicine_id, bad);
            assert_eq!(medicine_name, "Broken");
            assert_eq!(value, "25:99");
        }
        other => panic!("unexpected warning: {other}"),
    }

    let keys: Vec<String> = service
        .bindings()
        .iter()
        .map(|b| b.key.to_string())
        .collect();
    assert!(keys.contains(&format!("reminder-{bad}-07:00")));
    assert!(keys.contains(&format!("reminder-{good}-10:00")));
    service.shutdown().await;
}

#[tokio::test]
async fn delete_removes_triggers_but_keeps_history() {
    let dir = tempfile::tempdir().unwrap();
    let service = temp_service(dir.path());
    service.start().await.unwrap();
    let id = service
        .add_medicine(new_medicine("Ibuprofen", "200mg", &["12:00", "18:00"]))
        .await
        .unwrap();
    service.trigger_now(Some(id)).await.unwrap();

    service.delete_medicine(id).await.unwrap();
    assert!(service.bindings().is_empty());
    assert!(service.list_medicines().await.unwrap().is_empty());

    let history = service.recent_history(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].med_name, "Ibuprofen");

    assert!(matches!(
        service.delete_medicine(id).await,
        Err(ReminderError::NotFound(_))
    ));
    service.shutdown().await;
}

#[tokio::test]
async fn speech_failure_is_persisted_as_null_audio() {
    let dir = tempfile::tempdir().unwrap();
    let service = temp_service(dir.path());
    let id = service
        .add_medicine(new_medicine("Vitamin D", "1 capsule", &["08:00"]))
        .await
        .unwrap();

    let entry = service.trigger_now(Some(id)).await.unwrap();
    assert!(entry.audio.is_none());
    assert!(entry.error.is_some());

    let raw = std::fs::read_to_string(dir.path().join("med_data.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let stored = &value["history"][0];
    assert!(stored["audio"].is_null());
    assert!(stored["error"].as_str().unwrap().contains("disabled"));
    assert_eq!(
        stored["message"],
        "Reminder: time to take your medicine Vitamin D. Dose: 1 capsule"
    );
    service.shutdown().await;
}

#[tokio::test]
async fn history_is_append_only_and_listed_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let service = temp_service(dir.path());
    service
        .add_medicine(new_medicine("A", "", &["08:00"]))
        .await
        .unwrap();

    let mut fired = Vec::new();
    for _ in 0..3 {
        fired.push(service.trigger_now(None).await.unwrap());
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let recent = service.recent_history(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, fired[2].id);
    assert_eq!(recent[1].id, fired[1].id);
    assert_eq!(service.recent_history(10).await.unwrap().len(), 3);
    service.shutdown().await;
}

#[tokio::test]
async fn restarted_service_reinstalls_from_store() {
    let dir = tempfile::tempdir().unwrap();
    {
        let service = temp_service(dir.path());
        service
            .add_medicine(new_medicine("A", "", &["08:00", "20:00"]))
            .await
            .unwrap();
        service.shutdown().await;
    }

    let service = temp_service(dir.path());
    assert!(service.bindings().is_empty());
    assert_eq!(service.start().await.unwrap().installed, 2);
    service.shutdown().await;
}

#[tokio::test]
async fn mutations_before_start_schedule_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let service = temp_service(dir.path());
    service
        .add_medicine(new_medicine("A", "", &["08:00"]))
        .await
        .unwrap();

    assert!(!service.scheduler().is_running());
    assert!(service.bindings().is_empty());
    assert_eq!(service.start().await.unwrap().installed, 1);
    service.shutdown().await;
}

#[tokio::test]
async fn comma_separated_times_from_the_command_line() {
    let dir = tempfile::tempdir().unwrap();
    let service = temp_service(dir.path());
    service.start().await.unwrap();

    let mut new = new_medicine("A", "", &[]);
    new.times = parse_times_list(" 08:00, ,20:00 ");
    assert_eq!(new.times, vec!["08:00", "20:00"]);
    service.add_medicine(new).await.unwrap();
    assert_eq!(service.bindings().len(), 2);
    service.shutdown().await;
}
