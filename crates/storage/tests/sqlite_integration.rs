use std::collections::BTreeMap;

use reframe_core::model::{Analysis, DeviceId, Streak, TaskPriority};
use reframe_core::time::fixed_now;
use storage::repository::{
    NewTaskRecord, SessionSnapshot, SessionStore, SettingsRepository, Storage, StreakStore,
    TaskRepository,
};

fn sample_analysis() -> Analysis {
    Analysis {
        perceived_problem: "Too busy to think".into(),
        real_problem: "No clear priorities".into(),
        why_it_happens: "Every request is treated as urgent".into(),
        common_mistakes: vec!["Adding more tools".into()],
        key_insights: vec!["Busy is not the same as productive".into()],
        root_causes: vec!["No saying no".into()],
        action_steps: vec!["Write down current commitments".into()],
        patterns: None,
        confidence: 84,
        clarity_score: 77,
    }
}

#[tokio::test]
async fn session_snapshot_round_trips_through_sqlite() {
    let storage = Storage::sqlite("sqlite::memory:").await.unwrap();

    assert!(storage.sessions.load_session().await.unwrap().is_none());

    let snapshot = SessionSnapshot {
        problem_text: "I feel stuck in my job".into(),
        questions: vec!["How long has this been going on?".into(), "What have you tried?".into()],
        answers: BTreeMap::from([(0, "About two years".into())]),
        current_question: 2,
        unlocked: true,
        analysis: Some(sample_analysis()),
        saved_at: fixed_now(),
    };
    storage.sessions.save_session(&snapshot).await.unwrap();

    let loaded = storage.sessions.load_session().await.unwrap().unwrap();
    assert_eq!(loaded, snapshot);

    // Overwrite keeps a single row.
    let mut updated = snapshot.clone();
    updated.problem_text = "Rewritten".into();
    storage.sessions.save_session(&updated).await.unwrap();
    let loaded = storage.sessions.load_session().await.unwrap().unwrap();
    assert_eq!(loaded.problem_text, "Rewritten");

    storage.sessions.clear_session().await.unwrap();
    assert!(storage.sessions.load_session().await.unwrap().is_none());
}

#[tokio::test]
async fn tasks_persist_and_complete() {
    let storage = Storage::sqlite("sqlite::memory:").await.unwrap();

    let id = storage
        .tasks
        .insert_new_task(NewTaskRecord {
            title: "Write down commitments".into(),
            description: "List everything currently on your plate".into(),
            day: 1,
            duration: Some("20 min".into()),
            priority: TaskPriority::High,
            created_at: fixed_now(),
        })
        .await
        .unwrap();

    let mut task = storage.tasks.get_task(id).await.unwrap().unwrap();
    assert_eq!(task.title(), "Write down commitments");
    assert_eq!(task.priority(), TaskPriority::High);
    assert!(!task.is_completed());

    task.complete(fixed_now()).unwrap();
    task.set_notes(Some("Done over coffee".into()));
    storage.tasks.update_task(&task).await.unwrap();

    let fetched = storage.tasks.get_task(id).await.unwrap().unwrap();
    assert!(fetched.is_completed());
    assert_eq!(fetched.completed_at(), Some(fixed_now()));
    assert_eq!(fetched.notes(), Some("Done over coffee"));

    storage.tasks.delete_task(id).await.unwrap();
    assert!(storage.tasks.get_task(id).await.unwrap().is_none());
}

#[tokio::test]
async fn tasks_list_in_day_order() {
    let storage = Storage::sqlite("sqlite::memory:").await.unwrap();
    for (title, day) in [("later", 7_u16), ("first", 1), ("middle", 3)] {
        storage
            .tasks
            .insert_new_task(NewTaskRecord {
                title: title.into(),
                description: String::new(),
                day,
                duration: None,
                priority: TaskPriority::Medium,
                created_at: fixed_now(),
            })
            .await
            .unwrap();
    }

    let tasks = storage.tasks.list_tasks().await.unwrap();
    let titles: Vec<&str> = tasks.iter().map(|t| t.title()).collect();
    assert_eq!(titles, ["first", "middle", "later"]);

    storage.tasks.clear_tasks().await.unwrap();
    assert!(storage.tasks.list_tasks().await.unwrap().is_empty());
}

#[tokio::test]
async fn streak_mirror_round_trips() {
    let storage = Storage::sqlite("sqlite::memory:").await.unwrap();
    assert!(storage.streaks.load_streak().await.unwrap().is_none());

    let mut streak = Streak::from_counts(2, 4);
    storage.streaks.save_streak(&streak).await.unwrap();
    assert_eq!(storage.streaks.load_streak().await.unwrap(), Some(streak));

    streak.record_completion();
    storage.streaks.save_streak(&streak).await.unwrap();
    let loaded = storage.streaks.load_streak().await.unwrap().unwrap();
    assert_eq!(loaded.current(), 3);
    assert_eq!(loaded.best(), 4);
}

#[tokio::test]
async fn device_id_round_trips() {
    let storage = Storage::sqlite("sqlite::memory:").await.unwrap();
    assert!(storage.settings.get_device_id().await.unwrap().is_none());

    let id = DeviceId::generate();
    storage.settings.set_device_id(id).await.unwrap();
    assert_eq!(storage.settings.get_device_id().await.unwrap(), Some(id));
}
