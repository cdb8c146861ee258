use english_quiz_bot::quiz::Level;
use english_quiz_bot::results::ResultStore;
use teloxide::types::UserId;

async fn open(name: &str) -> ResultStore {
    let url = format!("sqlite:file:results_{name}?mode=memory&cache=shared");
    let store = ResultStore::connect(&url).await.expect("connect");
    store.migrate().await.expect("migrate");
    store
}

#[tokio::test]
async fn recent_is_newest_first_and_scoped_to_the_user() {
    let store = open("recent").await;
    let me = UserId(1);
    let other = UserId(2);

    for score in 0..7 {
        store.record(me, Level::Beginner, score, 20).await.unwrap();
    }
    store.record(other, Level::Advanced, 20, 20).await.unwrap();

    let rows = store.recent_for(me, 5).await.unwrap();
    let scores: Vec<u32> = rows.iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![6, 5, 4, 3, 2]);
    assert!(rows.iter().all(|r| r.user == me));
}

#[tokio::test]
async fn top_keeps_the_best_attempt_per_user_and_level() {
    let store = open("top").await;
    let u1 = UserId(10);
    let u2 = UserId(20);
    let u3 = UserId(30);

    store.record(u1, Level::Beginner, 7, 20).await.unwrap();
    store.record(u1, Level::Beginner, 15, 20).await.unwrap();
    store.record(u1, Level::Advanced, 12, 20).await.unwrap();
    store.record(u2, Level::Beginner, 15, 20).await.unwrap();
    store.record(u3, Level::Intermediate, 3, 20).await.unwrap();

    let rows = store.top_scores(10).await.unwrap();
    let entries: Vec<(u64, &str, u32)> = rows
        .iter()
        .map(|r| (r.user.0, r.level.key(), r.score))
        .collect();
    // One entry per (user, level); the tied 15s keep the earlier attempt first.
    assert_eq!(
        entries,
        vec![
            (10, "beginner", 15),
            (20, "beginner", 15),
            (10, "advanced", 12),
            (30, "intermediate", 3),
        ]
    );
}

#[tokio::test]
async fn top_respects_the_limit() {
    let store = open("top_limit").await;
    for user in 1u64..=4 {
        store
            .record(UserId(user), Level::Beginner, user as u32, 20)
            .await
            .unwrap();
    }

    let rows = store.top_scores(2).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].score, rows[1].score), (4, 3));
}

#[tokio::test]
async fn migrate_can_run_repeatedly() {
    let store = open("remigrate").await;
    store.migrate().await.expect("second migrate");

    store.record(UserId(1), Level::Beginner, 1, 20).await.unwrap();
    assert_eq!(store.recent_for(UserId(1), 5).await.unwrap().len(), 1);
}

#[tokio::test]
async fn record_surfaces_schema_failures() {
    let store = open("broken").await;
    sqlx::query("DROP TABLE results")
        .execute(store.pool())
        .await
        .unwrap();

    let err = store
        .record(UserId(1), Level::Beginner, 5, 20)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("results"));
}
