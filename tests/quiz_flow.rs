use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use english_quiz_bot::error::QuizError;
use english_quiz_bot::quiz::bank::QuestionBank;
use english_quiz_bot::quiz::engine::{QuizEngine, QUIZ_LEN};
use english_quiz_bot::quiz::session::SessionStore;
use english_quiz_bot::quiz::Level;
use english_quiz_bot::results::ResultStore;
use serde_json::json;
use teloxide::types::UserId;

/// Writes a bank of `per_level` questions per level where option 0 is always
/// the right answer.
fn write_question_files(tag: &str, per_level: usize) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("quiz-flow-{}-{}", tag, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    for level in Level::ALL {
        let questions: Vec<_> = (0..per_level)
            .map(|i| {
                json!({
                    "text": format!("{} question {}", level.key(), i),
                    "options": ["right", "wrong", "also wrong"],
                    "correct": 0
                })
            })
            .collect();
        fs::write(
            dir.join(format!("{}.json", level.key())),
            serde_json::to_vec_pretty(&questions).unwrap(),
        )
        .unwrap();
    }
    dir
}

async fn engine_with(tag: &str, per_level: usize) -> (Arc<QuizEngine>, ResultStore) {
    let dir = write_question_files(tag, per_level);
    let bank = QuestionBank::load(&dir).expect("load bank");
    let url = format!("sqlite:file:flow_{tag}?mode=memory&cache=shared");
    let results = ResultStore::connect(&url).await.expect("connect");
    results.migrate().await.expect("migrate");
    let engine = QuizEngine::new(bank, SessionStore::new(), results.clone());
    (Arc::new(engine), results)
}

#[tokio::test]
async fn a_full_quiz_over_a_real_bank_records_one_result() {
    let (engine, results) = engine_with("full", 3).await;
    let user = UserId(42);

    let opening = engine.start_quiz(user, Level::Beginner).await;
    assert!(opening[1].text.contains("Вопрос 1 из 3"));

    for _ in 0..2 {
        let submitted = engine.submit_answer(user, 0).await.unwrap();
        assert!(submitted.followup.is_some());
    }
    let last = engine.submit_answer(user, 0).await.unwrap();
    assert!(last.followup.is_none());
    assert!(last
        .replies
        .iter()
        .any(|r| r.text.contains("Ваш результат: 3 из 3")));

    let rows = results.recent_for(user, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!((rows[0].score, rows[0].total), (3, 3));
    assert_eq!(rows[0].level, Level::Beginner);
}

#[tokio::test]
async fn a_large_bank_is_capped_at_the_quiz_length() {
    let (engine, _results) = engine_with("capped", 30).await;
    let user = UserId(43);

    let opening = engine.start_quiz(user, Level::Advanced).await;
    assert!(opening[1].text.contains(&format!("из {}", QUIZ_LEN)));
}

#[tokio::test]
async fn answering_with_no_quiz_in_flight_prompts_to_start() {
    let (engine, _results) = engine_with("idle", 3).await;
    let err = engine.submit_answer(UserId(44), 0).await.unwrap_err();
    assert_eq!(err, QuizError::NoActiveSession);
    assert!(err.user_message().contains("/start"));
}

#[tokio::test]
async fn two_users_run_independent_quizzes() {
    let (engine, results) = engine_with("pair", 3).await;
    let alice = UserId(45);
    let bob = UserId(46);

    engine.start_quiz(alice, Level::Beginner).await;
    engine.start_quiz(bob, Level::Advanced).await;

    // Interleaved turns: Alice is always right, Bob only once.
    engine.submit_answer(alice, 0).await.unwrap();
    engine.submit_answer(bob, 0).await.unwrap();
    engine.submit_answer(alice, 0).await.unwrap();
    engine.submit_answer(bob, 1).await.unwrap();
    engine.submit_answer(alice, 0).await.unwrap();
    engine.submit_answer(bob, 1).await.unwrap();

    let alice_rows = results.recent_for(alice, 10).await.unwrap();
    let bob_rows = results.recent_for(bob, 10).await.unwrap();
    assert_eq!((alice_rows[0].score, alice_rows[0].total), (3, 3));
    assert_eq!(alice_rows[0].level, Level::Beginner);
    assert_eq!((bob_rows[0].score, bob_rows[0].total), (1, 3));
    assert_eq!(bob_rows[0].level, Level::Advanced);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_quizzes_never_cross_contaminate() {
    let (engine, results) = engine_with("concurrent", 5).await;

    let mut handles = Vec::new();
    for wrong in 0u32..4 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let user = UserId(500 + u64::from(wrong));
            engine.start_quiz(user, Level::Intermediate).await;
            for question in 0u32..5 {
                let answer = if question < wrong { 1 } else { 0 };
                engine.submit_answer(user, answer).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for wrong in 0u32..4 {
        let user = UserId(500 + u64::from(wrong));
        let rows = results.recent_for(user, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].score, 5 - wrong);
        assert_eq!(rows[0].total, 5);
    }
}
