use std::sync::Arc;

use dotenv::dotenv;
use english_quiz_bot::bot::schema;
use english_quiz_bot::quiz::bank::QuestionBank;
use english_quiz_bot::quiz::engine::QuizEngine;
use english_quiz_bot::quiz::session::SessionStore;
use english_quiz_bot::results::ResultStore;
use teloxide::prelude::*;

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting quiz bot...");

    if std::env::var("TELOXIDE_TOKEN").is_err() {
        log::error!("TELOXIDE_TOKEN is not set");
        std::process::exit(1);
    }

    let questions_dir = std::env::var("QUESTIONS_DIR").unwrap_or_else(|_| "questions".to_string());
    let bank = match QuestionBank::load(&questions_dir) {
        Ok(bank) => bank,
        Err(err) => {
            log::error!("failed to load the question bank from {questions_dir}: {err}");
            std::process::exit(1);
        }
    };

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:quiz.db?mode=rwc".to_string());
    let results = match ResultStore::connect(&database_url).await {
        Ok(results) => results,
        Err(err) => {
            log::error!("failed to open the results database at {database_url}: {err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = results.migrate().await {
        log::error!("failed to prepare the results schema: {err}");
        std::process::exit(1);
    }
    log::info!("results database ready at {database_url}");

    let engine = Arc::new(QuizEngine::new(bank, SessionStore::new(), results.clone()));

    let bot = Bot::from_env();

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![engine, results])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
