use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
    ReplyMarkup,
};
use teloxide::utils::command::BotCommands;

use crate::error::QuizError;
use crate::quiz::engine::{Followup, QuizEngine, NEXT_QUESTION_PAUSE};
use crate::quiz::{Choice, Level, Reply};
use crate::results::{QuizResult, ResultStore};
use crate::HandlerResult;

const START_BUTTON: &str = "📝 Начать тест";
const RESTART_TEXT: &str = "🔄 Начинаем заново. Нажмите /start";
const NO_RESULTS_TEXT: &str = "📭 Пока нет результатов.";
const NO_OWN_RESULTS_TEXT: &str = "📭 У вас пока нет сохранённых результатов.";
const RESULTS_UNAVAILABLE_TEXT: &str = "⚠️ Не удалось загрузить результаты. Попробуйте позже.";

const HELP_TEXT: &str = "ℹ️ Как пользоваться ботом:\n\
    1. Нажмите /start или Начать тест и выберите уровень.\n\
    2. Вам будет задано 20 вопросов.\n\
    3. Отвечайте нажимая на варианты.\n\
    4. После окончания увидите результат.\n\n\
    Дополнительно:\n\
    /top10 — лучшие результаты\n\
    /myresults — ваши результаты\n\
    /score — текущий прогресс\n\
    /restart — начать заново";

const INFO_TEXT: &str = "📘 Этот бот поможет тебе проверить уровень английского!\n\n\
    📗 Уровни: Beginner, Intermediate, Advanced\n\
    🎯 По 20 случайных вопросов\n\
    📊 Итоговый результат — сразу после завершения.\n\n\
    Нажмите /start, чтобы начать!";

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    Start,
    Help,
    Level,
    Score,
    Info,
    Restart,
    Top10,
    MyResults,
}

/// The update-handling tree: commands first, then the start button, then the
/// inline callbacks.
pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(on_command),
        )
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback))
}

async fn on_command(
    bot: Bot,
    engine: Arc<QuizEngine>,
    results: ResultStore,
    msg: Message,
    cmd: Command,
) -> HandlerResult {
    let Some(user) = msg.from().map(|u| u.id) else {
        return Ok(());
    };

    match cmd {
        Command::Start => deliver(&bot, msg.chat.id, vec![engine.welcome()]).await?,
        Command::Help => {
            bot.send_message(msg.chat.id, HELP_TEXT).await?;
        }
        Command::Info => {
            bot.send_message(msg.chat.id, INFO_TEXT).await?;
        }
        Command::Level => deliver(&bot, msg.chat.id, vec![engine.level_menu()]).await?,
        Command::Score => {
            let text = match engine.progress(user).await {
                Some(progress) => format!(
                    "🎯 Текущий результат: {} из {}",
                    progress.score, progress.index
                ),
                None => QuizError::NoActiveSession.user_message().to_string(),
            };
            bot.send_message(msg.chat.id, text).await?;
        }
        Command::Restart => {
            engine.reset(user).await;
            bot.send_message(msg.chat.id, RESTART_TEXT).await?;
        }
        Command::Top10 => {
            let text = match results.top_scores(10).await {
                Ok(rows) => render_top(&rows),
                Err(err) => {
                    log::error!("failed to load the leaderboard: {err}");
                    RESULTS_UNAVAILABLE_TEXT.to_string()
                }
            };
            bot.send_message(msg.chat.id, text).await?;
        }
        Command::MyResults => {
            let text = match results.recent_for(user, 5).await {
                Ok(rows) => render_recent(&rows),
                Err(err) => {
                    log::error!("failed to load results for {}: {err}", user.0);
                    RESULTS_UNAVAILABLE_TEXT.to_string()
                }
            };
            bot.send_message(msg.chat.id, text).await?;
        }
    }
    Ok(())
}

async fn on_message(bot: Bot, engine: Arc<QuizEngine>, msg: Message) -> HandlerResult {
    if msg.text() == Some(START_BUTTON) {
        deliver(&bot, msg.chat.id, vec![engine.level_menu()]).await?;
    }
    Ok(())
}

async fn on_callback(bot: Bot, engine: Arc<QuizEngine>, q: CallbackQuery) -> HandlerResult {
    // Stop the button spinner whatever happens next; not worth failing over.
    let _ = bot.answer_callback_query(q.id).await;

    let user = q.from.id;
    let (Some(data), Some(message)) = (q.data, q.message) else {
        return Ok(());
    };
    let chat = message.chat.id;

    if let Some(level) = data.strip_prefix("level_") {
        match level.parse::<Level>() {
            Ok(level) => deliver(&bot, chat, engine.start_quiz(user, level).await).await?,
            Err(err) => {
                log::warn!("bad level callback from {}: {err}", user.0);
                bot.send_message(chat, err.user_message()).await?;
            }
        }
        return Ok(());
    }

    let Ok(answer) = data.parse::<usize>() else {
        log::warn!("unrecognized callback data from {}: {data:?}", user.0);
        return Ok(());
    };

    match engine.submit_answer(user, answer).await {
        Ok(submitted) => {
            deliver(&bot, chat, submitted.replies).await?;
            if let Some(token) = submitted.followup {
                schedule_next_question(bot.clone(), engine.clone(), chat, token);
            }
        }
        Err(err) => {
            bot.send_message(chat, err.user_message()).await?;
        }
    }
    Ok(())
}

/// Fires the deferred next-question card after the pause. The token goes
/// stale the moment the run advances, restarts or ends, and a stale token
/// sends nothing.
fn schedule_next_question(bot: Bot, engine: Arc<QuizEngine>, chat: ChatId, token: Followup) {
    tokio::spawn(async move {
        tokio::time::sleep(NEXT_QUESTION_PAUSE).await;
        let Some(replies) = engine.resume(token).await else {
            return;
        };
        if let Err(err) = deliver(&bot, chat, replies).await {
            log::warn!("failed to send the next question to {}: {err}", token.user.0);
        }
    });
}

async fn deliver(bot: &Bot, chat: ChatId, replies: Vec<Reply>) -> HandlerResult {
    for reply in replies {
        let request = bot.send_message(chat, reply.text);
        match reply.choices {
            Some(choices) => request.reply_markup(render(&choices)).await?,
            None => request.await?,
        };
    }
    Ok(())
}

fn render(choices: &[Choice]) -> ReplyMarkup {
    if matches!(choices, [Choice::Start]) {
        let keyboard = KeyboardMarkup::new(vec![vec![KeyboardButton::new(START_BUTTON)]])
            .resize_keyboard(true)
            .one_time_keyboard(true);
        return ReplyMarkup::Keyboard(keyboard);
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    let mut answer_row: Vec<InlineKeyboardButton> = Vec::new();
    for choice in choices {
        match choice {
            Choice::Start => {}
            Choice::Level(level) => rows.push(vec![InlineKeyboardButton::callback(
                level.title(),
                format!("level_{}", level.key()),
            )]),
            Choice::Answer { index, label } => answer_row.push(InlineKeyboardButton::callback(
                label.clone(),
                index.to_string(),
            )),
        }
    }
    if !answer_row.is_empty() {
        rows.push(answer_row);
    }
    ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(rows))
}

fn render_top(rows: &[QuizResult]) -> String {
    if rows.is_empty() {
        return NO_RESULTS_TEXT.to_string();
    }
    let mut out = String::from("🏆 Топ 10 результатов:\n");
    for (place, row) in rows.iter().enumerate() {
        out.push_str(&format!(
            "{}. 👤 {} | {} | {}/{}\n",
            place + 1,
            row.user.0,
            row.level.key().to_uppercase(),
            row.score,
            row.total
        ));
    }
    out
}

fn render_recent(rows: &[QuizResult]) -> String {
    if rows.is_empty() {
        return NO_OWN_RESULTS_TEXT.to_string();
    }
    let mut out = String::from("📊 Ваши последние результаты:\n");
    for row in rows {
        out.push_str(&format!(
            "📅 {} | {} | {}/{}\n",
            row.created_at.format("%Y-%m-%d %H:%M"),
            row.level.key().to_uppercase(),
            row.score,
            row.total
        ));
    }
    out
}
