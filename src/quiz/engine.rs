use std::time::Duration;

use rand::seq::SliceRandom;
use rand::thread_rng;
use teloxide::types::UserId;

use crate::error::QuizError;
use crate::quiz::bank::QuestionBank;
use crate::quiz::session::SessionStore;
use crate::quiz::{Choice, Level, Question, Reply};
use crate::results::ResultStore;

/// How many questions one quiz draws from its level's set. Smaller sets are
/// used whole.
pub const QUIZ_LEN: usize = 20;

/// Pause between grading an answer and showing the next card.
pub const NEXT_QUESTION_PAUSE: Duration = Duration::from_secs(1);

const WELCOME_TEXT: &str = "Добро пожаловать! Нажмите кнопку ниже, чтобы начать тест.";
const CHOOSE_LEVEL_TEXT: &str = "Выберите уровень:";
const CORRECT_TEXT: &str = "✅ Верно!";
const NEXT_UP_TEXT: &str = "⏳ Следующий вопрос...";

/// The quiz flow itself: draws questions, grades answers, records finished
/// runs. Everything Telegram-shaped stays in the bot layer; the engine only
/// ever speaks [`Reply`].
pub struct QuizEngine {
    bank: QuestionBank,
    sessions: SessionStore,
    results: ResultStore,
}

/// Token for the deferred next-question message. It pins the run and the
/// card index it was issued for, so a token outlived by its run goes silent
/// instead of leaking a question into a newer quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Followup {
    pub user: UserId,
    run: u64,
    index: usize,
}

/// Outcome of one graded answer.
#[derive(Debug)]
pub struct Submitted {
    pub replies: Vec<Reply>,
    /// Present mid-run; redeem via [`QuizEngine::resume`] after the pause.
    pub followup: Option<Followup>,
}

/// Score so far in a live run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub score: u32,
    pub index: usize,
}

impl QuizEngine {
    pub fn new(bank: QuestionBank, sessions: SessionStore, results: ResultStore) -> Self {
        Self {
            bank,
            sessions,
            results,
        }
    }

    /// Greeting with the single start button.
    pub fn welcome(&self) -> Reply {
        Reply::with_choices(WELCOME_TEXT, vec![Choice::Start])
    }

    /// Level picker.
    pub fn level_menu(&self) -> Reply {
        Reply::with_choices(
            CHOOSE_LEVEL_TEXT,
            Level::ALL.iter().copied().map(Choice::Level).collect(),
        )
    }

    /// Draws a fresh shuffled quiz for `user`, replacing any run in flight,
    /// and returns the confirmation plus the first question card.
    pub async fn start_quiz(&self, user: UserId, level: Level) -> Vec<Reply> {
        let mut quiz = self.bank.questions_for(level).to_vec();
        quiz.shuffle(&mut thread_rng());
        quiz.truncate(QUIZ_LEN);

        let total = quiz.len();
        let first = quiz.first().map(|question| question_card(question, 1, total));
        let confirmation = Reply::text(format!(
            "Вы выбрали уровень: {} ✅\nНачинаем...",
            level.key().to_uppercase()
        ));

        match first {
            Some(card) => {
                self.sessions.start(user, level, quiz).await;
                vec![confirmation, card]
            }
            None => vec![confirmation],
        }
    }

    /// Grades `answer` against the user's pending question and advances the
    /// run. Any index outside the options is simply a wrong answer. Finishing
    /// the run records the result and appends the summary; a store failure
    /// there is logged and the summary still goes out.
    pub async fn submit_answer(
        &self,
        user: UserId,
        answer: usize,
    ) -> Result<Submitted, QuizError> {
        struct Graded {
            correct: bool,
            correct_option: String,
            level: Level,
            score: u32,
            index: usize,
            total: usize,
            run: u64,
        }

        let graded = self
            .sessions
            .modify(user, |session| {
                let question = &session.quiz[session.index];
                let correct = answer == question.correct;
                let correct_option = question.options[question.correct].clone();
                if correct {
                    session.score += 1;
                }
                session.index += 1;
                Graded {
                    correct,
                    correct_option,
                    level: session.level,
                    score: session.score,
                    index: session.index,
                    total: session.quiz.len(),
                    run: session.run,
                }
            })
            .await
            .ok_or(QuizError::NoActiveSession)?;

        let feedback = if graded.correct {
            Reply::text(CORRECT_TEXT)
        } else {
            Reply::text(format!(
                "❌ Неверно. Правильный ответ: {}",
                graded.correct_option
            ))
        };

        let mut replies = vec![feedback];
        let mut followup = None;

        if graded.index < graded.total {
            followup = Some(Followup {
                user,
                run: graded.run,
                index: graded.index,
            });
        } else {
            if let Err(err) = self
                .results
                .record(user, graded.level, graded.score, graded.total as u32)
                .await
            {
                log::error!("failed to save result for {}: {}", user.0, err);
            }
            replies.push(Reply::text(format!(
                "🎉 Викторина завершена!\nВаш результат: {} из {}",
                graded.score, graded.total
            )));
        }

        Ok(Submitted { replies, followup })
    }

    /// Redeems a follow-up token: the next-question lead-in plus the card.
    /// Returns `None` when the run moved on, restarted or ended since the
    /// token was issued.
    pub async fn resume(&self, token: Followup) -> Option<Vec<Reply>> {
        self.sessions
            .peek(token.user, |session| {
                if session.run != token.run || session.index != token.index {
                    return None;
                }
                let question = &session.quiz[session.index];
                Some(vec![
                    Reply::text(NEXT_UP_TEXT),
                    question_card(question, session.index + 1, session.quiz.len()),
                ])
            })
            .await
            .flatten()
    }

    /// Score so far in the live run, if any.
    pub async fn progress(&self, user: UserId) -> Option<Progress> {
        self.sessions
            .peek(user, |session| Progress {
                score: session.score,
                index: session.index,
            })
            .await
    }

    /// Abandons the live run without recording anything. Returns whether a
    /// run existed.
    pub async fn reset(&self, user: UserId) -> bool {
        self.sessions.clear(user).await
    }
}

fn question_card(question: &Question, number: usize, total: usize) -> Reply {
    let choices = question
        .options
        .iter()
        .enumerate()
        .map(|(index, label)| Choice::Answer {
            index,
            label: label.clone(),
        })
        .collect();
    Reply::with_choices(
        format!("📚 Вопрос {} из {}:\n\n{}", number, total, question.text),
        choices,
    )
}
