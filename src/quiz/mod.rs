pub mod bank;
pub mod engine;
pub mod session;

use std::fmt;
use std::str::FromStr;

use crate::error::QuizError;

/// Difficulty tiers of the question bank. The set is closed: any other level
/// string is a [`QuizError::UnknownLevel`] at the parsing boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Beginner, Level::Intermediate, Level::Advanced];

    /// Stable key used for question file names, callback data and the
    /// results table.
    pub fn key(self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }

    /// Title shown on the level picker buttons.
    pub fn title(self) -> &'static str {
        match self {
            Level::Beginner => "🟢 Beginner",
            Level::Intermediate => "🟡 Intermediate",
            Level::Advanced => "🔴 Advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Level {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "advanced" => Ok(Level::Advanced),
            other => Err(QuizError::UnknownLevel(other.to_string())),
        }
    }
}

/// One multiple-choice question, exactly as stored in the bank files.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    /// Index into `options`; validated against it when the bank loads.
    pub correct: usize,
}

/// One outbound message produced by the engine. The bot layer decides how
/// choices are rendered for Telegram; the engine never touches the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub choices: Option<Vec<Choice>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            choices: None,
        }
    }

    pub fn with_choices(text: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            text: text.into(),
            choices: Some(choices),
        }
    }
}

/// A pressable choice attached to a [`Reply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// The "start the test" affordance on the welcome message.
    Start,
    /// Pick a difficulty level.
    Level(Level),
    /// Answer the pending question with the option at `index`.
    Answer { index: usize, label: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_keys_round_trip() {
        for level in Level::ALL {
            assert_eq!(level.key().parse::<Level>().unwrap(), level);
        }
    }

    #[test]
    fn unknown_level_is_rejected() {
        let err = "expert".parse::<Level>().unwrap_err();
        assert_eq!(err, QuizError::UnknownLevel("expert".to_string()));
    }
}
