//! Core data types for the offline question cache
//!
//! Records are read replicas of the canonical question list: they are
//! replaced wholesale on every sync and never patched locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum number of answer options a question may carry
pub const MIN_OPTIONS: usize = 2;

/// Maximum number of answer options a question may carry
pub const MAX_OPTIONS: usize = 6;

/// Difficulty tier of a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Junior,
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Junior,
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Junior => "junior",
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single trivia question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// Stable unique identifier
    pub id: String,
    pub difficulty: Difficulty,
    pub question: String,
    /// Ordered answer options (2 to 6 entries)
    pub options: Vec<String>,
    /// Index into `options` of the correct answer
    pub answer: usize,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub category: String,
}

impl QuestionRecord {
    /// Check the option count and answer index constraints
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("question id must not be empty".to_string());
        }

        if self.options.len() < MIN_OPTIONS || self.options.len() > MAX_OPTIONS {
            return Err(format!(
                "question {} has {} options (expected {}..={})",
                self.id,
                self.options.len(),
                MIN_OPTIONS,
                MAX_OPTIONS
            ));
        }

        if self.answer >= self.options.len() {
            return Err(format!(
                "question {} answer index {} out of range for {} options",
                self.id,
                self.answer,
                self.options.len()
            ));
        }

        Ok(())
    }

    /// Text of the correct option
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.answer).map(String::as_str)
    }
}

/// Validate a whole question set, failing on the first invalid record
pub fn validate_all(questions: &[QuestionRecord]) -> Result<(), String> {
    questions.iter().try_for_each(QuestionRecord::validate)
}

/// One entry of the local answer history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredQuestionEntry {
    pub question_id: String,
    pub was_correct: bool,
    /// Seconds spent answering
    pub time_taken: f64,
    pub answered_at: DateTime<Utc>,
}

impl AnsweredQuestionEntry {
    pub fn new(question_id: impl Into<String>, was_correct: bool, time_taken: f64) -> Self {
        Self {
            question_id: question_id.into(),
            was_correct,
            time_taken,
            answered_at: Utc::now(),
        }
    }
}

/// Metadata written together with the question set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    pub last_sync_time: DateTime<Utc>,
}
