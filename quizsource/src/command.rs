//! Inbound commands.
//!
//! A [`Command`] is the generic shape a command arrives in: a discriminator,
//! a creation timestamp and JSON data whose shape depends on the
//! discriminator. [`participant::CommandApplier`](crate::participant::CommandApplier)
//! turns it into a typed aggregate mutation.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Discriminator of the command starting a quiz attempt.
pub const START_QUIZ: &str = "startQuiz";
/// Discriminator of the command selecting an answer.
pub const SELECT_QUESTION_ANSWER: &str = "selectQuestionAnswer";
/// Discriminator of the command finishing a quiz attempt.
pub const FINISH_QUIZ: &str = "finishQuiz";

/// A request to change a participant, as received from the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// Selects the handler and the expected shape of `data`.
    #[serde(rename = "type")]
    pub command_type: String,
    /// When the command was issued.
    pub created_at: DateTime<Utc>,
    /// Handler-specific data.
    #[serde(default)]
    pub data: Value,
}

impl Command {
    /// Creates a command with an arbitrary discriminator, stamped now.
    pub fn new(command_type: impl Into<String>, data: Value) -> Self {
        Self {
            command_type: command_type.into(),
            created_at: Utc::now(),
            data,
        }
    }

    /// A command starting an attempt of `quiz_id`.
    pub fn start_quiz(quiz_id: &str, required_question_ids: Vec<String>) -> Self {
        Self::new(
            START_QUIZ,
            json!({
                "quizId": quiz_id,
                "requiredQuestionsAnswered": required_question_ids,
            }),
        )
    }

    /// A command selecting `answer_id` for `question_id`.
    pub fn select_answer(quiz_id: &str, question_id: &str, answer_id: &str, is_correct: bool) -> Self {
        Self::new(
            SELECT_QUESTION_ANSWER,
            json!({
                "quizId": quiz_id,
                "questionId": question_id,
                "answerId": answer_id,
                "isCorrect": is_correct,
            }),
        )
    }

    /// A command finishing the ongoing attempt of `quiz_id`.
    pub fn finish_quiz(quiz_id: &str) -> Self {
        Self::new(FINISH_QUIZ, json!({ "quizId": quiz_id }))
    }
}

/// Data of a [`START_QUIZ`] command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizData {
    /// The quiz to attempt.
    pub quiz_id: String,
    /// Questions that need an answer before the attempt can be finished.
    #[serde(default)]
    pub required_questions_answered: Vec<String>,
}

/// Data of a [`SELECT_QUESTION_ANSWER`] command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectQuestionAnswerData {
    /// The quiz the question belongs to.
    pub quiz_id: String,
    /// The answered question.
    pub question_id: String,
    /// The chosen answer.
    pub answer_id: String,
    /// Whether the chosen answer is correct. Absent means incorrect.
    #[serde(default)]
    pub is_correct: bool,
}

/// Data of a [`FINISH_QUIZ`] command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishQuizData {
    /// The quiz whose ongoing attempt is finished.
    pub quiz_id: String,
}
