//! The events a [`Participant`](super::Participant) produces.
use serde::{Deserialize, Serialize};

use crate::Event;

/// Every fact that can happen to a participant.
///
/// The `name` attribute of each variant is its wire discriminator and must
/// never change once events carrying it have been stored.
#[derive(Debug, Clone, PartialEq, Event)]
pub enum ParticipantEvent {
    /// The participant's history was opened.
    #[event(name = "ParticipantCreated")]
    Created,
    /// A new attempt of a quiz was started.
    #[event(name = "StartedQuiz")]
    QuizStarted(QuizStarted),
    /// An answer was chosen for a question of the ongoing attempt.
    #[event(name = "SelectedAnswer")]
    AnswerSelected(AnswerSelected),
    /// The ongoing attempt of a quiz was completed.
    #[event(name = "FinishedQuiz")]
    QuizFinished(QuizFinished),
}

/// Payload of [`ParticipantEvent::QuizStarted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStarted {
    /// The quiz being attempted.
    pub quiz_id: String,
    /// Questions that need an answer before the attempt can be finished.
    #[serde(default)]
    pub required_questions_answered: Vec<String>,
}

/// Payload of [`ParticipantEvent::AnswerSelected`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSelected {
    /// The quiz the question belongs to.
    pub quiz_id: String,
    /// The answered question.
    pub question_id: String,
    /// The chosen answer.
    pub answer_id: String,
    /// Whether the chosen answer is correct, as judged by the command source.
    #[serde(default)]
    pub is_correct: bool,
}

/// Payload of [`ParticipantEvent::QuizFinished`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizFinished {
    /// The quiz whose ongoing attempt was completed.
    pub quiz_id: String,
}
