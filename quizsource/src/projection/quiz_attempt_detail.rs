//! Question-level detail of one quiz attempt.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    Error, EventEnvelope, Result,
    participant::{Participant, ParticipantEvent},
};

use super::replay_attempts;

/// Question-level detail of a single attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttemptDetail {
    /// The quiz.
    pub quiz_id: String,
    /// Ordinal of the attempt within its quiz, starting at 1.
    pub attempt_id: u32,
    /// Whether the attempt has been finished.
    pub finished: bool,
    /// Latest chosen answer per answered question.
    pub questions_with_answer: BTreeMap<String, String>,
    /// Whether the latest answer per question was correct.
    pub question_correctness: BTreeMap<String, bool>,
    /// Whether the attempt passed. Always `false` while it is ongoing.
    pub pass: bool,
    /// Share of correctly answered questions, in `[0, 1]`. `0.0` while ongoing.
    pub question_correct_ratio: f64,
}

impl QuizAttemptDetail {
    /// Builds the detail of attempt `attempt_id` of `quiz_id` from a
    /// version-ordered history.
    ///
    /// Fails with [`Error::NotFound`] when that attempt never happened.
    pub fn from_events(
        events: &[EventEnvelope<ParticipantEvent>],
        quiz_id: &str,
        attempt_id: u32,
    ) -> Result<Self> {
        let attempt = replay_attempts(events)?
            .into_iter()
            .find(|a| a.quiz_id == quiz_id && a.attempt_id == attempt_id)
            .ok_or_else(|| Error::NotFound(format!("attempt {attempt_id} of quiz '{quiz_id}'")))?;

        let (question_correct_ratio, pass) = attempt.outcome();
        Ok(Self {
            quiz_id: attempt.quiz_id,
            attempt_id: attempt.attempt_id,
            finished: attempt.finished,
            questions_with_answer: attempt.answers,
            question_correctness: attempt.correctness,
            pass,
            question_correct_ratio,
        })
    }

    /// Builds the detail from everything applied to `participant`.
    pub fn for_participant(participant: &Participant, quiz_id: &str, attempt_id: u32) -> Result<Self> {
        Self::from_events(participant.events(), quiz_id, attempt_id)
    }
}
