//! The overview of every quiz attempt a participant started.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    Error, EventEnvelope, Result,
    participant::{Participant, ParticipantEvent},
};

use super::replay_attempts;

/// Summary of one attempt of a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttemptOverview {
    /// The quiz.
    pub quiz_id: String,
    /// Ordinal of the attempt within its quiz, starting at 1.
    pub attempt_id: u32,
    /// Latest chosen answer per answered question.
    pub questions_with_answer: BTreeMap<String, String>,
    /// Whether the attempt passed. Always `false` while it is ongoing.
    pub pass: bool,
    /// Share of correctly answered questions, in `[0, 1]`. `0.0` while ongoing.
    pub question_correct_ratio: f64,
}

/// Every attempt of every quiz a participant touched, split into ongoing and
/// finished attempts.
///
/// Each attempt appears in exactly one bucket. A quiz id shows up in both
/// buckets when it has finished attempts and an ongoing re-attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOverview {
    /// Attempts not finished yet, per quiz id.
    pub active_quizzes: BTreeMap<String, Vec<QuizAttemptOverview>>,
    /// Finished attempts per quiz id, oldest first.
    pub finished_quizzes: BTreeMap<String, Vec<QuizAttemptOverview>>,
}

impl QuizOverview {
    /// Builds the overview from a version-ordered history.
    pub fn from_events(events: &[EventEnvelope<ParticipantEvent>]) -> Result<Self> {
        let mut overview = Self::default();

        for attempt in replay_attempts(events)? {
            let (question_correct_ratio, pass) = attempt.outcome();
            let bucket = if attempt.finished {
                &mut overview.finished_quizzes
            } else {
                &mut overview.active_quizzes
            };
            bucket
                .entry(attempt.quiz_id.clone())
                .or_default()
                .push(QuizAttemptOverview {
                    quiz_id: attempt.quiz_id,
                    attempt_id: attempt.attempt_id,
                    questions_with_answer: attempt.answers,
                    pass,
                    question_correct_ratio,
                });
        }

        Ok(overview)
    }

    /// Builds the overview from everything applied to `participant`.
    pub fn for_participant(participant: &Participant) -> Result<Self> {
        Self::from_events(participant.events())
    }

    /// The most recently finished attempt of `quiz_id`.
    pub fn latest_finished_attempt(&self, quiz_id: &str) -> Result<&QuizAttemptOverview> {
        self.finished_quizzes
            .get(quiz_id)
            .and_then(|attempts| attempts.last())
            .ok_or_else(|| Error::NotFound(format!("finished attempt of quiz '{quiz_id}'")))
    }
}
