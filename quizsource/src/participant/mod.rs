//! The participant aggregate: a learner's quiz attempts.
use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Aggregate, Error, Event, EventEnvelope, Result};

mod command;
pub mod event;

pub use command::CommandApplier;
pub use event::{AnswerSelected, ParticipantEvent, QuizFinished, QuizStarted};

/// A business rule a participant action broke.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The quiz already has an attempt that has not been finished.
    #[error("quiz '{quiz_id}' already started and not finished")]
    QuizAlreadyStarted {
        /// The quiz.
        quiz_id: String,
    },
    /// The quiz was never started.
    #[error("quiz '{quiz_id}' has not been started")]
    QuizNotStarted {
        /// The quiz.
        quiz_id: String,
    },
    /// The quiz's current attempt is already completed.
    #[error("quiz '{quiz_id}' already finished")]
    QuizAlreadyFinished {
        /// The quiz.
        quiz_id: String,
    },
    /// Required questions have no answer yet.
    #[error(
        "not all answers provided for quiz '{quiz_id}', the answers for the following question ids are missing: [{}]",
        .question_ids.join(", ")
    )]
    MissingAnswers {
        /// The quiz.
        quiz_id: String,
        /// The unanswered required questions, in their required order.
        question_ids: Vec<String>,
    },
    /// The data of a command does not fit its type.
    #[error("invalid data for command '{command_type}': {reason}")]
    InvalidCommandPayload {
        /// The command discriminator.
        command_type: String,
        /// What was wrong with the data.
        reason: String,
    },
}

/// An answer given during an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvidedAnswer {
    /// The answered question.
    pub question_id: String,
    /// The chosen answer.
    pub answer_id: String,
}

/// The state of the current attempt of one quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAttempt {
    quiz_id: String,
    provided_answers: Vec<ProvidedAnswer>,
    required_question_ids: Vec<String>,
    completed: bool,
}

impl QuizAttempt {
    /// The quiz this attempt belongs to.
    pub fn quiz_id(&self) -> &str {
        &self.quiz_id
    }
    /// Every answer given so far, including repeated answers to one question.
    pub fn provided_answers(&self) -> &[ProvidedAnswer] {
        &self.provided_answers
    }
    /// Questions that need an answer before the attempt can be finished.
    pub fn required_question_ids(&self) -> &[String] {
        &self.required_question_ids
    }
    /// Whether the attempt has been finished.
    pub fn is_completed(&self) -> bool {
        self.completed
    }
    /// Whether the attempt is still running.
    pub fn is_ongoing(&self) -> bool {
        !self.completed
    }

    fn missing_question_ids(&self) -> Vec<String> {
        let answered: HashSet<&str> = self
            .provided_answers
            .iter()
            .map(|a| a.question_id.as_str())
            .collect();
        self.required_question_ids
            .iter()
            .filter(|id| !answered.contains(id.as_str()))
            .cloned()
            .collect()
    }
}

/// The aggregate root tracking one learner's quiz attempts.
///
/// Holds at most one attempt per quiz id: starting a quiz again after its
/// attempt was finished replaces the finished attempt. Earlier attempts only
/// live on in the event history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Participant {
    id: String,
    quizzes: BTreeMap<String, QuizAttempt>,
    current_version: u64,
    persisted_version: u64,
    events: Vec<EventEnvelope<ParticipantEvent>>,
}

impl Participant {
    /// Opens the history of a new participant with a pending
    /// [`ParticipantEvent::Created`] event.
    pub fn create(id: impl Into<String>) -> Result<Self> {
        let mut participant = Self {
            id: id.into(),
            ..Self::default()
        };
        participant.record(ParticipantEvent::Created)?;
        Ok(participant)
    }

    /// Starts a new attempt of `quiz_id`.
    ///
    /// Fails while an earlier attempt of the same quiz is still ongoing.
    pub fn start_quiz(&mut self, quiz_id: &str, required_question_ids: Vec<String>) -> Result<()> {
        self.record(ParticipantEvent::QuizStarted(QuizStarted {
            quiz_id: quiz_id.to_string(),
            required_questions_answered: required_question_ids,
        }))
    }

    /// Records an answer for a question of the ongoing attempt of `quiz_id`.
    ///
    /// `is_correct` is judged by the caller and only used by projections.
    pub fn select_answer(
        &mut self,
        quiz_id: &str,
        question_id: &str,
        answer_id: &str,
        is_correct: bool,
    ) -> Result<()> {
        self.record(ParticipantEvent::AnswerSelected(AnswerSelected {
            quiz_id: quiz_id.to_string(),
            question_id: question_id.to_string(),
            answer_id: answer_id.to_string(),
            is_correct,
        }))
    }

    /// Completes the ongoing attempt of `quiz_id`.
    ///
    /// Fails listing every required question that has no answer yet.
    pub fn finish_quiz(&mut self, quiz_id: &str) -> Result<()> {
        self.record(ParticipantEvent::QuizFinished(QuizFinished {
            quiz_id: quiz_id.to_string(),
        }))
    }

    /// Number of distinct quizzes ever started.
    pub fn started_quiz_count(&self) -> usize {
        self.quizzes.len()
    }

    /// Number of quizzes whose current attempt is finished.
    pub fn finished_quiz_count(&self) -> usize {
        self.quizzes.values().filter(|q| q.completed).count()
    }

    /// The answers given during the current attempt of `quiz_id`.
    pub fn provided_answers(&self, quiz_id: &str) -> Result<Vec<ProvidedAnswer>> {
        self.quizzes
            .get(quiz_id)
            .map(|q| q.provided_answers.clone())
            .ok_or_else(|| Error::NotFound(format!("quiz '{quiz_id}'")))
    }

    /// The current attempt of `quiz_id`, if the quiz was ever started.
    pub fn attempt(&self, quiz_id: &str) -> Option<&QuizAttempt> {
        self.quizzes.get(quiz_id)
    }

    /// The full history applied to this participant, stored and pending.
    pub fn events(&self) -> &[EventEnvelope<ParticipantEvent>] {
        &self.events
    }

    fn record(&mut self, event: ParticipantEvent) -> Result<()> {
        let envelope = EventEnvelope::new(self.id.clone(), self.current_version, Utc::now(), event);
        self.apply(envelope, false)
    }

    fn ongoing_attempt(&self, quiz_id: &str) -> Result<&QuizAttempt> {
        let attempt = self.quizzes.get(quiz_id).ok_or_else(|| Violation::QuizNotStarted {
            quiz_id: quiz_id.to_string(),
        })?;
        if attempt.completed {
            return Err(Violation::QuizAlreadyFinished {
                quiz_id: quiz_id.to_string(),
            }
            .into());
        }
        Ok(attempt)
    }

    fn transition(&mut self, event: &EventEnvelope<ParticipantEvent>) -> Result<()> {
        match event.event() {
            ParticipantEvent::Created => {
                if self.current_version != 0 {
                    return Err(Error::Corruption(format!(
                        "participant '{}' created again at version {}",
                        event.aggregate_id(),
                        event.version()
                    )));
                }
                self.id = event.aggregate_id().to_string();
            }
            ParticipantEvent::QuizStarted(e) => {
                if self.quizzes.get(&e.quiz_id).is_some_and(QuizAttempt::is_ongoing) {
                    return Err(Violation::QuizAlreadyStarted {
                        quiz_id: e.quiz_id.clone(),
                    }
                    .into());
                }
                self.quizzes.insert(
                    e.quiz_id.clone(),
                    QuizAttempt {
                        quiz_id: e.quiz_id.clone(),
                        provided_answers: Vec::new(),
                        required_question_ids: e.required_questions_answered.clone(),
                        completed: false,
                    },
                );
            }
            ParticipantEvent::AnswerSelected(e) => {
                self.ongoing_attempt(&e.quiz_id)?;
                if let Some(attempt) = self.quizzes.get_mut(&e.quiz_id) {
                    attempt.provided_answers.push(ProvidedAnswer {
                        question_id: e.question_id.clone(),
                        answer_id: e.answer_id.clone(),
                    });
                }
            }
            ParticipantEvent::QuizFinished(e) => {
                let missing = self.ongoing_attempt(&e.quiz_id)?.missing_question_ids();
                if !missing.is_empty() {
                    return Err(Violation::MissingAnswers {
                        quiz_id: e.quiz_id.clone(),
                        question_ids: missing,
                    }
                    .into());
                }
                if let Some(attempt) = self.quizzes.get_mut(&e.quiz_id) {
                    attempt.completed = true;
                }
            }
        }
        Ok(())
    }
}

impl Aggregate for Participant {
    type Event = ParticipantEvent;

    fn id(&self) -> &str {
        &self.id
    }

    fn current_version(&self) -> u64 {
        self.current_version
    }

    fn persisted_version(&self) -> u64 {
        self.persisted_version
    }

    fn apply(&mut self, event: EventEnvelope<ParticipantEvent>, is_persisted: bool) -> Result<()> {
        if event.version() != self.current_version {
            return Err(Error::Corruption(format!(
                "event version {} of participant '{}' does not follow version {}",
                event.version(),
                event.aggregate_id(),
                self.current_version
            )));
        }
        if self.current_version == 0 && !matches!(event.event(), ParticipantEvent::Created) {
            return Err(Error::Corruption(format!(
                "history of participant '{}' starts with {} instead of {}",
                event.aggregate_id(),
                event.event_type(),
                ParticipantEvent::Created.event_type()
            )));
        }
        if self.current_version > 0 && event.aggregate_id() != self.id {
            return Err(Error::Corruption(format!(
                "event of participant '{}' in the history of participant '{}'",
                event.aggregate_id(),
                self.id
            )));
        }

        self.transition(&event)?;

        self.current_version += 1;
        if is_persisted && event.version() == self.persisted_version {
            self.persisted_version += 1;
        }
        debug!(
            participant.id = %self.id,
            event_type = event.event_type(),
            version = event.version(),
            is_persisted,
            "applied event"
        );
        self.events.push(event);
        Ok(())
    }

    fn take_pending_events(&mut self) -> Vec<EventEnvelope<ParticipantEvent>> {
        let pending = self
            .events
            .iter()
            .filter(|e| e.version() >= self.persisted_version)
            .cloned()
            .collect();
        self.persisted_version = self.current_version;
        pending
    }
}
