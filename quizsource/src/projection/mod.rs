//! Read models derived from a participant's history.
//!
//! Projections are pure left-to-right folds over the version-ordered events of
//! one participant. They hold no state between calls and are recomputed on
//! every query.
//!
//! Repeated answers to the same question within one attempt are scored
//! last-answer-wins: the latest answer replaces earlier ones, so every
//! question counts at most once towards the correctness ratio.
use std::collections::{BTreeMap, HashMap};

use crate::{
    Error, EventEnvelope, Result,
    participant::ParticipantEvent,
};

mod quiz_attempt_detail;
mod quiz_overview;

pub use quiz_attempt_detail::QuizAttemptDetail;
pub use quiz_overview::{QuizAttemptOverview, QuizOverview};

/// Minimum correctness ratio of a passed attempt.
pub const PASS_THRESHOLD: f64 = 0.8;

/// Share of correct answers; `0.0` when nothing was answered.
pub fn correctness_ratio(correct: usize, wrong: usize) -> f64 {
    if correct + wrong == 0 {
        return 0.0;
    }
    correct as f64 / (correct + wrong) as f64
}

/// Whether an attempt passes.
///
/// An attempt without any scored answer passes vacuously; otherwise the ratio
/// has to reach [`PASS_THRESHOLD`].
pub fn is_pass(correct: usize, wrong: usize) -> bool {
    if correct + wrong == 0 {
        return true;
    }
    correctness_ratio(correct, wrong) >= PASS_THRESHOLD
}

/// Correct and wrong counts of a question → correctness map.
fn score(correctness: &BTreeMap<String, bool>) -> (usize, usize) {
    let correct = correctness.values().filter(|c| **c).count();
    (correct, correctness.len() - correct)
}

/// One attempt as reconstructed by [`replay_attempts`].
#[derive(Debug, Clone)]
struct Attempt {
    quiz_id: String,
    attempt_id: u32,
    answers: BTreeMap<String, String>,
    correctness: BTreeMap<String, bool>,
    finished: bool,
}

impl Attempt {
    /// Correctness ratio and pass flag; unfinished attempts neither pass nor
    /// score.
    fn outcome(&self) -> (f64, bool) {
        if !self.finished {
            return (0.0, false);
        }
        let (correct, wrong) = score(&self.correctness);
        (correctness_ratio(correct, wrong), is_pass(correct, wrong))
    }
}

/// Folds a history into every attempt it contains, in the order they were
/// started. Attempt ids count from 1 per quiz.
fn replay_attempts(events: &[EventEnvelope<ParticipantEvent>]) -> Result<Vec<Attempt>> {
    let mut attempts: Vec<Attempt> = Vec::new();
    let mut attempt_counter: HashMap<&str, u32> = HashMap::new();
    let mut open: HashMap<&str, usize> = HashMap::new();

    for envelope in events {
        match envelope.event() {
            ParticipantEvent::Created => {}
            ParticipantEvent::QuizStarted(e) => {
                if open.contains_key(e.quiz_id.as_str()) {
                    return Err(Error::Corruption(format!(
                        "invalid multiple active attempts for quiz '{}'",
                        e.quiz_id
                    )));
                }
                let counter = attempt_counter.entry(e.quiz_id.as_str()).or_insert(0);
                *counter += 1;
                open.insert(e.quiz_id.as_str(), attempts.len());
                attempts.push(Attempt {
                    quiz_id: e.quiz_id.clone(),
                    attempt_id: *counter,
                    answers: BTreeMap::new(),
                    correctness: BTreeMap::new(),
                    finished: false,
                });
            }
            ParticipantEvent::AnswerSelected(e) => {
                let index = *open
                    .get(e.quiz_id.as_str())
                    .ok_or_else(|| no_open_attempt(envelope, &e.quiz_id))?;
                let attempt = &mut attempts[index];
                attempt
                    .answers
                    .insert(e.question_id.clone(), e.answer_id.clone());
                attempt
                    .correctness
                    .insert(e.question_id.clone(), e.is_correct);
            }
            ParticipantEvent::QuizFinished(e) => {
                let index = open
                    .remove(e.quiz_id.as_str())
                    .ok_or_else(|| no_open_attempt(envelope, &e.quiz_id))?;
                attempts[index].finished = true;
            }
        }
    }

    Ok(attempts)
}

fn no_open_attempt(envelope: &EventEnvelope<ParticipantEvent>, quiz_id: &str) -> Error {
    Error::Corruption(format!(
        "{} at version {} without an open attempt of quiz '{quiz_id}'",
        envelope.event_type(),
        envelope.version()
    ))
}
