//! Dispatch of generic commands onto participant mutations.
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::{
    Error, Result,
    command::{
        Command, FINISH_QUIZ, FinishQuizData, SELECT_QUESTION_ANSWER, START_QUIZ, SelectQuestionAnswerData,
        StartQuizData,
    },
};

use super::{Participant, Violation};

/// Maps generic [`Command`]s onto [`Participant`] mutations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandApplier;

impl CommandApplier {
    /// Creates a new applier.
    pub fn new() -> Self {
        Self
    }

    /// Dispatches `command` by its discriminator and applies it to
    /// `participant`.
    ///
    /// Returns the participant carrying the new pending event, or the first
    /// failure encountered. An unknown discriminator is
    /// [`Error::UnsupportedCommand`].
    #[instrument(skip(self, participant), fields(participant.id = %participant.id, command.kind = %command.command_type))]
    pub fn apply(&self, command: &Command, mut participant: Participant) -> Result<Participant> {
        match command.command_type.as_str() {
            START_QUIZ => {
                let data: StartQuizData = decode(command)?;
                participant.start_quiz(&data.quiz_id, data.required_questions_answered)?;
            }
            SELECT_QUESTION_ANSWER => {
                let data: SelectQuestionAnswerData = decode(command)?;
                participant.select_answer(
                    &data.quiz_id,
                    &data.question_id,
                    &data.answer_id,
                    data.is_correct,
                )?;
            }
            FINISH_QUIZ => {
                let data: FinishQuizData = decode(command)?;
                participant.finish_quiz(&data.quiz_id)?;
            }
            other => return Err(Error::UnsupportedCommand(other.to_string())),
        }
        Ok(participant)
    }
}

fn decode<T: DeserializeOwned>(command: &Command) -> Result<T> {
    serde_json::from_value(command.data.clone()).map_err(|e| {
        Violation::InvalidCommandPayload {
            command_type: command.command_type.clone(),
            reason: e.to_string(),
        }
        .into()
    })
}
