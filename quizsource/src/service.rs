//! The participant application service.
//!
//! Wires a [`Repository`] to the [`CommandApplier`] and the projections: every
//! command rebuilds the participant from its history, applies the command and
//! appends the new events; every query replays the same history through a
//! projection.
use tracing::{info, instrument, warn};

use crate::{
    Command, Error, Result,
    participant::{CommandApplier, Participant},
    projection::{QuizAttemptDetail, QuizOverview},
    repository::Repository,
};

/// Processes commands and answers progress queries for participants.
pub struct ParticipantService<R> {
    repository: R,
    applier: CommandApplier,
    conflict_retries: usize,
}

impl<R> ParticipantService<R>
where
    R: Repository<Participant>,
{
    /// Creates a new `ParticipantService`.
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            applier: CommandApplier::new(),
            conflict_retries: 0,
        }
    }

    /// Sets how often a command is reloaded and reapplied after losing an
    /// optimistic concurrency race before the conflict is surfaced.
    ///
    /// Defaults to 0: conflicts are returned to the caller immediately.
    pub fn with_conflict_retries(mut self, retries: usize) -> Self {
        self.conflict_retries = retries;
        self
    }

    /// Loads the participant, or starts a new history when none is stored.
    ///
    /// A freshly created participant is not saved until a command succeeds.
    #[instrument(skip(self))]
    pub async fn find_or_create(&self, participant_id: &str) -> Result<Participant> {
        match self.repository.load(participant_id).await {
            Err(Error::NotFound(_)) => {
                info!("starting new participant history");
                Participant::create(participant_id)
            }
            other => other,
        }
    }

    /// Applies `command` to the participant and stores the resulting events.
    #[instrument(skip(self, command), fields(command.kind = %command.command_type))]
    pub async fn process_command(&self, participant_id: &str, command: &Command) -> Result<()> {
        let mut retries = 0;
        loop {
            let participant = self.find_or_create(participant_id).await?;
            let mut participant = self.applier.apply(command, participant)?;

            match self.repository.save(&mut participant).await {
                Err(Error::Conflict) if retries < self.conflict_retries => {
                    retries += 1;
                    warn!(retry = retries, "concurrent update, reloading participant");
                }
                other => return other,
            }
        }
    }

    /// Number of distinct quizzes the participant ever started.
    #[instrument(skip(self))]
    pub async fn started_quiz_count(&self, participant_id: &str) -> Result<usize> {
        Ok(self.find_or_create(participant_id).await?.started_quiz_count())
    }

    /// The participant's active and finished quiz attempts.
    #[instrument(skip(self))]
    pub async fn quiz_overview(&self, participant_id: &str) -> Result<QuizOverview> {
        let participant = self.find_or_create(participant_id).await?;
        QuizOverview::for_participant(&participant)
    }

    /// Question-level detail of attempt `attempt_id` of `quiz_id`.
    #[instrument(skip(self))]
    pub async fn quiz_attempt_detail(
        &self,
        participant_id: &str,
        quiz_id: &str,
        attempt_id: u32,
    ) -> Result<QuizAttemptDetail> {
        let participant = self.find_or_create(participant_id).await?;
        QuizAttemptDetail::for_participant(&participant, quiz_id, attempt_id)
    }
}
