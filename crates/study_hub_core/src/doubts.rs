//! crates/study_hub_core/src/doubts.rs
//!
//! The doubt repository: create, query and partially update doubt records,
//! and append peer answers.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Answer, Doubt, DoubtFilter, DoubtStatus, DoubtUpdate, NewDoubt};
use crate::ports::{Clock, DoubtStore, PortError, PortResult};

/// Data-access module over the `doubts` collection.
#[derive(Clone)]
pub struct DoubtRepository {
    store: Arc<dyn DoubtStore>,
    clock: Arc<dyn Clock>,
}

impl DoubtRepository {
    pub fn new(store: Arc<dyn DoubtStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Creates a pending doubt with no answers and returns its identifier.
    pub async fn create(
        &self,
        question_text: &str,
        subject: &str,
        asked_by: Uuid,
    ) -> PortResult<Uuid> {
        require_non_empty("question text", question_text)?;
        require_non_empty("subject", subject)?;

        let doubt = NewDoubt {
            question_text: question_text.to_string(),
            subject: subject.to_string(),
            asked_by,
            status: DoubtStatus::Pending,
            answers: Vec::new(),
            timestamp: self.clock.now(),
        };
        let id = self.store.insert_doubt(doubt).await?;
        info!(doubt_id = %id, %asked_by, subject, "Doubt created");
        Ok(id)
    }

    /// Point lookup. An unknown id is `Ok(None)`, not an error.
    pub async fn get_by_id(&self, id: Uuid) -> PortResult<Option<Doubt>> {
        self.store.get_doubt(id).await
    }

    /// All doubts for `subject`, most recent first. An empty subject matches nothing.
    pub async fn list_by_subject(&self, subject: &str) -> PortResult<Vec<Doubt>> {
        if subject.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .query_doubts(DoubtFilter::Subject(subject.to_string()))
            .await
    }

    pub async fn list_by_asker(&self, asked_by: Uuid) -> PortResult<Vec<Doubt>> {
        self.store.query_doubts(DoubtFilter::AskedBy(asked_by)).await
    }

    pub async fn list_all(&self) -> PortResult<Vec<Doubt>> {
        self.store.query_doubts(DoubtFilter::All).await
    }

    /// Applies a whitelisted partial update. Fails with `NotFound` for an unknown id.
    pub async fn update(&self, id: Uuid, update: DoubtUpdate) -> PortResult<()> {
        if update.is_empty() {
            return Err(PortError::Validation(
                "update must change at least one field".to_string(),
            ));
        }
        if let Some(question_text) = &update.question_text {
            require_non_empty("question text", question_text)?;
        }
        if let Some(subject) = &update.subject {
            require_non_empty("subject", subject)?;
        }
        if let Some(answers) = &update.answers {
            for answer in answers {
                require_non_empty("answer text", &answer.answer_text)?;
            }
        }
        self.store.update_doubt(id, update).await?;
        debug!(doubt_id = %id, "Doubt updated");
        Ok(())
    }

    pub async fn mark_resolved(&self, id: Uuid) -> PortResult<()> {
        self.update(
            id,
            DoubtUpdate {
                status: Some(DoubtStatus::Resolved),
                ..DoubtUpdate::default()
            },
        )
        .await
    }

    /// Appends an answer by reading the current sequence and writing back the
    /// extended copy. Two concurrent appends to the same doubt race: the
    /// later write wins and the other answer is lost.
    pub async fn append_answer(
        &self,
        id: Uuid,
        answer_text: &str,
        answered_by: Uuid,
    ) -> PortResult<()> {
        require_non_empty("answer text", answer_text)?;

        let doubt = self
            .store
            .get_doubt(id)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("Doubt {} not found", id)))?;

        let mut answers = doubt.answers;
        answers.push(Answer {
            answer_text: answer_text.to_string(),
            answered_by,
            timestamp: self.clock.now(),
        });
        let count = answers.len();

        self.store
            .update_doubt(
                id,
                DoubtUpdate {
                    answers: Some(answers),
                    ..DoubtUpdate::default()
                },
            )
            .await?;
        info!(doubt_id = %id, %answered_by, answers = count, "Answer appended");
        Ok(())
    }
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> PortResult<()> {
    if value.trim().is_empty() {
        return Err(PortError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}
