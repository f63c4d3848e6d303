use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use super::catalog::SurveyCatalog;
use super::domain::{DriveType, ProfileDraft, SeatChoice, Submission};
use super::repository::{RepositoryError, SessionId, SessionRecord, SessionRepository};
use super::session::{SurveySession, Transition, ValidationGap};
use crate::workflows::comparison::{recommendation_cards, BrandDirectory, RecommendationCard};
use crate::workflows::recommendation::{
    HandoffError, RankingService, RecommendationAdapter, RecommendationError, SubmissionHandoff,
};

/// Respondent actions accepted by a running session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionCommand {
    Start,
    UpdateProfile { profile: ProfileDraft },
    ConfirmProfile,
    Answer { option: usize },
    SelectSeats { seats: SeatChoice },
    SelectDrive { drive: DriveType },
    Next,
    Back,
}

impl SessionCommand {
    fn apply(self, session: &mut SurveySession) -> Transition {
        match self {
            Self::Start => session.start(),
            Self::UpdateProfile { profile } => session.update_profile(profile),
            Self::ConfirmProfile => session.confirm_profile(),
            Self::Answer { option } => session.answer(option),
            Self::SelectSeats { seats } => session.select_seats(seats),
            Self::SelectDrive { drive } => session.select_drive(drive),
            Self::Next => session.next(),
            Self::Back => session.back(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SurveyServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("survey is not ready to submit: {0}")]
    Incomplete(ValidationGap),
    #[error(transparent)]
    Handoff(#[from] HandoffError),
    #[error(transparent)]
    Recommendation(#[from] RecommendationError),
}

/// Service composing session storage, the submission handoff and the ranking adapter.
pub struct SurveyService<R, S> {
    catalog: Arc<SurveyCatalog>,
    repository: Arc<R>,
    adapter: Arc<RecommendationAdapter<S>>,
    handoff: SubmissionHandoff,
    brands: Arc<BrandDirectory>,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("survey-{id:06}"))
}

impl<R, S> SurveyService<R, S>
where
    R: SessionRepository + 'static,
    S: RankingService + 'static,
{
    pub fn new(
        catalog: Arc<SurveyCatalog>,
        repository: Arc<R>,
        adapter: Arc<RecommendationAdapter<S>>,
    ) -> Self {
        Self {
            catalog,
            repository,
            adapter,
            handoff: SubmissionHandoff::default(),
            brands: Arc::new(BrandDirectory::default()),
        }
    }

    pub fn with_brands(mut self, brands: Arc<BrandDirectory>) -> Self {
        self.brands = brands;
        self
    }

    pub fn catalog(&self) -> &SurveyCatalog {
        &self.catalog
    }

    pub fn brands(&self) -> &BrandDirectory {
        &self.brands
    }

    pub fn handoff(&self) -> &SubmissionHandoff {
        &self.handoff
    }

    /// Opens a fresh session on the welcome screen.
    pub fn open_session(&self) -> Result<SessionRecord, SurveyServiceError> {
        let record = SessionRecord::new(next_session_id(), SurveySession::new(self.catalog.clone()));
        let stored = self.repository.insert(record)?;
        info!(session = stored.id.as_str(), "survey session opened");
        Ok(stored)
    }

    pub fn get(&self, id: &SessionId) -> Result<SessionRecord, SurveyServiceError> {
        let record = self.repository.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Applies one respondent action. Rejected actions are reported, not persisted.
    pub fn apply(
        &self,
        id: &SessionId,
        command: SessionCommand,
    ) -> Result<(Transition, SessionRecord), SurveyServiceError> {
        let mut record = self.get(id)?;
        let transition = command.apply(&mut record.session);

        if let Transition::Rejected { gap } = &transition {
            debug!(session = id.as_str(), gap = %gap, "session command rejected");
            return Ok((transition, record));
        }

        record.updated_at = Utc::now();
        self.repository.update(record.clone())?;
        Ok((transition, record))
    }

    /// Builds the submission and parks it for the recommendation step.
    pub fn submit(&self, id: &SessionId) -> Result<Submission, SurveyServiceError> {
        let mut record = self.get(id)?;
        let submission = record
            .session
            .submit()
            .map_err(SurveyServiceError::Incomplete)?;

        let now = Utc::now();
        record.updated_at = now;
        record.submitted_at = Some(now);
        self.repository.update(record)?;

        self.handoff.deposit(id.as_str(), submission.clone());
        info!(
            session = id.as_str(),
            weights = %submission.summed_weight,
            "survey submitted"
        );
        Ok(submission)
    }

    /// Ranks the parked submission. The handoff is consumed once a request is admitted, so a
    /// duplicate caught by the guard leaves it in place.
    pub async fn recommendations(
        &self,
        id: &SessionId,
    ) -> Result<Vec<RecommendationCard>, SurveyServiceError> {
        self.get(id)?;
        let _permit = self
            .adapter
            .flights()
            .try_acquire(id.as_str())
            .ok_or(RecommendationError::InFlight)?;

        let submission = self.handoff.take(id.as_str())?;
        let cars = self
            .adapter
            .rank_unguarded(id.as_str(), &submission)
            .await?;
        Ok(recommendation_cards(cars, &self.brands))
    }
}
