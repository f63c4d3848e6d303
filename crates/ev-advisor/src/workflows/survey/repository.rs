use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::{FactorKey, LikertOption, QuestionCursor};
use super::domain::{DriveType, ProfileDraft, SeatChoice, SummedWeights};
use super::session::{Affordances, SurveySession, SurveyStep};

/// Identifier wrapper for survey sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Repository record holding a session and its lifecycle timestamps.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: SessionId,
    pub session: SurveySession,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn new(id: SessionId, session: SurveySession) -> Self {
        let now = Utc::now();
        Self {
            id,
            session,
            created_at: now,
            updated_at: now,
            submitted_at: None,
        }
    }

    pub fn view(&self) -> SessionView {
        let session = &self.session;
        let catalog = session.catalog();
        let current_question = match session.step() {
            SurveyStep::Questions { factor, question } => {
                let cursor = QuestionCursor { factor, question };
                catalog.factors().get(factor).and_then(|survey_factor| {
                    let likert = catalog.question(cursor)?;
                    Some(QuestionView {
                        factor: survey_factor.key,
                        factor_title: survey_factor.title,
                        factor_description: survey_factor.description,
                        question_index: question,
                        questions_in_factor: survey_factor.questions.len(),
                        label: likert.label,
                        options: likert.options.clone(),
                        selected_score: session.answers().answer(survey_factor.key, question),
                    })
                })
            }
            _ => None,
        };

        SessionView {
            session_id: self.id.clone(),
            step: session.step(),
            progress: session.progress(),
            affordances: session.affordances(),
            current_question,
            profile: session.profile().clone(),
            answered: session.answers().answered(),
            total_questions: catalog.total_questions(),
            seats: session.seats(),
            drive: session.drive(),
            weights: session.weights(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            submitted_at: self.submitted_at,
        }
    }
}

/// Storage abstraction so the service can be exercised in isolation.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError>;
    fn update(&self, record: SessionRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("session already exists")]
    Conflict,
    #[error("session not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Question as presented to the respondent.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub factor: FactorKey,
    pub factor_title: &'static str,
    pub factor_description: &'static str,
    pub question_index: usize,
    pub questions_in_factor: usize,
    pub label: &'static str,
    pub options: Vec<LikertOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_score: Option<u8>,
}

/// Externally visible state of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub step: SurveyStep,
    pub progress: u8,
    pub affordances: Affordances,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question: Option<QuestionView>,
    pub profile: ProfileDraft,
    pub answered: usize,
    pub total_questions: usize,
    pub seats: Option<SeatChoice>,
    pub drive: Option<DriveType>,
    pub weights: SummedWeights,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}
