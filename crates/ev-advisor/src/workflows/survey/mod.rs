//! Survey content, the respondent state machine, and weight aggregation.
//!
//! A session walks welcome, profile, the Likert questions, seat and drive preferences, and a
//! summary screen. Only a complete session produces a [`Submission`] for the ranking service.

pub mod aggregate;
pub mod catalog;
pub mod domain;
pub mod import;
pub mod repository;
pub mod router;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use aggregate::aggregate;
pub use catalog::{
    CatalogError, FactorKey, LikertOption, LikertQuestion, QuestionCursor, SurveyCatalog,
    SurveyFactor,
};
pub use domain::{
    AgeRange, AnswerMatrix, DriveType, FamilyStatus, Gender, IncomeRange, MaritalStatus,
    Occupation, ProfileDraft, ProfileField, SeatChoice, Submission, SummedWeights, UserId,
    UserProfile, VehicleStatus,
};
pub use import::{read_answer_sheets, read_answer_sheets_from_path, AnswerSheet, ImportError};
pub use repository::{
    QuestionView, RepositoryError, SessionId, SessionRecord, SessionRepository, SessionView,
};
pub use router::survey_router;
pub use service::{SessionCommand, SurveyService, SurveyServiceError};
pub use session::{Affordances, SurveySession, SurveyStep, Transition, ValidationGap};
