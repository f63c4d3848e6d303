use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};

use crate::workflows::comparison::{BrandDirectory, BrandEntry};
use crate::workflows::recommendation::{
    PlaceholderPolicy, RankingService, RecommendationAdapter, RecommendationError, SingleFlight,
};
use crate::workflows::survey::domain::{
    AgeRange, DriveType, FamilyStatus, Gender, IncomeRange, MaritalStatus, Occupation,
    ProfileDraft, SeatChoice, Submission, VehicleStatus,
};
use crate::workflows::survey::repository::{
    RepositoryError, SessionId, SessionRecord, SessionRepository,
};
use crate::workflows::survey::{
    survey_router, SessionCommand, SurveyCatalog, SurveyService, SurveyStep,
};

pub(super) fn complete_profile() -> ProfileDraft {
    ProfileDraft {
        gender: Some(Gender::Female),
        age_range: Some(AgeRange::From25To34),
        occupation: Some(Occupation::Employed),
        marital_status: Some(MaritalStatus::Single),
        family_status: Some(FamilyStatus::NoChildren),
        income_range: Some(IncomeRange::High),
        vehicle_status: Some(VehicleStatus::Have),
        user_id: None,
    }
}

pub(super) fn ranked_body() -> Value {
    json!([
        {
            "model": "BYD Seal",
            "score": 0.91,
            "estimatedthbvalue": 1325000,
            "battery": 82.5,
            "range": 580,
            "seats": 5
        },
        {
            "model": "MG4 Electric",
            "score": "0.64",
            "estimatedthbvalue": 869900,
            "battery": 64
        }
    ])
}

pub(super) fn brands() -> Arc<BrandDirectory> {
    Arc::new(BrandDirectory::new(vec![BrandEntry {
        brand: "BYD".to_string(),
        image: "https://cdn.example.com/logos/byd.png".to_string(),
    }]))
}

/// Ranking service double returning a canned body, optionally after a delay.
pub(super) struct StubRanking {
    body: Value,
    failure: Option<RecommendationError>,
    delay: Duration,
    calls: AtomicUsize,
    received: Mutex<Vec<Submission>>,
}

impl StubRanking {
    pub(super) fn returning(body: Value) -> Self {
        Self {
            body,
            failure: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn failing(failure: RecommendationError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::returning(Value::Null)
        }
    }

    pub(super) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn received(&self) -> Vec<Submission> {
        self.received.lock().expect("stub mutex poisoned").clone()
    }
}

#[async_trait]
impl RankingService for StubRanking {
    async fn rank(&self, submission: &Submission) -> Result<Value, RecommendationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received
            .lock()
            .expect("stub mutex poisoned")
            .push(submission.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(self.body.clone()),
        }
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl MemoryRepository {
    pub(super) fn fetch_stored(&self, id: &SessionId) -> Option<SessionRecord> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned()
    }
}

impl SessionRepository for MemoryRepository {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: SessionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) struct UnavailableRepository;

impl SessionRepository for UnavailableRepository {
    fn insert(&self, _record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: SessionRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn service_with<R>(
    repository: Arc<R>,
    ranking: Arc<StubRanking>,
    cooldown: Duration,
) -> SurveyService<R, StubRanking>
where
    R: SessionRepository + 'static,
{
    let adapter = RecommendationAdapter::new(
        ranking,
        SingleFlight::new(cooldown),
        PlaceholderPolicy::Estimated,
    );
    SurveyService::new(
        SurveyCatalog::shared_standard(),
        repository,
        Arc::new(adapter),
    )
    .with_brands(brands())
}

pub(super) fn build_service(
    ranking: StubRanking,
) -> (
    SurveyService<MemoryRepository, StubRanking>,
    Arc<MemoryRepository>,
    Arc<StubRanking>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let ranking = Arc::new(ranking);
    let service = service_with(repository.clone(), ranking.clone(), Duration::ZERO);
    (service, repository, ranking)
}

/// Every command needed to take a fresh session to the summary screen.
pub(super) fn commands_to_summary(catalog: &SurveyCatalog) -> Vec<SessionCommand> {
    let mut commands = vec![
        SessionCommand::Start,
        SessionCommand::UpdateProfile {
            profile: complete_profile(),
        },
        SessionCommand::ConfirmProfile,
    ];
    commands.extend((0..catalog.total_questions()).map(|_| SessionCommand::Answer { option: 0 }));
    commands.extend([
        SessionCommand::SelectSeats {
            seats: SeatChoice::Five,
        },
        SessionCommand::Next,
        SessionCommand::SelectDrive {
            drive: DriveType::AllWheel,
        },
        SessionCommand::Next,
    ]);
    commands
}

pub(super) fn session_at_summary<R>(service: &SurveyService<R, StubRanking>) -> SessionId
where
    R: SessionRepository + 'static,
{
    let record = service.open_session().expect("session opens");
    for command in commands_to_summary(service.catalog()) {
        let (transition, _) = service.apply(&record.id, command).expect("command applies");
        assert!(!transition.is_rejected(), "unexpected rejection: {transition:?}");
    }
    let record = service.get(&record.id).expect("session exists");
    assert_eq!(record.session.step(), SurveyStep::Summary);
    record.id
}

pub(super) fn survey_router_with_service(
    service: SurveyService<MemoryRepository, StubRanking>,
) -> axum::Router {
    survey_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
