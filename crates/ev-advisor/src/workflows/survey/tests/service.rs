use super::common::*;
use std::sync::Arc;
use std::time::Duration;

use crate::workflows::comparison::ScoreBand;
use crate::workflows::recommendation::{HandoffError, RecommendationError};
use crate::workflows::survey::repository::{RepositoryError, SessionId};
use crate::workflows::survey::{
    FactorKey, SessionCommand, SurveyServiceError, SurveyStep, Transition, ValidationGap,
};

#[test]
fn open_session_starts_on_welcome_with_distinct_ids() {
    let (service, repository, _) = build_service(StubRanking::returning(ranked_body()));

    let first = service.open_session().expect("session opens");
    let second = service.open_session().expect("session opens");

    assert_ne!(first.id, second.id);
    assert!(first.id.as_str().starts_with("survey-"));
    assert_eq!(first.session.step(), SurveyStep::Welcome);
    assert_eq!(first.view().progress, 0);
    assert_eq!(repository.records.lock().expect("poisoned").len(), 2);
}

#[test]
fn accepted_commands_are_persisted() {
    let (service, repository, _) = build_service(StubRanking::returning(ranked_body()));
    let record = service.open_session().expect("session opens");

    let (transition, _) = service
        .apply(&record.id, SessionCommand::Start)
        .expect("start applies");
    assert_eq!(
        transition,
        Transition::Moved {
            from: SurveyStep::Welcome,
            to: SurveyStep::Profile
        }
    );

    let stored = repository
        .fetch_stored(&record.id)
        .expect("record persisted");
    assert_eq!(stored.session.step(), SurveyStep::Profile);
    assert!(stored.updated_at >= record.updated_at);
}

#[test]
fn rejected_commands_leave_the_stored_session_untouched() {
    let (service, repository, _) = build_service(StubRanking::returning(ranked_body()));
    let record = service.open_session().expect("session opens");
    service
        .apply(&record.id, SessionCommand::Start)
        .expect("start applies");

    let (transition, view_record) = service
        .apply(&record.id, SessionCommand::ConfirmProfile)
        .expect("command evaluates");

    match transition {
        Transition::Rejected {
            gap: ValidationGap::ProfileIncomplete { missing },
        } => assert_eq!(missing.len(), 7),
        other => panic!("expected incomplete profile, got {other:?}"),
    }
    assert_eq!(view_record.session.step(), SurveyStep::Profile);
    let stored = repository
        .fetch_stored(&record.id)
        .expect("record persisted");
    assert_eq!(stored.session.step(), SurveyStep::Profile);
}

#[test]
fn submit_before_summary_reports_the_gap() {
    let (service, _, _) = build_service(StubRanking::returning(ranked_body()));
    let record = service.open_session().expect("session opens");

    match service.submit(&record.id) {
        Err(SurveyServiceError::Incomplete(ValidationGap::NotAvailable { action, step })) => {
            assert_eq!(action, "submit");
            assert_eq!(step, "welcome");
        }
        other => panic!("expected incomplete error, got {other:?}"),
    }
    assert!(service.handoff().deposited_at(record.id.as_str()).is_none());
}

#[test]
fn submit_parks_the_submission_for_recommendations() {
    let (service, repository, _) = build_service(StubRanking::returning(ranked_body()));
    let id = session_at_summary(&service);

    let submission = service.submit(&id).expect("submission builds");

    // option 0 scores 9 on regular questions and 1 on inverted ones
    assert_eq!(submission.summed_weight.get(FactorKey::Battery), 18);
    assert_eq!(submission.summed_weight.get(FactorKey::Price), 10);
    assert!(!submission.user_profile.user_id.0.is_empty());
    assert!(service.handoff().deposited_at(id.as_str()).is_some());

    let stored = repository.fetch_stored(&id).expect("record persisted");
    assert!(stored.submitted_at.is_some());
    assert_eq!(
        stored.session.profile().user_id.as_ref(),
        Some(&submission.user_profile.user_id)
    );
}

#[tokio::test]
async fn recommendations_rank_the_submission_and_consume_it() {
    let (service, _, ranking) = build_service(StubRanking::returning(ranked_body()));
    let id = session_at_summary(&service);
    let submission = service.submit(&id).expect("submission builds");

    let cards = service.recommendations(&id).await.expect("ranking succeeds");

    assert_eq!(ranking.received(), vec![submission]);
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].car.rank, 1);
    assert_eq!(cards[0].car.model, "BYD Seal");
    assert_eq!(cards[0].percentage, 91);
    assert_eq!(cards[0].band, ScoreBand::Excellent);
    assert_eq!(
        cards[0].brand_logo.as_deref(),
        Some("https://cdn.example.com/logos/byd.png")
    );
    assert_eq!(cards[1].band, ScoreBand::Good);
    assert_eq!(cards[1].brand_logo, None);

    match service.recommendations(&id).await {
        Err(SurveyServiceError::Handoff(HandoffError::Empty)) => {}
        other => panic!("expected empty handoff, got {other:?}"),
    }
    assert_eq!(ranking.calls(), 1);
}

#[tokio::test]
async fn duplicate_request_during_flight_is_refused() {
    let repository = Arc::new(MemoryRepository::default());
    let ranking =
        Arc::new(StubRanking::returning(ranked_body()).delayed(Duration::from_millis(50)));
    let service = service_with(repository, ranking.clone(), Duration::ZERO);
    let id = session_at_summary(&service);
    service.submit(&id).expect("submission builds");

    let (first, second) = tokio::join!(service.recommendations(&id), service.recommendations(&id));

    assert!(first.is_ok());
    assert!(matches!(
        second,
        Err(SurveyServiceError::Recommendation(RecommendationError::InFlight))
    ));
    assert_eq!(ranking.calls(), 1);
}

#[tokio::test]
async fn resubmission_inside_cooldown_is_refused_without_consuming_the_handoff() {
    let repository = Arc::new(MemoryRepository::default());
    let ranking = Arc::new(StubRanking::returning(ranked_body()));
    let service = service_with(repository, ranking.clone(), Duration::from_secs(30));
    let id = session_at_summary(&service);

    service.submit(&id).expect("submission builds");
    service.recommendations(&id).await.expect("ranking succeeds");

    service.submit(&id).expect("second submission builds");
    match service.recommendations(&id).await {
        Err(SurveyServiceError::Recommendation(RecommendationError::InFlight)) => {}
        other => panic!("expected in-flight refusal, got {other:?}"),
    }
    assert!(service.handoff().deposited_at(id.as_str()).is_some());
    assert_eq!(ranking.calls(), 1);
}

#[tokio::test]
async fn ranking_failure_is_surfaced_and_the_handoff_is_spent() {
    let (service, _, _) = build_service(StubRanking::failing(RecommendationError::Service {
        status: 500,
        message: "model offline".to_string(),
    }));
    let id = session_at_summary(&service);
    service.submit(&id).expect("submission builds");

    match service.recommendations(&id).await {
        Err(SurveyServiceError::Recommendation(RecommendationError::Service { status, .. })) => {
            assert_eq!(status, 500)
        }
        other => panic!("expected service error, got {other:?}"),
    }
    assert!(matches!(
        service.recommendations(&id).await,
        Err(SurveyServiceError::Handoff(HandoffError::Empty))
    ));
}

#[tokio::test]
async fn unknown_sessions_are_not_found() {
    let (service, _, ranking) = build_service(StubRanking::returning(ranked_body()));
    let missing = SessionId("survey-missing".to_string());

    assert!(matches!(
        service.get(&missing),
        Err(SurveyServiceError::Repository(RepositoryError::NotFound))
    ));
    assert!(matches!(
        service.recommendations(&missing).await,
        Err(SurveyServiceError::Repository(RepositoryError::NotFound))
    ));
    assert_eq!(ranking.calls(), 0);
}

#[test]
fn repository_outage_propagates() {
    let service = service_with(
        Arc::new(UnavailableRepository),
        Arc::new(StubRanking::returning(ranked_body())),
        Duration::ZERO,
    );

    match service.open_session() {
        Err(SurveyServiceError::Repository(RepositoryError::Unavailable(reason))) => {
            assert_eq!(reason, "database offline")
        }
        other => panic!("expected unavailable repository, got {other:?}"),
    }
}
