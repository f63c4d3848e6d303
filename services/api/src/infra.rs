use async_trait::async_trait;
use ev_advisor::workflows::notifications::{
    NotificationDispatcher, NotificationTransport, OutboundMessage, TransportFailure,
};
use ev_advisor::workflows::recommendation::{RankingService, RecommendationError};
use ev_advisor::workflows::survey::{
    DriveType, FactorKey, RepositoryError, SessionId, SessionRecord, SessionRepository,
    Submission,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) notifier: Arc<NotificationDispatcher<LogNotificationTransport>>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl SessionRepository for InMemorySessionRepository {
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
        if guard.contains_key(&record.id) {
            guard.insert(record.id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

/// Transport that records deliveries in the log. Addresses without an `@` are refused.
#[derive(Default, Clone)]
pub(crate) struct LogNotificationTransport;

#[async_trait]
impl NotificationTransport for LogNotificationTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportFailure> {
        if let Some(invalid) = message
            .recipients
            .iter()
            .find(|recipient| !recipient.contains('@'))
        {
            return Err(TransportFailure(format!("invalid address '{invalid}'")));
        }
        info!(
            recipients = %message.recipients.join(","),
            subject = %message.subject,
            bytes = message.body.len(),
            "notification delivered"
        );
        Ok(())
    }
}

pub(crate) fn notification_dispatcher() -> Arc<NotificationDispatcher<LogNotificationTransport>> {
    Arc::new(NotificationDispatcher::new(Arc::new(
        LogNotificationTransport,
    )))
}

/// Sample specification row used by the offline ranking service.
struct SampleCar {
    model: &'static str,
    price: f64,
    battery: f64,
    range: f64,
    accelerate: f64,
    top_speed: f64,
    efficiency: f64,
    fastcharge: f64,
    seats: u8,
    drive: DriveType,
    segment: &'static str,
}

const SAMPLE_CARS: &[SampleCar] = &[
    SampleCar {
        model: "BYD Seal AWD Performance",
        price: 1_325_000.0,
        battery: 82.5,
        range: 580.0,
        accelerate: 3.8,
        top_speed: 180.0,
        efficiency: 172.0,
        fastcharge: 520.0,
        seats: 5,
        drive: DriveType::AllWheel,
        segment: "D",
    },
    SampleCar {
        model: "BYD Atto 3 Extended Range",
        price: 1_199_900.0,
        battery: 60.5,
        range: 420.0,
        accelerate: 7.3,
        top_speed: 160.0,
        efficiency: 165.0,
        fastcharge: 370.0,
        seats: 5,
        drive: DriveType::FrontWheel,
        segment: "C",
    },
    SampleCar {
        model: "MG4 Electric X",
        price: 869_900.0,
        battery: 51.0,
        range: 350.0,
        accelerate: 7.7,
        top_speed: 160.0,
        efficiency: 156.0,
        fastcharge: 380.0,
        seats: 5,
        drive: DriveType::RearWheel,
        segment: "C",
    },
    SampleCar {
        model: "Ora Good Cat Ultra",
        price: 828_500.0,
        battery: 63.1,
        range: 400.0,
        accelerate: 8.3,
        top_speed: 152.0,
        efficiency: 163.0,
        fastcharge: 330.0,
        seats: 5,
        drive: DriveType::FrontWheel,
        segment: "B",
    },
    SampleCar {
        model: "Neta V Smart",
        price: 549_000.0,
        battery: 38.5,
        range: 300.0,
        accelerate: 12.0,
        top_speed: 101.0,
        efficiency: 145.0,
        fastcharge: 230.0,
        seats: 5,
        drive: DriveType::FrontWheel,
        segment: "B",
    },
    SampleCar {
        model: "Tesla Model Y Long Range",
        price: 2_059_000.0,
        battery: 75.0,
        range: 533.0,
        accelerate: 5.0,
        top_speed: 217.0,
        efficiency: 168.0,
        fastcharge: 670.0,
        seats: 5,
        drive: DriveType::AllWheel,
        segment: "D",
    },
    SampleCar {
        model: "Volvo EX30 Single Motor",
        price: 1_590_000.0,
        battery: 64.0,
        range: 476.0,
        accelerate: 5.3,
        top_speed: 180.0,
        efficiency: 171.0,
        fastcharge: 520.0,
        seats: 5,
        drive: DriveType::RearWheel,
        segment: "B",
    },
    SampleCar {
        model: "BYD M6 Extended",
        price: 1_099_000.0,
        battery: 71.8,
        range: 530.0,
        accelerate: 10.1,
        top_speed: 180.0,
        efficiency: 175.0,
        fastcharge: 400.0,
        seats: 7,
        drive: DriveType::FrontWheel,
        segment: "M",
    },
    SampleCar {
        model: "Kia EV9 GT-Line",
        price: 3_599_000.0,
        battery: 99.8,
        range: 505.0,
        accelerate: 5.3,
        top_speed: 200.0,
        efficiency: 215.0,
        fastcharge: 460.0,
        seats: 7,
        drive: DriveType::AllWheel,
        segment: "E",
    },
];

/// Results returned by the offline ranking service.
const SAMPLE_RESULT_LIMIT: usize = 5;

impl SampleCar {
    fn factor(&self, key: FactorKey) -> f64 {
        match key {
            FactorKey::Battery => self.battery,
            FactorKey::Range => self.range,
            FactorKey::Acceleration => self.accelerate,
            FactorKey::TopSpeed => self.top_speed,
            FactorKey::Efficiency => self.efficiency,
            FactorKey::Price => self.price,
            FactorKey::FastCharge => self.fastcharge,
        }
    }

    fn to_json(&self, score: f64) -> Value {
        // battery, efficiency and charging figures come from the adapter's placeholder policy
        json!({
            "model": self.model,
            "score": (score * 1000.0).round() / 1000.0,
            "estimatedthbvalue": self.price,
            "range": self.range,
            "accelarate": self.accelerate,
            "topspeed": self.top_speed,
            "seats": self.seats,
            "segment": self.segment,
        })
    }
}

fn lower_is_better(key: FactorKey) -> bool {
    matches!(
        key,
        FactorKey::Price | FactorKey::Acceleration | FactorKey::Efficiency
    )
}

/// Ranking service backed by a fixed sample of models, for demos and local runs.
///
/// Each factor is min-max normalised across the candidates and weighted by the submission's
/// summed weights. Models with fewer seats than requested are dropped, and a drivetrain
/// mismatch costs ten percent of the score.
#[derive(Default, Clone)]
pub(crate) struct SampleRankingService;

#[async_trait]
impl RankingService for SampleRankingService {
    async fn rank(&self, submission: &Submission) -> Result<Value, RecommendationError> {
        let wanted_seats = submission.num_seats.seats();
        let mut candidates: Vec<&SampleCar> = SAMPLE_CARS
            .iter()
            .filter(|car| car.seats >= wanted_seats)
            .collect();
        if candidates.is_empty() {
            candidates = SAMPLE_CARS.iter().collect();
        }

        let weights = &submission.summed_weight;
        let total_weight = f64::from(weights.total().max(1));
        let mut scored: Vec<(f64, &SampleCar)> = candidates
            .iter()
            .map(|car| {
                let weighted: f64 = FactorKey::ordered()
                    .into_iter()
                    .map(|key| {
                        let values = candidates.iter().map(|other| other.factor(key));
                        let min = values.clone().fold(f64::INFINITY, f64::min);
                        let max = values.fold(f64::NEG_INFINITY, f64::max);
                        let normalised = if max > min {
                            (car.factor(key) - min) / (max - min)
                        } else {
                            1.0
                        };
                        let normalised = if lower_is_better(key) {
                            1.0 - normalised
                        } else {
                            normalised
                        };
                        f64::from(weights.get(key)) * normalised
                    })
                    .sum();
                let mut score = weighted / total_weight;
                if car.drive != submission.drive_con {
                    score *= 0.9;
                }
                (score, *car)
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(Value::Array(
            scored
                .into_iter()
                .take(SAMPLE_RESULT_LIMIT)
                .map(|(score, car)| car.to_json(score))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ev_advisor::workflows::survey::{
        AgeRange, FamilyStatus, Gender, IncomeRange, MaritalStatus, Occupation, SeatChoice,
        SummedWeights, UserId, UserProfile, VehicleStatus,
    };
    use std::collections::BTreeMap;

    fn submission(seats: SeatChoice, base_weight: u32, price_weight: u32) -> Submission {
        let mut weights = BTreeMap::new();
        for key in FactorKey::ordered() {
            weights.insert(key, base_weight);
        }
        weights.insert(FactorKey::Price, price_weight);
        Submission {
            user_profile: UserProfile {
                gender: Gender::Female,
                age_range: AgeRange::From25To34,
                occupation: Occupation::Employed,
                marital_status: MaritalStatus::Single,
                family_status: FamilyStatus::NoChildren,
                income_range: IncomeRange::Medium,
                user_id: UserId("demo".to_string()),
                vehicle_status: VehicleStatus::DoNotHave,
            },
            num_seats: seats,
            drive_con: DriveType::FrontWheel,
            summed_weight: SummedWeights(weights),
        }
    }

    #[tokio::test]
    async fn price_sensitive_respondents_get_the_cheapest_model_first() {
        let body = SampleRankingService
            .rank(&submission(SeatChoice::Five, 0, 18))
            .await
            .expect("sample ranking");
        let results = body.as_array().expect("array body");
        assert_eq!(results.len(), SAMPLE_RESULT_LIMIT);
        assert_eq!(results[0]["model"], "Neta V Smart");
    }

    #[tokio::test]
    async fn seat_requirement_filters_candidates() {
        let body = SampleRankingService
            .rank(&submission(SeatChoice::Seven, 2, 2))
            .await
            .expect("sample ranking");
        let results = body.as_array().expect("array body");
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|car| car["seats"] == 7));
    }

    #[tokio::test]
    async fn log_transport_refuses_malformed_addresses() {
        let transport = LogNotificationTransport;
        let message = OutboundMessage {
            recipients: vec!["ok@example.com".to_string(), "broken".to_string()],
            subject: "EV picks".to_string(),
            body: "body".to_string(),
        };
        assert!(transport.send(&message).await.is_err());
    }

    #[test]
    fn repository_update_requires_existing_record() {
        use ev_advisor::workflows::survey::{SurveyCatalog, SurveySession};
        let repository = InMemorySessionRepository::default();
        let record = SessionRecord::new(
            SessionId("survey-x".to_string()),
            SurveySession::new(SurveyCatalog::shared_standard()),
        );
        assert!(matches!(
            repository.update(record.clone()),
            Err(RepositoryError::NotFound)
        ));
        repository.insert(record.clone()).expect("insert succeeds");
        assert!(matches!(
            repository.insert(record),
            Err(RepositoryError::Conflict)
        ));
    }
}
