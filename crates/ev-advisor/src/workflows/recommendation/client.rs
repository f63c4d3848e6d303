use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::domain::RankedCar;
use super::error::RecommendationError;
use super::flight::SingleFlight;
use super::normalize::{normalize_response, PlaceholderPolicy};
use crate::config::RankingConfig;
use crate::workflows::survey::domain::Submission;

const USER_AGENT: &str = concat!("ev-advisor/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ERROR_SNIPPET_LIMIT: usize = 200;

/// Transport to the external ranking service. Returns the raw JSON body on success.
#[async_trait]
pub trait RankingService: Send + Sync {
    async fn rank(&self, submission: &Submission) -> Result<Value, RecommendationError>;
}

/// Ranking service reached over HTTP with a JSON POST.
#[derive(Debug, Clone)]
pub struct HttpRankingService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRankingService {
    pub fn new(config: &RankingConfig) -> Result<Self, RecommendationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(config.timeout))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| {
                RecommendationError::Network(format!("failed to build HTTP client: {err}"))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl RankingService for HttpRankingService {
    async fn rank(&self, submission: &Submission) -> Result<Value, RecommendationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(submission)
            .send()
            .await
            .map_err(|err| RecommendationError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecommendationError::Service {
                status: status.as_u16(),
                message: service_message(&body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| RecommendationError::Network(err.to_string()))?;
        debug!(bytes = bytes.len(), "ranking service responded");

        serde_json::from_slice(&bytes).map_err(|err| {
            RecommendationError::Schema(format!("response body is not JSON: {err}"))
        })
    }
}

/// Extracts the `error` field the ranking service uses, or a trimmed snippet of the body.
fn service_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::String(message)) = map.get("error") {
            return message.clone();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(ERROR_SNIPPET_LIMIT).collect()
}

/// Sends submissions to the ranking service and normalizes the ranked results.
pub struct RecommendationAdapter<S> {
    service: Arc<S>,
    flights: SingleFlight,
    placeholders: PlaceholderPolicy,
}

impl<S> RecommendationAdapter<S>
where
    S: RankingService + 'static,
{
    pub fn new(service: Arc<S>, flights: SingleFlight, placeholders: PlaceholderPolicy) -> Self {
        Self {
            service,
            flights,
            placeholders,
        }
    }

    pub fn from_config(service: Arc<S>, config: &RankingConfig) -> Self {
        Self::new(
            service,
            SingleFlight::new(config.resubmit_cooldown),
            config.placeholders,
        )
    }

    pub fn flights(&self) -> &SingleFlight {
        &self.flights
    }

    pub fn placeholders(&self) -> PlaceholderPolicy {
        self.placeholders
    }

    /// Ranks `submission` for `session_key`. Refuses with `InFlight` while an earlier call
    /// for the same key is outstanding or cooling down.
    pub async fn recommend(
        &self,
        session_key: &str,
        submission: &Submission,
    ) -> Result<Vec<RankedCar>, RecommendationError> {
        let _permit = self.flights.try_acquire(session_key).ok_or_else(|| {
            warn!(session = session_key, "duplicate recommendation request suppressed");
            RecommendationError::InFlight
        })?;
        self.rank_unguarded(session_key, submission).await
    }

    /// Ranks without consulting the single-flight guard; the caller holds the permit.
    pub(crate) async fn rank_unguarded(
        &self,
        session_key: &str,
        submission: &Submission,
    ) -> Result<Vec<RankedCar>, RecommendationError> {
        let body = match self.service.rank(submission).await {
            Ok(body) => body,
            Err(err) => {
                warn!(session = session_key, error = %err, "ranking service call failed");
                return Err(err);
            }
        };

        let cars = normalize_response(body, self.placeholders).map_err(|err| {
            warn!(session = session_key, error = %err, "ranking response rejected");
            err
        })?;
        info!(
            session = session_key,
            results = cars.len(),
            placeholders = self.placeholders.label(),
            "recommendations ready"
        );
        Ok(cars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_message_prefers_error_field() {
        assert_eq!(
            service_message(r#"{"error": "ไม่พบรถที่เหมาะกับเงื่อนไข"}"#),
            "ไม่พบรถที่เหมาะกับเงื่อนไข"
        );
        assert_eq!(service_message("  Internal Server Error "), "Internal Server Error");
        assert_eq!(service_message(""), "empty response body");
    }
}
