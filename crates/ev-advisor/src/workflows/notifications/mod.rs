//! Batched delivery of recommendation summaries. Each batch is an independent unit of work:
//! one batch failing never prevents the others from being attempted.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::workflows::comparison::score_percentage;
use crate::workflows::recommendation::RankedCar;

/// Recipients addressed by a single outbound message.
pub const RECIPIENTS_PER_BATCH: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportFailure(pub String);

/// Delivery channel for outbound messages.
#[async_trait]
pub trait NotificationTransport: Send + Sync + 'static {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportFailure>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    Delivered,
    Partial,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub batch: usize,
    pub recipients: Vec<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub outcome: DispatchOutcome,
    pub batches: usize,
    pub delivered: usize,
    pub failures: Vec<BatchFailure>,
}

impl DispatchReport {
    pub fn summary(&self) -> String {
        match self.outcome {
            DispatchOutcome::Delivered => format!("delivered all {} batches", self.batches),
            DispatchOutcome::Partial => {
                format!("delivered {}/{} batches", self.delivered, self.batches)
            }
            DispatchOutcome::Failed => format!("all {} batches failed", self.batches),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("no recipients supplied")]
    NoRecipients,
}

/// Splits a comma-separated recipient list, dropping blanks.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|recipient| !recipient.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct NotificationDispatcher<T> {
    transport: Arc<T>,
    batch_size: usize,
}

impl<T> NotificationDispatcher<T>
where
    T: NotificationTransport,
{
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_batch_size(transport, RECIPIENTS_PER_BATCH)
    }

    pub fn with_batch_size(transport: Arc<T>, batch_size: usize) -> Self {
        Self {
            transport,
            batch_size: batch_size.max(1),
        }
    }

    /// Sends one message per batch concurrently and reports how many succeeded.
    pub async fn dispatch(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<DispatchReport, DispatchError> {
        if recipients.is_empty() {
            return Err(DispatchError::NoRecipients);
        }

        let batches: Vec<Vec<String>> = recipients
            .chunks(self.batch_size)
            .map(<[String]>::to_vec)
            .collect();
        let total = batches.len();

        let mut tasks = JoinSet::new();
        for (batch, recipients) in batches.iter().cloned().enumerate() {
            let transport = Arc::clone(&self.transport);
            let message = OutboundMessage {
                recipients,
                subject: subject.to_string(),
                body: body.to_string(),
            };
            tasks.spawn(async move { (batch, transport.send(&message).await) });
        }

        let mut delivered = 0;
        let mut failures = Vec::new();
        let mut reported = vec![false; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((batch, Ok(()))) => {
                    reported[batch] = true;
                    delivered += 1;
                }
                Ok((batch, Err(err))) => {
                    reported[batch] = true;
                    failures.push(BatchFailure {
                        batch,
                        recipients: batches[batch].clone(),
                        reason: err.to_string(),
                    });
                }
                Err(join_error) => {
                    warn!(error = %join_error, "notification batch task aborted");
                }
            }
        }

        // a panicked task never reports its batch index
        for (batch, _) in reported.iter().enumerate().filter(|(_, seen)| !**seen) {
            failures.push(BatchFailure {
                batch,
                recipients: batches[batch].clone(),
                reason: "delivery task panicked".to_string(),
            });
        }

        failures.sort_by_key(|failure| failure.batch);
        let outcome = match (delivered, total) {
            (d, t) if d == t => DispatchOutcome::Delivered,
            (0, _) => DispatchOutcome::Failed,
            _ => DispatchOutcome::Partial,
        };

        let report = DispatchReport {
            outcome,
            batches: total,
            delivered,
            failures,
        };
        if report.outcome == DispatchOutcome::Delivered {
            info!(batches = total, "notifications dispatched");
        } else {
            warn!(summary = %report.summary(), "notification dispatch incomplete");
        }
        Ok(report)
    }
}

/// Plain-text digest of the top recommendations.
pub fn recommendation_digest(cars: &[RankedCar], limit: usize) -> String {
    let mut digest = String::from("Your EV recommendations\n");
    for car in cars.iter().take(limit) {
        let brand = car.brand_name().unwrap_or("-");
        let _ = writeln!(
            digest,
            "{}. {} ({}) - match {}%",
            car.rank,
            car.model,
            brand,
            score_percentage(car.score)
        );
    }
    if cars.is_empty() {
        digest.push_str("No matching models were found.\n");
    }
    digest
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<OutboundMessage>>,
        reject_containing: Option<&'static str>,
        panic_containing: Option<&'static str>,
    }

    #[async_trait]
    impl NotificationTransport for RecordingTransport {
        async fn send(&self, message: &OutboundMessage) -> Result<(), TransportFailure> {
            let hit = |needle: Option<&str>| {
                needle.is_some_and(|needle| message.recipients.iter().any(|r| r.contains(needle)))
            };
            if hit(self.panic_containing) {
                panic!("transport exploded");
            }
            if hit(self.reject_containing) {
                return Err(TransportFailure("mailbox unavailable".to_string()));
            }
            self.sent.lock().expect("sent mutex poisoned").push(message.clone());
            Ok(())
        }
    }

    fn recipients(raw: &str) -> Vec<String> {
        parse_recipients(raw)
    }

    #[test]
    fn parses_comma_separated_recipients() {
        assert_eq!(
            parse_recipients(" a@example.com, ,b@example.com,"),
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn batches_recipients_in_pairs() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = NotificationDispatcher::new(transport.clone());

        let report = dispatcher
            .dispatch(&recipients("a@x.th,b@x.th,c@x.th"), "EV picks", "body")
            .await
            .expect("dispatch runs");

        assert_eq!(report.outcome, DispatchOutcome::Delivered);
        assert_eq!(report.batches, 2);
        let mut sizes: Vec<usize> = transport
            .sent
            .lock()
            .expect("sent mutex poisoned")
            .iter()
            .map(|message| message.recipients.len())
            .collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2]);
    }

    #[tokio::test]
    async fn one_failing_batch_yields_partial_outcome() {
        let transport = Arc::new(RecordingTransport {
            reject_containing: Some("bounce"),
            ..RecordingTransport::default()
        });
        let dispatcher = NotificationDispatcher::new(transport);

        let report = dispatcher
            .dispatch(
                &recipients("a@x.th,b@x.th,bounce@x.th,d@x.th,e@x.th"),
                "EV picks",
                "body",
            )
            .await
            .expect("dispatch runs");

        assert_eq!(report.outcome, DispatchOutcome::Partial);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].batch, 1);
        assert_eq!(report.summary(), "delivered 2/3 batches");
    }

    #[tokio::test]
    async fn panicking_batch_is_isolated() {
        let transport = Arc::new(RecordingTransport {
            panic_containing: Some("boom"),
            ..RecordingTransport::default()
        });
        let dispatcher = NotificationDispatcher::new(transport);

        let report = dispatcher
            .dispatch(&recipients("boom@x.th,b@x.th,c@x.th"), "EV picks", "body")
            .await
            .expect("dispatch runs");

        assert_eq!(report.outcome, DispatchOutcome::Partial);
        assert_eq!(report.failures[0].reason, "delivery task panicked");
    }

    #[tokio::test]
    async fn every_batch_failing_is_reported_as_failed() {
        let transport = Arc::new(RecordingTransport {
            reject_containing: Some("@"),
            ..RecordingTransport::default()
        });
        let dispatcher = NotificationDispatcher::new(transport);

        let report = dispatcher
            .dispatch(&recipients("a@x.th,b@x.th,c@x.th"), "EV picks", "body")
            .await
            .expect("dispatch runs");
        assert_eq!(report.outcome, DispatchOutcome::Failed);
        assert_eq!(report.failures.len(), 2);
    }

    #[tokio::test]
    async fn empty_recipient_list_is_refused() {
        let dispatcher = NotificationDispatcher::new(Arc::new(RecordingTransport::default()));
        assert_eq!(
            dispatcher.dispatch(&[], "EV picks", "body").await,
            Err(DispatchError::NoRecipients)
        );
    }

    #[test]
    fn digest_lists_ranked_models() {
        use crate::workflows::recommendation::{normalize_response, PlaceholderPolicy};
        let cars = normalize_response(
            serde_json::json!([{ "model": "BYD Seal", "score": 0.876 }]),
            PlaceholderPolicy::Estimated,
        )
        .expect("normalizes");

        let digest = recommendation_digest(&cars, 3);
        assert!(digest.contains("1. BYD Seal (BYD) - match 88%"));
        assert!(recommendation_digest(&[], 3).contains("No matching models"));
    }
}
