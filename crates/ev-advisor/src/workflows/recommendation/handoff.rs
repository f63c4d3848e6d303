use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::workflows::survey::domain::Submission;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandoffError {
    #[error("no survey data found for this session; please retake the survey")]
    Empty,
}

#[derive(Debug, Clone)]
struct Deposit {
    submission: Submission,
    deposited_at: DateTime<Utc>,
}

/// Carries a completed submission from the summary step to the recommendation step. Each
/// deposit can be taken exactly once; a newer deposit replaces an unread one.
#[derive(Debug, Clone, Default)]
pub struct SubmissionHandoff {
    entries: Arc<Mutex<HashMap<String, Deposit>>>,
}

impl SubmissionHandoff {
    pub fn deposit(&self, key: &str, submission: Submission) {
        let mut guard = self.entries.lock().expect("handoff mutex poisoned");
        guard.insert(
            key.to_string(),
            Deposit {
                submission,
                deposited_at: Utc::now(),
            },
        );
    }

    pub fn take(&self, key: &str) -> Result<Submission, HandoffError> {
        let mut guard = self.entries.lock().expect("handoff mutex poisoned");
        guard
            .remove(key)
            .map(|deposit| deposit.submission)
            .ok_or(HandoffError::Empty)
    }

    pub fn deposited_at(&self, key: &str) -> Option<DateTime<Utc>> {
        let guard = self.entries.lock().expect("handoff mutex poisoned");
        guard.get(key).map(|deposit| deposit.deposited_at)
    }
}
