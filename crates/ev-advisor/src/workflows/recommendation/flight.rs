use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// How long a settled request keeps blocking resubmission for the same key.
pub const DEFAULT_RESUBMIT_COOLDOWN: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy)]
enum Slot {
    InFlight,
    CoolingDown { until: Instant },
}

/// Allows at most one outstanding request per key.
#[derive(Debug, Clone)]
pub struct SingleFlight {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    cooldown: Duration,
}

impl Default for SingleFlight {
    fn default() -> Self {
        Self::new(DEFAULT_RESUBMIT_COOLDOWN)
    }
}

impl SingleFlight {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Claims `key`, or returns `None` while another request holds it or is cooling down.
    pub fn try_acquire(&self, key: &str) -> Option<FlightPermit> {
        let now = Instant::now();
        let mut guard = self.slots.lock().expect("single-flight mutex poisoned");
        guard.retain(|_, slot| match slot {
            Slot::InFlight => true,
            Slot::CoolingDown { until } => *until > now,
        });

        if guard.contains_key(key) {
            return None;
        }

        guard.insert(key.to_string(), Slot::InFlight);
        Some(FlightPermit {
            key: key.to_string(),
            slots: Arc::clone(&self.slots),
            cooldown: self.cooldown,
        })
    }

    pub fn is_busy(&self, key: &str) -> bool {
        let guard = self.slots.lock().expect("single-flight mutex poisoned");
        match guard.get(key) {
            Some(Slot::InFlight) => true,
            Some(Slot::CoolingDown { until }) => *until > Instant::now(),
            None => false,
        }
    }
}

/// Held for the lifetime of one request. Dropping it settles the key, whatever the outcome.
#[derive(Debug)]
pub struct FlightPermit {
    key: String,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    cooldown: Duration,
}

impl FlightPermit {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        // never panic while unwinding
        let Ok(mut guard) = self.slots.lock() else {
            return;
        };
        if self.cooldown.is_zero() {
            guard.remove(&self.key);
        } else {
            guard.insert(
                self.key.clone(),
                Slot::CoolingDown {
                    until: Instant::now() + self.cooldown,
                },
            );
        }
    }
}
