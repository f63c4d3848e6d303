//! Turns ranking service payloads into presentation-ready [`RankedCar`] values.
//!
//! Attributes the service leaves out are never invented silently: every value is tagged with
//! its provenance, and the [`PlaceholderPolicy`] decides whether gaps are shown as fixed
//! estimates, randomized estimates, or as unknown.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use super::domain::{RankedCar, RawRankedCar, Sourced};
use super::error::RecommendationError;

/// Share of the nominal range used when the service does not report a real-world figure.
pub const REAL_RANGE_FACTOR: f64 = 0.85;
pub const PLACEHOLDER_WEBSITE: &str = "https://example.com/ev-cars";

/// Fixed estimates used by [`PlaceholderPolicy::Estimated`].
pub mod estimates {
    pub const BATTERY_KWH: f64 = 75.0;
    pub const REAL_RANGE_KM: f64 = 400.0;
    pub const ACCELERATION_SECS: f64 = 6.0;
    pub const EFFICIENCY_KWH_PER_100KM: f64 = 17.0;
    pub const FASTCHARGE_KMH: f64 = 250.0;
    pub const CHARGE_POWER_KW: f64 = 100.0;
    pub const TOWING_CAPACITY_KG: f64 = 0.0;
    pub const DRIVE_CONFIGURATION: &str = "FWD";
    pub const TOW_HITCH: bool = false;
    pub const SEGMENT: &str = "Compact";
}

const DRIVE_CONFIGURATIONS: [&str; 3] = ["FWD", "RWD", "AWD"];
const SEGMENTS: [&str; 4] = ["Compact", "Sedan", "SUV", "Luxury"];

/// How attributes missing from the service response are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderPolicy {
    /// Documented fixed values, tagged as estimates.
    #[default]
    Estimated,
    /// Values drawn from plausible ranges, tagged as estimates. A seed makes runs repeatable.
    Randomized { seed: Option<u64> },
    /// No value; the attribute is reported as unknown.
    Unknown,
}

impl PlaceholderPolicy {
    pub fn from_setting(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "estimated" | "fixed" => Some(Self::Estimated),
            "randomized" | "random" => Some(Self::Randomized { seed: None }),
            "unknown" | "none" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Estimated => "estimated",
            Self::Randomized { .. } => "randomized",
            Self::Unknown => "unknown",
        }
    }
}

enum Filler {
    Fixed,
    Random(StdRng),
    Unknown,
}

impl Filler {
    fn for_policy(policy: PlaceholderPolicy) -> Self {
        match policy {
            PlaceholderPolicy::Estimated => Self::Fixed,
            PlaceholderPolicy::Randomized { seed: Some(seed) } => {
                Self::Random(StdRng::seed_from_u64(seed))
            }
            PlaceholderPolicy::Randomized { seed: None } => Self::Random(StdRng::from_entropy()),
            PlaceholderPolicy::Unknown => Self::Unknown,
        }
    }

    fn number(
        &mut self,
        reported: Option<f64>,
        fixed: f64,
        draw: impl FnOnce(&mut StdRng) -> f64,
    ) -> Sourced<f64> {
        if let Some(value) = reported {
            return Sourced::Reported(value);
        }
        match self {
            Self::Fixed => Sourced::Estimated(fixed),
            Self::Random(rng) => Sourced::Estimated(draw(rng)),
            Self::Unknown => Sourced::Unknown,
        }
    }

    fn text(&mut self, reported: Option<String>, fixed: &str, choices: &[&str]) -> Sourced<String> {
        if let Some(value) = reported {
            return Sourced::Reported(value);
        }
        match self {
            Self::Fixed => Sourced::Estimated(fixed.to_string()),
            Self::Random(rng) => {
                let index = rng.gen_range(0..choices.len());
                Sourced::Estimated(choices[index].to_string())
            }
            Self::Unknown => Sourced::Unknown,
        }
    }

    fn flag(&mut self, reported: Option<bool>, fixed: bool) -> Sourced<bool> {
        if let Some(value) = reported {
            return Sourced::Reported(value);
        }
        match self {
            Self::Fixed => Sourced::Estimated(fixed),
            Self::Random(rng) => Sourced::Estimated(rng.gen_bool(0.3)),
            Self::Unknown => Sourced::Unknown,
        }
    }

    fn fixed_text(&self, reported: Option<String>, fixed: &str) -> Sourced<String> {
        match (reported, self) {
            (Some(value), _) => Sourced::Reported(value),
            (None, Self::Unknown) => Sourced::Unknown,
            (None, _) => Sourced::Estimated(fixed.to_string()),
        }
    }
}

/// Validates the response shape and normalizes each element in service order.
pub fn normalize_response(
    body: Value,
    policy: PlaceholderPolicy,
) -> Result<Vec<RankedCar>, RecommendationError> {
    let Value::Array(elements) = body else {
        return Err(RecommendationError::Schema(format!(
            "expected a JSON array of ranked cars, got {}",
            json_kind(&body)
        )));
    };

    let mut filler = Filler::for_policy(policy);
    elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| {
            if !element.is_object() {
                return Err(RecommendationError::Schema(format!(
                    "element {index} is {}, expected an object",
                    json_kind(&element)
                )));
            }
            let raw: RawRankedCar = serde_json::from_value(element).map_err(|err| {
                RecommendationError::Schema(format!("element {index} is malformed: {err}"))
            })?;
            normalize_car(index + 1, raw, &mut filler).ok_or_else(|| {
                RecommendationError::Schema(format!("element {index} has no model name"))
            })
        })
        .collect()
}

fn normalize_car(rank: usize, raw: RawRankedCar, filler: &mut Filler) -> Option<RankedCar> {
    let model = raw.model?;

    let brand = match raw.brand {
        Some(brand) => Sourced::Reported(brand),
        None => brand_from_model(&model)
            .map(Sourced::Derived)
            .unwrap_or(Sourced::Unknown),
    };

    let real_range = match (raw.real_range, raw.range) {
        (Some(value), _) => Sourced::Reported(value),
        (None, Some(range)) => Sourced::Derived((range * REAL_RANGE_FACTOR).floor()),
        (None, None) => filler.number(None, estimates::REAL_RANGE_KM, |rng| {
            f64::from(rng.gen_range(300..500_u32))
        }),
    };

    let battery = filler.number(raw.battery, estimates::BATTERY_KWH, |rng| {
        f64::from(rng.gen_range(50..100_u32))
    });
    let accelarate = filler.number(raw.accelarate, estimates::ACCELERATION_SECS, |rng| {
        f64::from(rng.gen_range(3..8_u32))
    });
    let efficiency = filler.number(
        raw.efficiency,
        estimates::EFFICIENCY_KWH_PER_100KM,
        |rng| f64::from(rng.gen_range(15..20_u32)),
    );
    let fastcharge = filler.number(raw.fastcharge, estimates::FASTCHARGE_KMH, |rng| {
        f64::from(rng.gen_range(100..400_u32))
    });
    let charge_power = filler.number(raw.charge_power, estimates::CHARGE_POWER_KW, |rng| {
        f64::from(rng.gen_range(50..150_u32))
    });
    let towing_capacity = filler.number(
        raw.towing_capacity,
        estimates::TOWING_CAPACITY_KG,
        |rng| {
            if rng.gen_bool(0.5) {
                0.0
            } else {
                f64::from(rng.gen_range(500..2000_u32))
            }
        },
    );
    let drive_configuration = filler.text(
        raw.drive_configuration,
        estimates::DRIVE_CONFIGURATION,
        &DRIVE_CONFIGURATIONS,
    );
    let tow_hitch = filler.flag(raw.tow_hitch, estimates::TOW_HITCH);
    let segment = filler.text(raw.segment, estimates::SEGMENT, &SEGMENTS);
    let website = filler.fixed_text(raw.website, PLACEHOLDER_WEBSITE);

    Some(RankedCar {
        rank,
        model,
        brand,
        score: raw.score,
        range: Sourced::reported_or_unknown(raw.range),
        real_range,
        battery,
        accelarate,
        topspeed: Sourced::reported_or_unknown(raw.topspeed),
        efficiency,
        fastcharge,
        charge_power,
        estimatedthbvalue: Sourced::reported_or_unknown(raw.estimatedthbvalue),
        towing_capacity,
        drive_configuration,
        tow_hitch,
        seats: Sourced::reported_or_unknown(raw.seats),
        segment,
        evimageurl: Sourced::reported_or_unknown(raw.evimageurl),
        website,
    })
}

/// First whitespace-delimited token of the model name.
pub fn brand_from_model(model: &str) -> Option<String> {
    model.split_whitespace().next().map(str::to_string)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
