use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Provenance of a displayed attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum Sourced<T> {
    /// Returned by the ranking service.
    Reported(T),
    /// Computed from other reported attributes.
    Derived(T),
    /// Placeholder chosen by the active [`super::PlaceholderPolicy`].
    Estimated(T),
    Unknown,
}

impl<T> Sourced<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Reported(value) | Self::Derived(value) | Self::Estimated(value) => Some(value),
            Self::Unknown => None,
        }
    }

    pub fn is_reported(&self) -> bool {
        matches!(self, Self::Reported(_))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Estimated(_) | Self::Unknown)
    }

    pub fn source_label(&self) -> &'static str {
        match self {
            Self::Reported(_) => "reported",
            Self::Derived(_) => "derived",
            Self::Estimated(_) => "estimated",
            Self::Unknown => "unknown",
        }
    }

    pub(crate) fn reported_or_unknown(value: Option<T>) -> Self {
        value.map(Self::Reported).unwrap_or(Self::Unknown)
    }
}

impl Sourced<f64> {
    pub fn number(&self) -> Option<f64> {
        self.value().copied().filter(|value| value.is_finite())
    }
}

/// Element of the ranking service response before normalization. Column aliases cover the
/// cleaned names the service emits.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRankedCar {
    #[serde(default, deserialize_with = "strict_string")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "match_score")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub range: Option<f64>,
    #[serde(default, alias = "realrange", deserialize_with = "lenient_number")]
    pub real_range: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub battery: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub accelarate: Option<f64>,
    #[serde(default, alias = "top_speed", deserialize_with = "lenient_number")]
    pub topspeed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub efficiency: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fastcharge: Option<f64>,
    #[serde(default, alias = "chargepower", deserialize_with = "lenient_number")]
    pub charge_power: Option<f64>,
    #[serde(
        default,
        alias = "estimated_thb_value",
        deserialize_with = "lenient_number"
    )]
    pub estimatedthbvalue: Option<f64>,
    #[serde(default, alias = "towingcapacity", deserialize_with = "lenient_number")]
    pub towing_capacity: Option<f64>,
    #[serde(
        default,
        alias = "driveconfiguration",
        deserialize_with = "lenient_string"
    )]
    pub drive_configuration: Option<String>,
    #[serde(default, alias = "towhitch", deserialize_with = "lenient_bool")]
    pub tow_hitch: Option<bool>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub seats: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub segment: Option<String>,
    #[serde(default, alias = "ev_image_url", deserialize_with = "lenient_string")]
    pub evimageurl: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub website: Option<String>,
}

/// A recommended model ready for presentation. Service order is carried in `rank`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCar {
    pub rank: usize,
    pub model: String,
    pub brand: Sourced<String>,
    pub score: Option<f64>,
    pub range: Sourced<f64>,
    pub real_range: Sourced<f64>,
    pub battery: Sourced<f64>,
    pub accelarate: Sourced<f64>,
    pub topspeed: Sourced<f64>,
    pub efficiency: Sourced<f64>,
    pub fastcharge: Sourced<f64>,
    pub charge_power: Sourced<f64>,
    pub estimatedthbvalue: Sourced<f64>,
    pub towing_capacity: Sourced<f64>,
    pub drive_configuration: Sourced<String>,
    pub tow_hitch: Sourced<bool>,
    pub seats: Sourced<f64>,
    pub segment: Sourced<String>,
    pub evimageurl: Sourced<String>,
    pub website: Sourced<String>,
}

impl RankedCar {
    pub fn brand_name(&self) -> Option<&str> {
        self.brand.value().map(String::as_str)
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

/// Scores are fractions in `0.0..=1.0`. Separators are not stripped, so a decimal comma such as
/// `"0,92"` is absent rather than 92.
fn match_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let score = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(score.filter(|score| (0.0..=1.0).contains(score)))
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|value| value.is_finite()),
        Value::String(raw) => {
            let cleaned: String = raw
                .trim()
                .chars()
                .filter(|ch| *ch != ',' && *ch != '_')
                .collect();
            cleaned
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
        }
        _ => None,
    }
}

/// Identity fields accept only JSON strings.
fn strict_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(raw)) => Some(raw.trim().to_string()).filter(|value| !value.is_empty()),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(raw)) => Some(raw.trim().to_string()).filter(|value| !value.is_empty()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(flag)) => Some(flag),
        Some(Value::Number(number)) => number.as_f64().map(|value| value != 0.0),
        Some(Value::String(raw)) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}
