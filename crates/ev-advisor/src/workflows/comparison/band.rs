use serde::Serialize;

/// Presentation tier for a match score in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Fair,
    Low,
    Unknown,
}

impl ScoreBand {
    pub fn classify(score: Option<f64>) -> Self {
        match score {
            Some(value) if value.is_nan() => Self::Unknown,
            Some(value) if value >= 0.8 => Self::Excellent,
            Some(value) if value >= 0.6 => Self::Good,
            Some(value) if value >= 0.4 => Self::Fair,
            Some(_) => Self::Low,
            None => Self::Unknown,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent match",
            Self::Good => "Good match",
            Self::Fair => "Fair match",
            Self::Low => "Low match",
            Self::Unknown => "No score",
        }
    }

    /// Colour tier used by clients when rendering the band.
    pub const fn color(self) -> &'static str {
        match self {
            Self::Excellent => "green",
            Self::Good => "emerald",
            Self::Fair => "amber",
            Self::Low => "orange",
            Self::Unknown => "gray",
        }
    }
}

/// Score as a whole percentage; a missing score reads as 0.
pub fn score_percentage(score: Option<f64>) -> u8 {
    let value = score.filter(|value| value.is_finite()).unwrap_or(0.0);
    (value * 100.0).round().clamp(0.0, 100.0) as u8
}
