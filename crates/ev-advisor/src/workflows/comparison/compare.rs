use serde::Serialize;

use crate::workflows::recommendation::{RankedCar, Sourced};

/// Maximum number of models shown side by side.
pub const MAX_COMPARE: usize = 3;
/// Models preselected when entering compare mode.
const SEEDED_SELECTION: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Best,
    Worst,
    Neither,
}

/// Marks `values[index]` as best or worst against every other present value.
///
/// Absent and non-finite values are skipped. A value only wins or loses strictly; ties and
/// single-member sets yield [`Indicator::Neither`].
pub fn compare_values(values: &[Option<f64>], index: usize, lower_is_better: bool) -> Indicator {
    if values.len() <= 1 {
        return Indicator::Neither;
    }
    let Some(current) = values.get(index).copied().flatten().filter(|v| v.is_finite()) else {
        return Indicator::Neither;
    };

    let others: Vec<f64> = values
        .iter()
        .enumerate()
        .filter(|(position, _)| *position != index)
        .filter_map(|(_, value)| value.filter(|v| v.is_finite()))
        .collect();
    if others.is_empty() {
        return Indicator::Neither;
    }

    let max = others.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = others.iter().copied().fold(f64::INFINITY, f64::min);
    let (beats_all, loses_all) = if lower_is_better {
        (current < min, current > max)
    } else {
        (current > max, current < min)
    };

    if beats_all {
        Indicator::Best
    } else if loses_all {
        Indicator::Worst
    } else {
        Indicator::Neither
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionChange {
    Added,
    Removed,
    /// The set is full; nothing changed.
    Rejected,
}

/// Models chosen for side-by-side comparison, identified by model name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompareSet {
    models: Vec<String>,
}

impl CompareSet {
    /// Compare-mode entry: the first two results are preselected.
    pub fn seeded(cars: &[RankedCar]) -> Self {
        Self {
            models: cars
                .iter()
                .take(SEEDED_SELECTION)
                .map(|car| car.model.clone())
                .collect(),
        }
    }

    pub fn toggle(&mut self, model: &str) -> SelectionChange {
        if let Some(position) = self.models.iter().position(|selected| selected == model) {
            self.models.remove(position);
            return SelectionChange::Removed;
        }
        if self.models.len() >= MAX_COMPARE {
            return SelectionChange::Rejected;
        }
        self.models.push(model.to_string());
        SelectionChange::Added
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|selected| selected == model)
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn clear(&mut self) {
        self.models.clear();
    }

    /// Selected cars in selection order; unknown models are skipped.
    pub fn resolve<'a>(&self, cars: &'a [RankedCar]) -> Vec<&'a RankedCar> {
        self.models
            .iter()
            .filter_map(|model| cars.iter().find(|car| &car.model == model))
            .collect()
    }
}

/// Attributes shown as rows of the comparison table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMetric {
    Price,
    Battery,
    Range,
    RealRange,
    Acceleration,
    TopSpeed,
    Efficiency,
    FastCharge,
    ChargePower,
    TowingCapacity,
    Seats,
}

impl ComparisonMetric {
    pub const fn ordered() -> [Self; 11] {
        [
            Self::Price,
            Self::Battery,
            Self::Range,
            Self::RealRange,
            Self::Acceleration,
            Self::TopSpeed,
            Self::Efficiency,
            Self::FastCharge,
            Self::ChargePower,
            Self::TowingCapacity,
            Self::Seats,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Price => "Price (THB)",
            Self::Battery => "Battery (kWh)",
            Self::Range => "Range (km)",
            Self::RealRange => "Real range (km)",
            Self::Acceleration => "0-100 km/h (s)",
            Self::TopSpeed => "Top speed (km/h)",
            Self::Efficiency => "Efficiency (Wh/km)",
            Self::FastCharge => "Fast charge (km/h)",
            Self::ChargePower => "Charge power (kW)",
            Self::TowingCapacity => "Towing capacity (kg)",
            Self::Seats => "Seats",
        }
    }

    pub const fn lower_is_better(self) -> bool {
        matches!(self, Self::Price | Self::Acceleration | Self::Efficiency)
    }

    pub fn attribute(self, car: &RankedCar) -> &Sourced<f64> {
        match self {
            Self::Price => &car.estimatedthbvalue,
            Self::Battery => &car.battery,
            Self::Range => &car.range,
            Self::RealRange => &car.real_range,
            Self::Acceleration => &car.accelarate,
            Self::TopSpeed => &car.topspeed,
            Self::Efficiency => &car.efficiency,
            Self::FastCharge => &car.fastcharge,
            Self::ChargePower => &car.charge_power,
            Self::TowingCapacity => &car.towing_capacity,
            Self::Seats => &car.seats,
        }
    }

    pub fn value(self, car: &RankedCar) -> Option<f64> {
        let value = self.attribute(car).number()?;
        match self {
            Self::TowingCapacity => Some(value.max(0.0)),
            _ => Some(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonCell {
    pub model: String,
    pub value: Option<f64>,
    pub source: &'static str,
    pub indicator: Indicator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub metric: ComparisonMetric,
    pub label: &'static str,
    pub lower_is_better: bool,
    pub cells: Vec<ComparisonCell>,
}

/// Builds one row per metric for the selected cars, in the order given.
pub fn comparison_table(cars: &[&RankedCar]) -> Vec<ComparisonRow> {
    ComparisonMetric::ordered()
        .into_iter()
        .map(|metric| {
            let values: Vec<Option<f64>> = cars.iter().map(|car| metric.value(car)).collect();
            let cells = cars
                .iter()
                .enumerate()
                .map(|(index, car)| ComparisonCell {
                    model: car.model.clone(),
                    value: values[index],
                    source: metric.attribute(car).source_label(),
                    indicator: compare_values(&values, index, metric.lower_is_better()),
                })
                .collect();
            ComparisonRow {
                metric,
                label: metric.label(),
                lower_is_better: metric.lower_is_better(),
                cells,
            }
        })
        .collect()
}
