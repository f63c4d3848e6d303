//! Presentation rules applied to ranked recommendations: score bands, best/worst markers,
//! the capped compare set, and brand logos.

pub mod band;
pub mod brands;
pub mod compare;

pub use band::{score_percentage, ScoreBand};
pub use brands::{BrandDirectory, BrandDirectoryError, BrandEntry};
pub use compare::{
    compare_values, comparison_table, CompareSet, ComparisonCell, ComparisonMetric,
    ComparisonRow, Indicator, SelectionChange, MAX_COMPARE,
};

use serde::Serialize;

use crate::workflows::recommendation::RankedCar;

/// A ranked car with its display score, band and logo resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationCard {
    #[serde(flatten)]
    pub car: RankedCar,
    pub percentage: u8,
    pub band: ScoreBand,
    pub band_color: &'static str,
    pub brand_logo: Option<String>,
}

impl RecommendationCard {
    pub fn new(car: RankedCar, brands: &BrandDirectory) -> Self {
        let band = ScoreBand::classify(car.score);
        let brand_logo = car
            .brand_name()
            .and_then(|brand| brands.logo_for(brand))
            .map(str::to_string);
        Self {
            percentage: score_percentage(car.score),
            band,
            band_color: band.color(),
            brand_logo,
            car,
        }
    }
}

pub fn recommendation_cards(cars: Vec<RankedCar>, brands: &BrandDirectory) -> Vec<RecommendationCard> {
    cars.into_iter()
        .map(|car| RecommendationCard::new(car, brands))
        .collect()
}
