//! Exchange with the external ranking service: transport, response normalization, the
//! duplicate-request guard, and the summary-to-results handoff.

pub mod client;
pub mod domain;
pub mod error;
pub mod flight;
pub mod handoff;
pub mod normalize;

pub use client::{HttpRankingService, RankingService, RecommendationAdapter};
pub use domain::{RankedCar, RawRankedCar, Sourced};
pub use error::RecommendationError;
pub use flight::{FlightPermit, SingleFlight, DEFAULT_RESUBMIT_COOLDOWN};
pub use handoff::{HandoffError, SubmissionHandoff};
pub use normalize::{brand_from_model, normalize_response, PlaceholderPolicy};
