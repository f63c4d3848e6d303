//! Preference-weighted EV survey scoring and the recommendation pipeline built on top of it.
//!
//! The survey workflow turns Likert answers into per-factor weights, the recommendation
//! workflow exchanges those weights with the external ranking service, and the comparison
//! workflow prepares ranked results for side-by-side presentation.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
