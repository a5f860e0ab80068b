//! Scoring - request record in, risk decision out
//!
//! `reconcile` shapes the request, `engine` runs the artifacts and `risk`
//! turns the probability into a tier. Nothing here keeps state between calls.

pub mod engine;
pub mod reconcile;
pub mod risk;

pub use engine::ScoringEngine;
pub use reconcile::reconcile;
pub use risk::RiskThresholds;
