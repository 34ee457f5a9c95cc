//! Online statistical primitives.
//!
//! Every structure here is a bounded-memory sketch: constant-size
//! accumulators (moments, covariance, P-squared markers) or capped
//! collections (reservoir, frequency counter). Nothing in this module
//! retains per-row state proportional to stream length.

mod covariance;
mod frequency;
mod moments;
mod quantile;
mod reservoir;
mod rng;

pub use covariance::OnlineCovariance;
pub use frequency::BoundedFrequencyCounter;
pub use moments::MomentAccumulator;
pub use quantile::{exact_quantile, P2Quantile};
pub use reservoir::Reservoir;
pub use rng::SeededLcg;
