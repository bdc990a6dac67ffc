//! Strategy layer
//!
//! Expected value, sizing, ranking, portfolio control, and the decision
//! pipeline that ties them together

mod ev;
mod pipeline;
mod portfolio;
mod ranker;
mod sizing;

pub use ev::{estimate_ev, EvEstimate, MAX_EDGE};
pub use pipeline::{generate_signals, PipelineOutcome, PipelineStats, StrategyPipeline};
pub use portfolio::{PortfolioManager, PortfolioPosition};
pub use ranker::{CandidateOpportunity, Recommendation, RecommendationRanker, RiskFlag};
pub use sizing::PositionSizer;
