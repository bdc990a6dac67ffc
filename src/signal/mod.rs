//! Signal layer
//!
//! Signal types, the generator interface, and correlation-aware aggregation

mod aggregator;
mod generator;
mod types;

pub use aggregator::{AggregatedSignal, SignalAggregator};
pub use generator::{build_generators, LateKickoffVol, SignalGenerator};
pub use types::{Contract, Direction, Signal};
