//! Signal types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Contract side of a binary market
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Contract {
    /// Buy Yes contracts
    Yes,
    /// Buy No contracts
    No,
}

impl Contract {
    /// The opposing contract side
    pub fn opposite(self) -> Self {
        match self {
            Contract::Yes => Contract::No,
            Contract::No => Contract::Yes,
        }
    }
}

impl std::fmt::Display for Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Contract::Yes => write!(f, "YES"),
            Contract::No => write!(f, "NO"),
        }
    }
}

/// Directional lean of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Yes,
    No,
    Neutral,
}

impl Direction {
    /// Whether the signal takes a side at all
    pub fn is_directional(self) -> bool {
        self != Direction::Neutral
    }

    /// Convert to a tradeable contract side, if directional
    pub fn as_contract(self) -> Option<Contract> {
        match self {
            Direction::Yes => Some(Contract::Yes),
            Direction::No => Some(Contract::No),
            Direction::Neutral => None,
        }
    }
}

impl From<Contract> for Direction {
    fn from(contract: Contract) -> Self {
        match contract {
            Contract::Yes => Direction::Yes,
            Contract::No => Direction::No,
        }
    }
}

/// Directional insight produced from one or more features
///
/// Output of a signal generator, consumed by the strategy layer.
/// Immutable once created; strength and confidence are clamped to [0, 1]
/// at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Generator name (e.g. "late_kickoff_vol")
    pub name: String,
    /// Which side to bet
    pub direction: Direction,
    /// Signal strength in [0, 1]
    pub strength: Decimal,
    /// Confidence in the signal, in [0, 1]
    pub confidence: Decimal,
    /// Human-readable explanation
    pub rationale: String,
    /// Market the signal applies to
    pub market_id: String,
    /// When the signal was generated
    pub timestamp: DateTime<Utc>,
    /// Feature names the generator consumed, for correlation analysis
    pub features_used: BTreeSet<String>,
}

impl Signal {
    /// Create a new signal, clamping strength and confidence to [0, 1]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        direction: Direction,
        strength: Decimal,
        confidence: Decimal,
        rationale: impl Into<String>,
        market_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        features_used: BTreeSet<String>,
    ) -> Self {
        Self {
            name: name.into(),
            direction,
            strength: strength.clamp(Decimal::ZERO, Decimal::ONE),
            confidence: confidence.clamp(Decimal::ZERO, Decimal::ONE),
            rationale: rationale.into(),
            market_id: market_id.into(),
            timestamp,
            features_used,
        }
    }

    /// Combined score: strength x confidence
    pub fn composite_score(&self) -> Decimal {
        self.strength * self.confidence
    }
}
