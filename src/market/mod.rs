//! Market snapshot types and the ingestion boundary
//!
//! A snapshot is a point-in-time view of one binary contract. Polling,
//! authentication, and on-disk persistence live outside this crate; callers
//! hand the core already-fetched batches through [`SnapshotSource`].

use crate::signal::Contract;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::io::BufRead;
use std::path::Path;

/// A single executed trade observed on the exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Execution price
    pub price: Decimal,
    /// Number of contracts
    pub size: u32,
    /// Which side the taker bought
    pub taker_side: Contract,
    /// Execution time
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time view of one sports market contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Unique market identifier
    pub market_id: String,
    /// Event (game) the market belongs to
    pub event_id: String,
    /// League code (e.g. "NFL")
    pub league: String,
    /// Matchup description (e.g. "KC @ BUF")
    #[serde(default)]
    pub matchup: String,
    /// Market title
    #[serde(default)]
    pub title: String,
    /// Snapshot time
    pub timestamp: DateTime<Utc>,
    /// Best Yes bid
    pub best_bid: Decimal,
    /// Best Yes ask
    pub best_ask: Decimal,
    /// Total resting bid depth in contracts
    #[serde(default)]
    pub bid_depth: Decimal,
    /// Total resting ask depth in contracts
    #[serde(default)]
    pub ask_depth: Decimal,
    /// Contracts traded in the last hour
    #[serde(default)]
    pub volume_1h: Decimal,
    /// Contracts traded in the last 24 hours
    #[serde(default)]
    pub volume_24h: Decimal,
    /// Seconds until kickoff; negative once the game is live
    #[serde(default)]
    pub time_to_kickoff: Option<i64>,
    /// Seconds until market resolution; negative once live
    #[serde(default)]
    pub time_to_resolution: Option<i64>,
    /// Precomputed feature values attached by the feature layer
    #[serde(default)]
    pub features: BTreeMap<String, Decimal>,
    /// Trades observed since the previous snapshot
    #[serde(default)]
    pub recent_trades: Vec<Trade>,
    /// Settlement outcome, present only once the market has resolved
    #[serde(default)]
    pub settled: Option<Contract>,
}

/// Feature keys that encode outcomes unknowable at snapshot time.
///
/// Stripped by [`MarketSnapshot::point_in_time`] before snapshots reach
/// signal generation in a backtest.
const FUTURE_FIELD_PREFIXES: &[&str] = &["settlement", "final_", "future_", "outcome"];

impl MarketSnapshot {
    /// Bid-ask spread
    pub fn spread(&self) -> Decimal {
        self.best_ask - self.best_bid
    }

    /// Midpoint of best bid and ask
    pub fn mid_price(&self) -> Decimal {
        (self.best_bid + self.best_ask) / Decimal::TWO
    }

    /// Implied ask price for a given contract side.
    ///
    /// Buying No at the implied price is equivalent to selling Yes into the bid.
    pub fn ask_for(&self, contract: Contract) -> Decimal {
        match contract {
            Contract::Yes => self.best_ask,
            Contract::No => Decimal::ONE - self.best_bid,
        }
    }

    /// Resting depth available to a buyer of the given side
    pub fn depth_for(&self, contract: Contract) -> Decimal {
        match contract {
            Contract::Yes => self.ask_depth,
            Contract::No => self.bid_depth,
        }
    }

    /// Depth imbalance in [-1, 1]; positive means bid-heavy
    pub fn depth_imbalance(&self) -> Decimal {
        let total = self.bid_depth + self.ask_depth;
        if total == Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.bid_depth - self.ask_depth) / total
    }

    /// Named feature value with a fallback default
    pub fn feature_or(&self, name: &str, default: Decimal) -> Decimal {
        self.features.get(name).copied().unwrap_or(default)
    }

    /// Copy of this snapshot with every field that encodes a
    /// not-yet-knowable outcome removed.
    ///
    /// Clears the settlement outcome and strips feature keys matching
    /// known future-outcome names. The backtest engine applies this before
    /// snapshots reach signal generators.
    pub fn point_in_time(&self) -> MarketSnapshot {
        let mut sanitized = self.clone();
        sanitized.settled = None;
        sanitized.features.retain(|name, _| {
            !FUTURE_FIELD_PREFIXES
                .iter()
                .any(|prefix| name.starts_with(prefix))
        });
        sanitized
    }
}

/// Boundary to the ingestion layer.
///
/// Implementations deliver finite, already-fetched batches; an empty batch
/// signals exhaustion. Failures upstream surface as empty batches or errors
/// the caller maps to "no signal", never into the decision path.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the next batch of snapshots, empty when exhausted
    async fn next_batch(&mut self) -> anyhow::Result<Vec<MarketSnapshot>>;
}

/// In-memory snapshot source for tests and CLI runs over captured data
pub struct StaticSource {
    batches: VecDeque<Vec<MarketSnapshot>>,
}

impl StaticSource {
    /// Create a source yielding one batch
    pub fn single_batch(snapshots: Vec<MarketSnapshot>) -> Self {
        Self {
            batches: VecDeque::from(vec![snapshots]),
        }
    }

    /// Create a source yielding the given batches in order
    pub fn new(batches: Vec<Vec<MarketSnapshot>>) -> Self {
        Self {
            batches: batches.into(),
        }
    }
}

#[async_trait]
impl SnapshotSource for StaticSource {
    async fn next_batch(&mut self) -> anyhow::Result<Vec<MarketSnapshot>> {
        Ok(self.batches.pop_front().unwrap_or_default())
    }
}

/// Load snapshots from a JSON-lines file, one snapshot per line.
///
/// Blank lines are skipped. Used by the CLI to replay captured sessions.
pub fn load_snapshots(path: impl AsRef<Path>) -> anyhow::Result<Vec<MarketSnapshot>> {
    let file = std::fs::File::open(path.as_ref())?;
    let reader = std::io::BufReader::new(file);
    let mut snapshots = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        snapshots.push(serde_json::from_str(&line)?);
    }
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub(crate) fn make_snapshot(market_id: &str) -> MarketSnapshot {
        MarketSnapshot {
            market_id: market_id.to_string(),
            event_id: "EVT-1".to_string(),
            league: "NFL".to_string(),
            matchup: "KC @ BUF".to_string(),
            title: "Chiefs win".to_string(),
            timestamp: Utc::now(),
            best_bid: dec!(0.45),
            best_ask: dec!(0.48),
            bid_depth: dec!(800),
            ask_depth: dec!(1200),
            volume_1h: dec!(350),
            volume_24h: dec!(4200),
            time_to_kickoff: Some(3600),
            time_to_resolution: Some(14400),
            features: BTreeMap::new(),
            recent_trades: vec![],
            settled: None,
        }
    }

    #[test]
    fn test_spread_and_mid() {
        let snapshot = make_snapshot("MKT-1");
        assert_eq!(snapshot.spread(), dec!(0.03));
        assert_eq!(snapshot.mid_price(), dec!(0.465));
    }

    #[test]
    fn test_ask_for_no_side_is_implied() {
        let snapshot = make_snapshot("MKT-1");
        assert_eq!(snapshot.ask_for(Contract::Yes), dec!(0.48));
        assert_eq!(snapshot.ask_for(Contract::No), dec!(0.55));
    }

    #[test]
    fn test_depth_imbalance() {
        let snapshot = make_snapshot("MKT-1");
        // (800 - 1200) / 2000 = -0.2
        assert_eq!(snapshot.depth_imbalance(), dec!(-0.2));
    }

    #[test]
    fn test_depth_imbalance_zero_depth() {
        let mut snapshot = make_snapshot("MKT-1");
        snapshot.bid_depth = dec!(0);
        snapshot.ask_depth = dec!(0);
        assert_eq!(snapshot.depth_imbalance(), dec!(0));
    }

    #[test]
    fn test_point_in_time_strips_future_fields() {
        let mut snapshot = make_snapshot("MKT-1");
        snapshot.settled = Some(Contract::Yes);
        snapshot
            .features
            .insert("settlement_result".to_string(), dec!(1));
        snapshot.features.insert("final_price".to_string(), dec!(1));
        snapshot
            .features
            .insert("future_price_1h".to_string(), dec!(0.9));
        snapshot
            .features
            .insert("depth_imbalance".to_string(), dec!(0.2));

        let sanitized = snapshot.point_in_time();
        assert!(sanitized.settled.is_none());
        assert!(!sanitized.features.contains_key("settlement_result"));
        assert!(!sanitized.features.contains_key("final_price"));
        assert!(!sanitized.features.contains_key("future_price_1h"));
        assert!(sanitized.features.contains_key("depth_imbalance"));
        // Original is untouched
        assert!(snapshot.settled.is_some());
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let snapshot = make_snapshot("MKT-1");
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: MarketSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.market_id, "MKT-1");
        assert_eq!(parsed.best_ask, dec!(0.48));
    }

    #[test]
    fn test_load_snapshots_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.jsonl");
        let lines = [
            serde_json::to_string(&make_snapshot("MKT-1")).unwrap(),
            String::new(),
            serde_json::to_string(&make_snapshot("MKT-2")).unwrap(),
        ];
        std::fs::write(&path, lines.join("\n")).unwrap();

        let snapshots = load_snapshots(&path).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].market_id, "MKT-2");
    }

    #[tokio::test]
    async fn test_static_source_drains() {
        let mut source = StaticSource::single_batch(vec![make_snapshot("MKT-1")]);
        let first = source.next_batch().await.unwrap();
        assert_eq!(first.len(), 1);
        let second = source.next_batch().await.unwrap();
        assert!(second.is_empty());
    }
}
