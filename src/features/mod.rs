//! Feature computation registry
//!
//! Features are registered once at startup into an explicit registry object
//! passed by reference to consumers. There is no process-wide registration
//! state; construction is the registration.

mod order_flow;

pub use order_flow::{trade_flow_imbalance, TieredFeature};

use crate::market::MarketSnapshot;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

/// Computes one feature from a snapshot; `None` means unavailable
pub type FeatureFn = Box<dyn Fn(&MarketSnapshot) -> Option<Decimal> + Send + Sync>;

/// Descriptive metadata attached at registration
#[derive(Debug, Clone)]
pub struct FeatureMeta {
    /// Feature name, unique within a registry
    pub name: String,
    /// One-line description for reporting
    pub description: String,
}

struct FeatureEntry {
    meta: FeatureMeta,
    compute: FeatureFn,
}

/// Register-once, compute-many feature registry
#[derive(Default)]
pub struct FeatureRegistry {
    entries: Vec<FeatureEntry>,
}

impl FeatureRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feature computation under a name
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        compute: FeatureFn,
    ) {
        self.entries.push(FeatureEntry {
            meta: FeatureMeta {
                name: name.into(),
                description: description.into(),
            },
            compute,
        });
    }

    /// Compute every registered feature against a snapshot.
    ///
    /// Unavailable features are skipped, not errors: missing data routes to
    /// "no signal" downstream.
    pub fn compute_all(&self, snapshot: &MarketSnapshot) -> BTreeMap<String, Decimal> {
        let mut values = BTreeMap::new();
        for entry in &self.entries {
            match (entry.compute)(snapshot) {
                Some(value) => {
                    values.insert(entry.meta.name.clone(), value);
                }
                None => {
                    tracing::debug!(feature = %entry.meta.name, market_id = %snapshot.market_id,
                        "feature unavailable, skipping");
                }
            }
        }
        values
    }

    /// Registered feature metadata, in registration order
    pub fn metadata(&self) -> Vec<&FeatureMeta> {
        self.entries.iter().map(|e| &e.meta).collect()
    }

    /// Number of registered features
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the standard registry used by the CLI and backtests.
///
/// Snapshot-attached features (from the external feature layer) are merged
/// over these by the pipeline, so externally supplied values win.
pub fn default_registry() -> FeatureRegistry {
    let mut registry = FeatureRegistry::new();

    registry.register(
        "spread",
        "Bid-ask spread",
        Box::new(|s| Some(s.spread())),
    );
    registry.register(
        "mid_price",
        "Midpoint of best bid and ask",
        Box::new(|s| Some(s.mid_price())),
    );
    registry.register(
        "depth_imbalance",
        "Bid vs ask depth imbalance in [-1, 1]",
        Box::new(|s| Some(s.depth_imbalance())),
    );
    registry.register(
        "liquidity_score",
        "Depth-based liquidity score in [0, 1], discounted for wide spreads",
        Box::new(|s| Some(liquidity_score(s))),
    );

    let trade_flow = trade_flow_imbalance();
    registry.register(
        trade_flow.name().to_string(),
        "Signed taker flow, falling back to depth imbalance",
        Box::new(move |s| trade_flow.compute(s)),
    );

    registry
}

/// Depth-based liquidity score in [0, 1].
///
/// Saturates at 2000 resting contracts and is discounted linearly for
/// spreads up to 10 cents.
fn liquidity_score(snapshot: &MarketSnapshot) -> Decimal {
    let total_depth = snapshot.bid_depth + snapshot.ask_depth;
    let depth_score = (total_depth / dec!(2000)).min(Decimal::ONE);
    let spread_discount =
        (Decimal::ONE - snapshot.spread() / dec!(0.10)).clamp(Decimal::ZERO, Decimal::ONE);
    depth_score * spread_discount
}
