//! Portfolio exposure and correlation control
//!
//! Tracks positions accumulated over a session and keeps new
//! recommendations inside total, per-market, per-event, and per-league
//! caps. Not safe for concurrent mutation; callers serialize updates.

use crate::config::PortfolioConfig;
use crate::signal::Contract;
use crate::strategy::ranker::{Recommendation, RiskFlag};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Smallest position worth carrying, in contracts
const MIN_VIABLE_SIZE: u32 = 10;

/// A held position tracked for exposure purposes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioPosition {
    pub market_id: String,
    pub event_id: String,
    pub league: String,
    pub direction: Contract,
    pub size: u32,
    pub entry_price: Decimal,
}

impl PortfolioPosition {
    /// Dollar exposure: size x entry price
    pub fn exposure(&self) -> Decimal {
        Decimal::from(self.size) * self.entry_price
    }
}

/// Manages exposure caps and correlation adjustments
pub struct PortfolioManager {
    limits: PortfolioConfig,
    positions: Vec<PortfolioPosition>,
}

impl PortfolioManager {
    /// Create a manager with the given caps
    pub fn new(limits: PortfolioConfig) -> Self {
        Self {
            limits,
            positions: Vec::new(),
        }
    }

    /// Record a filled position
    pub fn add_position(&mut self, position: PortfolioPosition) {
        self.positions.push(position);
    }

    /// Clear all positions between runs
    pub fn clear(&mut self) {
        self.positions.clear();
    }

    /// Release every position on a market, freeing its exposure.
    ///
    /// Called on settlement: a resolved market no longer puts capital at
    /// risk.
    pub fn release_market(&mut self, market_id: &str) {
        self.positions.retain(|p| p.market_id != market_id);
    }

    /// Currently held positions
    pub fn positions(&self) -> &[PortfolioPosition] {
        &self.positions
    }

    /// Total dollar exposure across the book
    pub fn total_exposure(&self) -> Decimal {
        self.positions.iter().map(|p| p.exposure()).sum()
    }

    /// Exposure grouped by event
    pub fn exposure_by_event(&self) -> BTreeMap<String, Decimal> {
        let mut by_event = BTreeMap::new();
        for p in &self.positions {
            *by_event.entry(p.event_id.clone()).or_insert(Decimal::ZERO) += p.exposure();
        }
        by_event
    }

    /// Exposure grouped by league
    pub fn exposure_by_league(&self) -> BTreeMap<String, Decimal> {
        let mut by_league = BTreeMap::new();
        for p in &self.positions {
            *by_league.entry(p.league.clone()).or_insert(Decimal::ZERO) += p.exposure();
        }
        by_league
    }

    fn market_exposure(&self, market_id: &str) -> Decimal {
        self.positions
            .iter()
            .filter(|p| p.market_id == market_id)
            .map(|p| p.exposure())
            .sum()
    }

    fn event_exposure(&self, event_id: &str) -> Decimal {
        self.positions
            .iter()
            .filter(|p| p.event_id == event_id)
            .map(|p| p.exposure())
            .sum()
    }

    fn league_exposure(&self, league: &str) -> Decimal {
        self.positions
            .iter()
            .filter(|p| p.league == league)
            .map(|p| p.exposure())
            .sum()
    }

    /// Check whether a recommendation fits inside every cap.
    ///
    /// Returns whether it is allowed plus descriptions of any violations.
    pub fn check_limits(&self, rec: &Recommendation) -> (bool, Vec<String>) {
        let mut violations = Vec::new();
        let proposed = rec.entry_price * Decimal::from(rec.max_size);

        let total = self.total_exposure();
        if total + proposed > self.limits.max_total_exposure {
            violations.push(format!(
                "total_exposure: {:.0} > {}",
                total + proposed,
                self.limits.max_total_exposure
            ));
        }
        if self.market_exposure(&rec.market_id) + proposed > self.limits.max_per_market {
            violations.push(format!(
                "market_exposure: exceeds {}",
                self.limits.max_per_market
            ));
        }
        if self.event_exposure(&rec.event_id) + proposed > self.limits.max_per_event {
            violations.push(format!(
                "event_exposure: exceeds {}",
                self.limits.max_per_event
            ));
        }
        if self.league_exposure(&rec.league) + proposed > self.limits.max_per_league {
            violations.push(format!(
                "league_exposure: exceeds {}",
                self.limits.max_per_league
            ));
        }

        (violations.is_empty(), violations)
    }

    /// Adjust recommendations for correlation with held positions and fit
    /// them inside the caps.
    ///
    /// Same-event, same-direction exposure halves the proposed size; an
    /// opposite-direction position is flagged but not resized, since it may
    /// be an intended hedge. Recommendations that cannot fit at least the
    /// minimum viable size are dropped.
    pub fn adjust_for_correlation(
        &self,
        recommendations: Vec<Recommendation>,
    ) -> Vec<Recommendation> {
        let mut adjusted = Vec::new();

        for mut rec in recommendations {
            let event_positions: Vec<&PortfolioPosition> = self
                .positions
                .iter()
                .filter(|p| p.event_id == rec.event_id)
                .collect();

            if !event_positions.is_empty() {
                let same_direction = event_positions
                    .iter()
                    .any(|p| p.direction == rec.contract);
                if same_direction {
                    rec.max_size /= 2;
                    rec.risk_flags.push(RiskFlag::CorrelatedPosition);
                } else {
                    rec.risk_flags.push(RiskFlag::OppositePositionExists);
                }
            }

            let (allowed, violations) = self.check_limits(&rec);
            if !allowed {
                for violation in violations {
                    rec.risk_flags.push(RiskFlag::LimitViolation(violation));
                }
                rec.max_size = self.size_to_fit(&rec);
            }

            if rec.max_size >= MIN_VIABLE_SIZE {
                adjusted.push(rec);
            } else {
                tracing::debug!(market_id = %rec.market_id, size = rec.max_size,
                    "dropping recommendation below minimum viable size");
            }
        }

        adjusted
    }

    /// Largest size that simultaneously fits all four caps
    fn size_to_fit(&self, rec: &Recommendation) -> u32 {
        let available = [
            self.limits.max_total_exposure - self.total_exposure(),
            self.limits.max_per_market - self.market_exposure(&rec.market_id),
            self.limits.max_per_event - self.event_exposure(&rec.event_id),
            self.limits.max_per_league - self.league_exposure(&rec.league),
        ]
        .into_iter()
        .min()
        .unwrap_or(Decimal::ZERO);

        if available <= Decimal::ZERO || rec.entry_price <= Decimal::ZERO {
            return 0;
        }
        (available / rec.entry_price).to_u32().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_position(market_id: &str, event_id: &str, direction: Contract, size: u32) -> PortfolioPosition {
        PortfolioPosition {
            market_id: market_id.to_string(),
            event_id: event_id.to_string(),
            league: "NFL".to_string(),
            direction,
            size,
            entry_price: dec!(0.50),
        }
    }

    fn make_rec(market_id: &str, event_id: &str, size: u32) -> Recommendation {
        Recommendation {
            market_id: market_id.to_string(),
            event_id: event_id.to_string(),
            contract: Contract::Yes,
            entry_price: dec!(0.50),
            max_size: size,
            expected_value: dec!(0.05),
            confidence: dec!(0.7),
            rank_score: dec!(0.6),
            contributing_signals: vec!["a".to_string()],
            risk_flags: vec![],
            time_to_resolution: Some(14400),
            league: "NFL".to_string(),
            matchup: String::new(),
            market_title: String::new(),
        }
    }

    #[test]
    fn test_exposure_accumulates() {
        let mut pm = PortfolioManager::new(PortfolioConfig::default());
        pm.add_position(make_position("MKT-1", "EVT-1", Contract::Yes, 100));
        pm.add_position(make_position("MKT-2", "EVT-2", Contract::No, 200));
        assert_eq!(pm.total_exposure(), dec!(150));
        assert_eq!(pm.exposure_by_event()["EVT-1"], dec!(50));
        assert_eq!(pm.exposure_by_league()["NFL"], dec!(150));
        pm.clear();
        assert_eq!(pm.total_exposure(), dec!(0));
    }

    #[test]
    fn test_release_market_frees_exposure() {
        let mut pm = PortfolioManager::new(PortfolioConfig::default());
        pm.add_position(make_position("MKT-1", "EVT-1", Contract::Yes, 100));
        pm.add_position(make_position("MKT-2", "EVT-2", Contract::Yes, 100));
        pm.release_market("MKT-1");
        assert_eq!(pm.total_exposure(), dec!(50));
        assert_eq!(pm.positions().len(), 1);
    }

    #[test]
    fn test_within_limits_allowed() {
        let pm = PortfolioManager::new(PortfolioConfig::default());
        let (allowed, violations) = pm.check_limits(&make_rec("MKT-1", "EVT-1", 100));
        assert!(allowed);
        assert!(violations.is_empty());
    }

    #[test]
    fn test_market_cap_violation() {
        let mut pm = PortfolioManager::new(PortfolioConfig::default());
        // 900 contracts at 0.50 = $450 held on this market
        pm.add_position(make_position("MKT-1", "EVT-1", Contract::Yes, 900));
        // $100 more would breach the $500 per-market cap
        let (allowed, violations) = pm.check_limits(&make_rec("MKT-1", "EVT-1", 200));
        assert!(!allowed);
        assert!(violations.iter().any(|v| v.starts_with("market_exposure")));
    }

    #[test]
    fn test_total_cap_violation() {
        let mut pm = PortfolioManager::new(PortfolioConfig {
            max_total_exposure: dec!(100),
            ..PortfolioConfig::default()
        });
        pm.add_position(make_position("MKT-1", "EVT-1", Contract::Yes, 150));
        let (allowed, violations) = pm.check_limits(&make_rec("MKT-2", "EVT-2", 100));
        assert!(!allowed);
        assert!(violations.iter().any(|v| v.starts_with("total_exposure")));
    }

    #[test]
    fn test_same_direction_same_event_halves_size() {
        let mut pm = PortfolioManager::new(PortfolioConfig::default());
        pm.add_position(make_position("MKT-1", "EVT-1", Contract::Yes, 100));
        // Different market, same event and direction
        let adjusted = pm.adjust_for_correlation(vec![make_rec("MKT-2", "EVT-1", 100)]);
        assert_eq!(adjusted.len(), 1);
        assert_eq!(adjusted[0].max_size, 50);
        assert!(adjusted[0].risk_flags.contains(&RiskFlag::CorrelatedPosition));
    }

    #[test]
    fn test_opposite_direction_flagged_not_resized() {
        let mut pm = PortfolioManager::new(PortfolioConfig::default());
        pm.add_position(make_position("MKT-1", "EVT-1", Contract::No, 100));
        let adjusted = pm.adjust_for_correlation(vec![make_rec("MKT-2", "EVT-1", 100)]);
        assert_eq!(adjusted.len(), 1);
        assert_eq!(adjusted[0].max_size, 100);
        assert!(adjusted[0]
            .risk_flags
            .contains(&RiskFlag::OppositePositionExists));
    }

    #[test]
    fn test_violating_size_is_refit() {
        let mut pm = PortfolioManager::new(PortfolioConfig::default());
        // $400 held on the market leaves $100 of market headroom
        pm.add_position(make_position("MKT-1", "EVT-2", Contract::No, 800));
        let adjusted = pm.adjust_for_correlation(vec![make_rec("MKT-1", "EVT-1", 1200)]);
        assert_eq!(adjusted.len(), 1);
        // $100 headroom at 0.50 = 200 contracts
        assert_eq!(adjusted[0].max_size, 200);
        assert!(adjusted[0]
            .risk_flags
            .iter()
            .any(|f| matches!(f, RiskFlag::LimitViolation(_))));
    }

    #[test]
    fn test_unfittable_recommendation_dropped() {
        let mut pm = PortfolioManager::new(PortfolioConfig {
            max_per_market: dec!(2),
            ..PortfolioConfig::default()
        });
        pm.add_position(make_position("MKT-1", "EVT-2", Contract::No, 2));
        // Headroom of $1 at 0.50 fits only 2 contracts, below minimum viable
        let adjusted = pm.adjust_for_correlation(vec![make_rec("MKT-1", "EVT-1", 500)]);
        assert!(adjusted.is_empty());
    }
}
