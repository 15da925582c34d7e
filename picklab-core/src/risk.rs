//! Risk gate and position sizing.
//!
//! Checks run in a fixed order and the first failure wins: the daily-loss
//! kill-switch, then the concurrent position limit, then no-trade
//! conditions on the symbol itself.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{SignalSnapshot, TradePlan};

/// Account-level limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Trading capital in account currency.
    pub budget: f64,
    /// Fraction of budget risked on a single trade (0.02 = 2%).
    pub max_risk_per_trade: f64,
    /// Fraction of budget that may be lost in a day before trading stops.
    pub max_daily_loss: f64,
    pub max_positions: usize,
    /// No new trades above this volatility percentile.
    pub max_volatility_percentile: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            budget: 500.0,
            max_risk_per_trade: 0.02,
            max_daily_loss: 0.05,
            max_positions: 5,
            max_volatility_percentile: 95.0,
        }
    }
}

impl RiskLimits {
    pub fn validate(&self) -> Result<(), String> {
        if !self.budget.is_finite() || self.budget <= 0.0 {
            return Err(format!("budget must be positive, got {}", self.budget));
        }
        for (name, v) in [
            ("max_risk_per_trade", self.max_risk_per_trade),
            ("max_daily_loss", self.max_daily_loss),
        ] {
            if !(v > 0.0 && v < 1.0) {
                return Err(format!("{name} must be in (0, 1), got {v}"));
            }
        }
        if !(0.0..=100.0).contains(&self.max_volatility_percentile) {
            return Err("max_volatility_percentile must be within [0, 100]".into());
        }
        Ok(())
    }

    /// Loss amount that trips the kill-switch.
    pub fn daily_loss_threshold(&self) -> f64 {
        self.budget * self.max_daily_loss
    }
}

/// What the account looks like right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureState {
    pub open_positions: usize,
    /// Realized loss today as a positive amount.
    pub realized_loss_today: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum RiskVerdict {
    Allowed,
    KillSwitch { loss: f64, threshold: f64 },
    PositionLimit { open: usize, max: usize },
    NoTrade { reason: String },
}

impl RiskVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RiskVerdict::Allowed)
    }

    /// Kill-switch and position limit block every symbol, not just this one.
    pub fn is_account_wide(&self) -> bool {
        matches!(
            self,
            RiskVerdict::KillSwitch { .. } | RiskVerdict::PositionLimit { .. }
        )
    }
}

impl fmt::Display for RiskVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskVerdict::Allowed => f.write_str("all risk checks passed"),
            RiskVerdict::KillSwitch { loss, threshold } => {
                write!(f, "kill-switch: daily loss {loss:.2} >= {threshold:.2}")
            }
            RiskVerdict::PositionLimit { open, max } => {
                write!(f, "position limit: {open} open >= {max}")
            }
            RiskVerdict::NoTrade { reason } => write!(f, "no-trade condition: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiskGate {
    limits: RiskLimits,
}

impl RiskGate {
    pub fn new(limits: RiskLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    pub fn check(&self, exposure: &ExposureState, snapshot: &SignalSnapshot) -> RiskVerdict {
        let account = self.check_account(exposure);
        if !account.is_allowed() {
            return account;
        }
        match snapshot.volatility.percentile {
            Some(p) if p > self.limits.max_volatility_percentile => RiskVerdict::NoTrade {
                reason: format!(
                    "volatility percentile {p:.1} > {:.1}",
                    self.limits.max_volatility_percentile
                ),
            },
            _ => RiskVerdict::Allowed,
        }
    }

    /// The account-wide half of [`RiskGate::check`].
    pub fn check_account(&self, exposure: &ExposureState) -> RiskVerdict {
        let threshold = self.limits.daily_loss_threshold();
        if exposure.realized_loss_today >= threshold {
            return RiskVerdict::KillSwitch {
                loss: exposure.realized_loss_today,
                threshold,
            };
        }
        if exposure.open_positions >= self.limits.max_positions {
            return RiskVerdict::PositionLimit {
                open: exposure.open_positions,
                max: self.limits.max_positions,
            };
        }
        RiskVerdict::Allowed
    }

    /// Shares to buy so that a stop-out loses the per-trade risk budget.
    ///
    /// ```text
    /// risk_amount = budget * max_risk_per_trade
    /// shares      = risk_amount / (entry - stop)
    /// ```
    ///
    /// Fractional; rounding is left to whoever places the order.
    pub fn position_size(&self, plan: &TradePlan) -> f64 {
        let risk_amount = self.limits.budget * self.limits.max_risk_per_trade;
        risk_amount / plan.risk_per_share()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Horizon, RiskLabel, StrategyKind};
    use crate::scoring::test_snapshot;

    fn volatile(percentile: f64) -> SignalSnapshot {
        let mut s = test_snapshot(StrategyKind::MomentumSwing);
        s.volatility.percentile = Some(percentile);
        s
    }

    #[test]
    fn quiet_account_is_allowed() {
        let gate = RiskGate::default();
        let verdict = gate.check(&ExposureState::default(), &volatile(50.0));
        assert!(verdict.is_allowed());
    }

    #[test]
    fn kill_switch_wins_over_everything() {
        let gate = RiskGate::default();
        let exposure = ExposureState {
            open_positions: 9,
            realized_loss_today: 25.0,
        };
        let verdict = gate.check(&exposure, &volatile(99.0));
        assert_eq!(
            verdict,
            RiskVerdict::KillSwitch {
                loss: 25.0,
                threshold: 25.0
            }
        );
        assert!(verdict.is_account_wide());
    }

    #[test]
    fn position_limit() {
        let gate = RiskGate::default();
        let exposure = ExposureState {
            open_positions: 5,
            realized_loss_today: 10.0,
        };
        let verdict = gate.check(&exposure, &volatile(50.0));
        assert_eq!(verdict, RiskVerdict::PositionLimit { open: 5, max: 5 });
        assert!(verdict.to_string().starts_with("position limit"));
    }

    #[test]
    fn volatility_spike_blocks_only_the_symbol() {
        let gate = RiskGate::default();
        let verdict = gate.check(&ExposureState::default(), &volatile(97.0));
        assert!(matches!(verdict, RiskVerdict::NoTrade { .. }));
        assert!(!verdict.is_account_wide());
        assert!(gate.check(&ExposureState::default(), &volatile(95.0)).is_allowed());
    }

    #[test]
    fn sizes_from_risk_budget() {
        let gate = RiskGate::default();
        let plan = TradePlan::new(50.0, 48.0, vec![56.0], Horizon::Bars(10), RiskLabel::Low).unwrap();
        // 500 * 2% = 10 at risk, 2 per share.
        assert!((gate.position_size(&plan) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn limits_validate() {
        assert!(RiskLimits::default().validate().is_ok());
        let bad = RiskLimits {
            max_risk_per_trade: 1.5,
            ..RiskLimits::default()
        };
        assert!(bad.validate().is_err());
    }
}
