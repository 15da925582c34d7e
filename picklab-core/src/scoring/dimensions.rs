//! The seven dimension scorers.
//!
//! Each scorer is a pure function of the snapshot returning a score in
//! [0,100]. None of them fail: missing or non-finite inputs contribute
//! nothing, and a scorer with no usable input returns [`NEUTRAL`].
//!
//! # Risk direction
//! The risk dimension is a *safety* score: **higher means less danger**.
//! A risk score of 90 is a well-defined, well-protected setup; 10 is a
//! dangerous one. It is combined into conviction without inversion.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{
    LiquidityInputs, MomentumInputs, SentimentReading, SignalSnapshot, TrendInputs,
    VolatilityInputs, VolumeInputs,
};

pub const NEUTRAL: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Trend,
    Momentum,
    Volume,
    Volatility,
    Sentiment,
    Liquidity,
    Risk,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Trend,
        Dimension::Momentum,
        Dimension::Volume,
        Dimension::Volatility,
        Dimension::Sentiment,
        Dimension::Liquidity,
        Dimension::Risk,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Trend => "trend",
            Dimension::Momentum => "momentum",
            Dimension::Volume => "volume",
            Dimension::Volatility => "volatility",
            Dimension::Sentiment => "sentiment",
            Dimension::Liquidity => "liquidity",
            Dimension::Risk => "risk",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One score per dimension, each in [0,100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub trend: f64,
    pub momentum: f64,
    pub volume: f64,
    pub volatility: f64,
    pub sentiment: f64,
    pub liquidity: f64,
    /// Higher = safer.
    pub risk: f64,
}

impl DimensionScores {
    /// Every dimension at the same value.
    pub fn uniform(score: f64) -> Self {
        let s = clamp_score(score);
        Self {
            trend: s,
            momentum: s,
            volume: s,
            volatility: s,
            sentiment: s,
            liquidity: s,
            risk: s,
        }
    }

    pub fn get(&self, dim: Dimension) -> f64 {
        match dim {
            Dimension::Trend => self.trend,
            Dimension::Momentum => self.momentum,
            Dimension::Volume => self.volume,
            Dimension::Volatility => self.volatility,
            Dimension::Sentiment => self.sentiment,
            Dimension::Liquidity => self.liquidity,
            Dimension::Risk => self.risk,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        Dimension::ALL.iter().map(move |&d| (d, self.get(d)))
    }
}

impl Default for DimensionScores {
    fn default() -> Self {
        Self::uniform(NEUTRAL)
    }
}

/// Score all seven dimensions.
pub fn score_dimensions(snapshot: &SignalSnapshot) -> DimensionScores {
    DimensionScores {
        trend: trend_score(&snapshot.trend, snapshot.price),
        momentum: momentum_score(&snapshot.momentum),
        volume: volume_score(&snapshot.volume),
        volatility: volatility_score(&snapshot.volatility, snapshot.price),
        sentiment: sentiment_score(snapshot.sentiment.as_ref()),
        liquidity: liquidity_score(&snapshot.liquidity, snapshot.price),
        risk: risk_score(snapshot),
    }
}

/// Clamp to [0,100]; NaN collapses to neutral.
pub fn clamp_score(x: f64) -> f64 {
    if x.is_nan() {
        NEUTRAL
    } else {
        x.clamp(0.0, 100.0)
    }
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

fn positive(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite() && *x > 0.0)
}

// ── Trend ──

/// Efficiency ratio below which price action counts as choppy.
const CHOP_THRESHOLD: f64 = 0.3;
const MAX_CHOP_PENALTY: f64 = 15.0;

/// Rewards price above both averages and short above long. The distance
/// bonus saturates through `tanh`, so a price far above its average gains
/// at most 10 points no matter how stretched.
pub fn trend_score(inputs: &TrendInputs, price: f64) -> f64 {
    let (Some(short), Some(long)) = (positive(inputs.ma_short), positive(inputs.ma_long)) else {
        return NEUTRAL;
    };
    if !(price.is_finite() && price > 0.0) {
        return NEUTRAL;
    }

    let above_short = price > short;
    let above_long = price > long;
    let mut score = NEUTRAL;
    score += match (above_short, above_long) {
        (true, true) => 20.0,
        (true, false) => 10.0,
        (false, false) => -20.0,
        (false, true) => -10.0,
    };
    score += if short > long { 10.0 } else { -10.0 };

    let distance = (price - short).abs() / short;
    let bonus = 10.0 * (distance * 100.0).tanh();
    score += if above_short { bonus } else { -bonus };

    if let Some(er) = finite(inputs.efficiency_ratio) {
        let er = er.clamp(0.0, 1.0);
        if er < CHOP_THRESHOLD {
            score -= MAX_CHOP_PENALTY * (CHOP_THRESHOLD - er) / CHOP_THRESHOLD;
        }
    }

    clamp_score(score)
}

// ── Momentum ──

pub fn momentum_score(inputs: &MomentumInputs) -> f64 {
    let roc_short = finite(inputs.roc_short);
    let roc_long = finite(inputs.roc_long);
    let rsi = finite(inputs.rsi);
    let breakout = finite(inputs.breakout_pct);
    if roc_short.is_none() && roc_long.is_none() && rsi.is_none() && breakout.is_none() {
        return NEUTRAL;
    }

    let mut score = NEUTRAL;

    let rocs: Vec<f64> = [roc_short, roc_long].into_iter().flatten().collect();
    if !rocs.is_empty() {
        let magnitude = rocs.iter().map(|r| r.abs()).sum::<f64>() / rocs.len() as f64;
        let contribution = (magnitude * 2.0).min(30.0);
        let direction = roc_short.or(roc_long).unwrap_or(0.0);
        score += if direction > 0.0 { contribution } else { -contribution };
    }

    if let Some(rsi) = rsi {
        score += if rsi >= 70.0 {
            10.0
        } else if rsi > 50.0 {
            20.0
        } else if rsi < 30.0 {
            -20.0
        } else {
            0.0
        };
    }

    if let Some(b) = breakout {
        if b > 0.0 {
            score += (b * 10.0).min(30.0);
        }
    }

    clamp_score(score)
}

// ── Volume ──

pub fn volume_score(inputs: &VolumeInputs) -> f64 {
    let ratio = inputs.ratio().filter(|r| r.is_finite());
    let trend = match (positive(inputs.recent_average), positive(inputs.prior_average)) {
        (Some(recent), Some(prior)) => Some(recent / prior),
        _ => None,
    };
    if ratio.is_none() && trend.is_none() && !inputs.surge {
        return NEUTRAL;
    }

    let mut score = NEUTRAL;
    match ratio {
        _ if inputs.surge => score += 25.0,
        Some(r) if r > 1.5 => score += 25.0,
        Some(r) if r > 1.2 => score += 15.0,
        Some(r) if r > 1.0 => score += 5.0,
        Some(r) if r < 0.8 => score -= 15.0,
        _ => {}
    }
    match trend {
        Some(t) if t > 1.1 => score += 10.0,
        Some(t) if t < 0.9 => score -= 10.0,
        _ => {}
    }

    clamp_score(score)
}

// ── Volatility ──

/// Non-monotonic in the volatility percentile: the 60th–80th band scores
/// best, while both quiet (<30) and extreme (>90) readings score below it.
pub fn volatility_score(inputs: &VolatilityInputs, price: f64) -> f64 {
    let percentile = finite(inputs.percentile);
    let atr_pct = match positive(inputs.atr) {
        Some(atr) if price.is_finite() && price > 0.0 => Some(atr / price * 100.0),
        _ => None,
    };
    if percentile.is_none() && atr_pct.is_none() {
        return NEUTRAL;
    }

    let mut score = NEUTRAL;
    if let Some(p) = percentile {
        score += if (60.0..=80.0).contains(&p) {
            25.0
        } else if (50.0..60.0).contains(&p) {
            15.0
        } else if p > 80.0 && p <= 90.0 {
            10.0
        } else if p > 90.0 {
            -10.0
        } else if p < 30.0 {
            -15.0
        } else {
            0.0
        };
    }
    if let Some(a) = atr_pct {
        score += if (1.0..=3.0).contains(&a) {
            10.0
        } else if a > 5.0 {
            -15.0
        } else if a < 0.5 {
            -10.0
        } else {
            0.0
        };
    }

    clamp_score(score)
}

// ── Sentiment ──

/// `50 + 50·polarity`, shrunk toward neutral by `1 - confidence`.
pub fn sentiment_score(reading: Option<&SentimentReading>) -> f64 {
    let Some(r) = reading else {
        return NEUTRAL;
    };
    if !(r.polarity.is_finite() && r.confidence.is_finite()) {
        return NEUTRAL;
    }
    let polarity = r.polarity.clamp(-1.0, 1.0);
    let confidence = r.confidence.clamp(0.0, 1.0);
    let raw = NEUTRAL + polarity * 50.0;
    clamp_score(raw * confidence + NEUTRAL * (1.0 - confidence))
}

// ── Liquidity ──

/// Multiple of the minimum average volume at which thin-volume penalties end.
const LIQUIDITY_FULL_MULTIPLE: f64 = 5.0;

/// Convex penalty `100·(1 - r/5)²` on the volume multiple `r`, so each step
/// down in volume costs more than the last, plus a traded-value bonus.
pub fn liquidity_score(inputs: &LiquidityInputs, price: f64) -> f64 {
    let Some(avg_volume) = finite(inputs.avg_volume).filter(|v| *v >= 0.0) else {
        return NEUTRAL;
    };

    let ratio = if inputs.min_avg_volume > 0.0 {
        avg_volume / inputs.min_avg_volume
    } else {
        LIQUIDITY_FULL_MULTIPLE
    };
    let shortfall = (1.0 - ratio / LIQUIDITY_FULL_MULTIPLE).max(0.0);
    let mut score = 100.0 - 100.0 * shortfall * shortfall;

    if price.is_finite() && price > 0.0 {
        let traded_value = avg_volume * price;
        if traded_value >= 10_000_000.0 {
            score += 10.0;
        } else if traded_value >= 5_000_000.0 {
            score += 5.0;
        }
    }

    clamp_score(score)
}

// ── Risk ──

/// Safety score: `100 - danger`. Danger starts at 50 and moves with
/// reward:risk, stop tightness (in percent and in ATRs), volatility
/// percentile, drawdown from the recent high and thin liquidity.
pub fn risk_score(snapshot: &SignalSnapshot) -> f64 {
    let setup = &snapshot.setup;
    let entry = setup.entry;
    let risk_amount = entry - setup.stop;
    let reward_amount = setup.targets.first().map(|t| t - entry).unwrap_or(0.0);

    let mut danger = NEUTRAL;

    if entry.is_finite() && entry > 0.0 && risk_amount.is_finite() && risk_amount > 0.0 {
        let rr = reward_amount / risk_amount;
        danger += if rr >= 3.0 {
            -20.0
        } else if rr >= 2.0 {
            -10.0
        } else if rr >= 1.5 {
            -5.0
        } else if rr < 1.0 {
            15.0
        } else {
            0.0
        };

        let stop_pct = risk_amount / entry * 100.0;
        danger += if stop_pct < 1.0 {
            20.0
        } else if stop_pct < 2.0 {
            10.0
        } else if stop_pct > 5.0 {
            -5.0
        } else {
            0.0
        };

        if let Some(atr) = positive(snapshot.volatility.atr) {
            let stop_atrs = risk_amount / atr;
            if stop_atrs < 0.75 {
                danger += 10.0; // inside normal bar noise
            } else if stop_atrs > 3.0 {
                danger += 5.0;
            }
        }
    } else {
        // No protective distance at all.
        danger += 30.0;
    }

    if let Some(p) = finite(snapshot.volatility.percentile) {
        danger += if p > 90.0 {
            15.0
        } else if p > 80.0 {
            10.0
        } else if p < 30.0 {
            -5.0
        } else {
            0.0
        };
    }

    if let Some(high) = positive(snapshot.risk.recent_high) {
        let drawdown_pct = (high - snapshot.price) / high * 100.0;
        if drawdown_pct > 10.0 {
            danger += 10.0;
        } else if drawdown_pct > 5.0 {
            danger += 5.0;
        }
    }

    if let Some(avg) = finite(snapshot.liquidity.avg_volume) {
        if snapshot.liquidity.min_avg_volume > 0.0 && avg < snapshot.liquidity.min_avg_volume {
            danger += 10.0;
        }
    }

    clamp_score(100.0 - clamp_score(danger))
}
