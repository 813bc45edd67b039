//! Technical indicators module
//!
//! Derives display series from candle data using the `ta` crate. Every
//! calculator is a pure function of its input: a fresh indicator instance
//! is built per call, so no running state leaks between datasets.

pub mod macd;
pub mod rsi;
pub mod sma;

pub use macd::*;
pub use rsi::*;
pub use sma::*;

use serde::Serialize;

use crate::data::Candle;

/// Indicator trait for all indicators
pub trait Indicator {
    /// Get the name of the indicator
    fn name(&self) -> &str;

    /// Update indicator with new value
    fn update(&mut self, value: f64);

    /// Get current indicator value
    fn value(&self) -> Option<f64>;

    /// Check if indicator is ready (has enough data)
    fn is_ready(&self) -> bool;
}

/// One indicator value aligned to a candle's period.
///
/// `value` stays `None` while the lookback window has not filled, so the
/// chart can skip those periods instead of plotting zeros.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorPoint {
    pub time: String,
    pub value: Option<f64>,
}

/// Runs `indicator` over the candle closes, producing one point per candle.
pub fn points_over_closes<I: Indicator>(
    mut indicator: I,
    candles: &[Candle],
) -> Vec<IndicatorPoint> {
    candles
        .iter()
        .map(|candle| {
            indicator.update(candle.close);
            IndicatorPoint {
                time: candle.time.clone(),
                value: indicator.value(),
            }
        })
        .collect()
}
