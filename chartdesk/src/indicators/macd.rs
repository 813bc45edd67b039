//! MACD (Moving Average Convergence Divergence) indicator

use crate::data::Candle;
use crate::indicators::{points_over_closes, Indicator, IndicatorPoint};
use ta::indicators::MovingAverageConvergenceDivergence;
use ta::Next;

/// MACD line over candle closes (fast EMA minus slow EMA).
#[derive(Debug)]
pub struct MACD {
    inner: MovingAverageConvergenceDivergence,
    warmup: usize,
    seen: usize,
    current: Option<f64>,
}

impl MACD {
    /// Create new MACD indicator. Every period must be at least 1.
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            inner: MovingAverageConvergenceDivergence::new(
                fast_period,
                slow_period,
                signal_period,
            )
            .unwrap(),
            warmup: slow_period + signal_period,
            seen: 0,
            current: None,
        }
    }
}

impl Indicator for MACD {
    fn name(&self) -> &str {
        "MACD"
    }

    fn update(&mut self, value: f64) {
        let output = self.inner.next(value);
        self.seen += 1;
        // The slow EMA and the signal line both need to fill before the
        // MACD line means anything.
        if self.seen > self.warmup {
            self.current = Some(output.macd);
        }
    }

    fn value(&self) -> Option<f64> {
        self.current
    }

    fn is_ready(&self) -> bool {
        self.seen > self.warmup
    }
}

/// MACD line aligned to candle periods, for the chart's MACD pane.
pub fn macd_points(
    candles: &[Candle],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Vec<IndicatorPoint> {
    points_over_closes(MACD::new(fast_period, slow_period, signal_period), candles)
}
