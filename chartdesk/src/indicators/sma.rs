//! SMA (Simple Moving Average) indicator

use crate::data::Candle;
use crate::indicators::{points_over_closes, Indicator, IndicatorPoint};
use ta::indicators::SimpleMovingAverage;
use ta::Next;

/// Simple moving average over candle closes.
#[derive(Debug)]
pub struct SMA {
    inner: SimpleMovingAverage,
    period: usize,
    seen: usize,
    current: Option<f64>,
}

impl SMA {
    /// Create new SMA indicator. `period` must be at least 1.
    pub fn new(period: usize) -> Self {
        Self {
            inner: SimpleMovingAverage::new(period).unwrap(),
            period,
            seen: 0,
            current: None,
        }
    }
}

impl Indicator for SMA {
    fn name(&self) -> &str {
        "SMA"
    }

    fn update(&mut self, value: f64) {
        let sma_value = self.inner.next(value);
        self.seen += 1;
        // ta averages the partial window; hold the value back until the
        // window is full.
        if self.seen >= self.period {
            self.current = Some(sma_value);
        }
    }

    fn value(&self) -> Option<f64> {
        self.current
    }

    fn is_ready(&self) -> bool {
        self.seen >= self.period
    }
}

/// SMA aligned to candle periods, for the chart's overlay line.
pub fn sma_points(candles: &[Candle], period: usize) -> Vec<IndicatorPoint> {
    points_over_closes(SMA::new(period), candles)
}
