//! RSI (Relative Strength Index) indicator

use crate::data::Candle;
use crate::indicators::{points_over_closes, Indicator, IndicatorPoint};
use ta::indicators::RelativeStrengthIndex;
use ta::Next;

/// Relative Strength Index over candle closes.
///
/// Values stay absent until `period + 1` closes have been seen, matching
/// the chart's rule of skipping the unfilled lookback window.
#[derive(Debug)]
pub struct RSI {
    inner: RelativeStrengthIndex,
    period: usize,
    seen: usize,
    current: Option<f64>,
}

impl RSI {
    /// Create new RSI indicator. `period` must be at least 1.
    pub fn new(period: usize) -> Self {
        Self {
            inner: RelativeStrengthIndex::new(period).unwrap(),
            period,
            seen: 0,
            current: None,
        }
    }
}

impl Indicator for RSI {
    fn name(&self) -> &str {
        "RSI"
    }

    fn update(&mut self, value: f64) {
        let rsi_value = self.inner.next(value);
        self.seen += 1;
        // ta's RSI emits from the first input; hold it back until the
        // window holds period + 1 closes.
        if self.seen > self.period {
            self.current = Some(rsi_value);
        }
    }

    fn value(&self) -> Option<f64> {
        self.current
    }

    fn is_ready(&self) -> bool {
        self.seen > self.period
    }
}

/// RSI aligned to candle periods, for the chart's RSI pane.
pub fn rsi_points(candles: &[Candle], period: usize) -> Vec<IndicatorPoint> {
    points_over_closes(RSI::new(period), candles)
}
