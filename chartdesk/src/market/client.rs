//! HTTP client for the upstream candle endpoint.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::data::Candle;
use crate::error::MarketDataError;

/// Columnar candle payload returned by the upstream API: parallel arrays
/// for time, open, high, low, close and volume.
#[derive(Debug, Clone, Deserialize)]
pub struct CandlePayload {
    /// Response status, `"ok"` when data is present.
    pub s: String,
    /// Period timestamps (unix seconds).
    pub t: Vec<i64>,
    pub o: Vec<f64>,
    pub h: Vec<f64>,
    pub l: Vec<f64>,
    pub c: Vec<f64>,
    #[serde(default)]
    pub v: Option<Vec<f64>>,
}

impl CandlePayload {
    /// Transposes the parallel arrays into row-wise candles.
    pub fn into_candles(self) -> Result<Vec<Candle>, MarketDataError> {
        let CandlePayload { s, t, o, h, l, c, v } = self;
        if s != "ok" {
            return Err(MarketDataError::MalformedPayload(format!(
                "upstream status {s}"
            )));
        }
        let len = t.len();
        if o.len() != len || h.len() != len || l.len() != len || c.len() != len {
            return Err(MarketDataError::MalformedPayload(
                "price columns differ in length".to_string(),
            ));
        }
        if let Some(volumes) = &v {
            if volumes.len() != len {
                return Err(MarketDataError::MalformedPayload(
                    "volume column differs in length".to_string(),
                ));
            }
        }

        Ok(t.into_iter()
            .enumerate()
            .map(|(i, time)| Candle {
                time: time.to_string(),
                open: o[i],
                high: h[i],
                low: l[i],
                close: c[i],
                volume: v.as_ref().map(|volumes| volumes[i]),
            })
            .collect())
    }
}

/// Client for the daily-candle endpoint.
#[derive(Debug, Clone)]
pub struct CandleClient {
    http: Client,
    base_url: String,
    token: String,
    resolution: String,
    count: u32,
}

impl CandleClient {
    pub fn new(base_url: String, token: String, resolution: String, count: u32) -> Self {
        Self {
            http: Client::new(),
            base_url,
            token,
            resolution,
            count,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.market_data_url.clone(),
            config.finnhub_api_key.clone(),
            config.candle_resolution.clone(),
            config.candle_count,
        )
    }

    /// Fetches one candle series for `symbol`. Single attempt, no retries;
    /// retry policy belongs to the caller.
    pub async fn candles(&self, symbol: &str) -> Result<Vec<Candle>, MarketDataError> {
        let url = format!(
            "{}/stock/candle?symbol={}&resolution={}&count={}&token={}",
            self.base_url, symbol, self.resolution, self.count, self.token
        );
        debug!(%symbol, "requesting candle series");
        let response = self.http.get(&url).send().await?.error_for_status()?;
        let payload: CandlePayload = response.json().await?;
        payload.into_candles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CandlePayload {
        CandlePayload {
            s: "ok".to_string(),
            t: vec![1700000000, 1700086400],
            o: vec![10.0, 11.0],
            h: vec![10.5, 11.5],
            l: vec![9.5, 10.5],
            c: vec![10.25, 11.25],
            v: Some(vec![100.0, 110.0]),
        }
    }

    #[test]
    fn test_transpose() {
        let candles = payload().into_candles().unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].time, "1700000000");
        assert_eq!(candles[0].open, 10.0);
        assert_eq!(candles[1].close, 11.25);
        assert_eq!(candles[1].volume, Some(110.0));
    }

    #[test]
    fn test_missing_volume_column() {
        let mut payload = payload();
        payload.v = None;
        let candles = payload.into_candles().unwrap();
        assert!(candles.iter().all(|c| c.volume.is_none()));
    }

    #[test]
    fn test_mismatched_columns_are_malformed() {
        let mut payload = payload();
        payload.c.pop();
        let err = payload.into_candles().unwrap_err();
        assert!(matches!(err, MarketDataError::MalformedPayload(_)));
    }

    #[test]
    fn test_no_data_status_is_malformed() {
        let mut payload = payload();
        payload.s = "no_data".to_string();
        let err = payload.into_candles().unwrap_err();
        assert!(matches!(err, MarketDataError::MalformedPayload(_)));
    }
}
