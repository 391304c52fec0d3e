use crate::api::PriceSource;
use crate::error::{FetchFailure, WatchError};
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Mirrors tried in order until one returns a usable price.
pub const API_BASES: [&str; 3] = [
    "https://api-gcp.binance.com",
    "https://api.binance.us",
    "https://api.binance.com",
];

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const TICKER_PATH: &str = "/api/v3/ticker/price";

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: Value, // "42000.5" from Binance, plain numbers also accepted
}

pub struct RestFetcher {
    client: Client,
    mirrors: Vec<String>,
}

impl RestFetcher {
    pub fn new(mirrors: Vec<String>, timeout: Duration) -> Result<Self, WatchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, mirrors })
    }

    pub fn mirrors(&self) -> &[String] {
        &self.mirrors
    }

    async fn fetch_from(&self, base: &str, symbol: &str) -> Result<f64, WatchError> {
        let url = format!("{}{}", base.trim_end_matches('/'), TICKER_PATH);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::BadStatus(status));
        }

        let body = response.text().await?;
        parse_price(&body)
    }
}

impl PriceSource for RestFetcher {
    async fn fetch(&self, symbol: &str) -> Result<f64, FetchFailure> {
        let mut attempts = Vec::with_capacity(self.mirrors.len());

        for base in &self.mirrors {
            match self.fetch_from(base, symbol).await {
                Ok(price) => {
                    debug!("{} = {} via {}", symbol, price, base);
                    return Ok(price);
                }
                Err(e) => {
                    debug!("{} failed on {}: {}", symbol, base, e);
                    attempts.push((base.clone(), e.to_string()));
                }
            }
        }

        let failure = FetchFailure {
            symbol: symbol.to_string(),
            attempts,
        };
        warn!("{}", failure);
        Err(failure)
    }
}

fn parse_price(body: &str) -> Result<f64, WatchError> {
    let ticker: TickerPrice = serde_json::from_str(body)?;

    let price = match &ticker.price {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| WatchError::InvalidPrice(s.clone()))?,
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| WatchError::InvalidPrice(n.to_string()))?,
        other => return Err(WatchError::InvalidPrice(other.to_string())),
    };

    if !price.is_finite() || price <= 0.0 {
        return Err(WatchError::InvalidPrice(price.to_string()));
    }
    Ok(price)
}
