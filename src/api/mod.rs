pub mod binance;

use crate::error::FetchFailure;

/// Anything that can produce the current price for a symbol.
pub trait PriceSource {
    async fn fetch(&self, symbol: &str) -> Result<f64, FetchFailure>;
}
