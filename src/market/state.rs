use crate::market::alerts::{AlertEngine, AlertEvent};
use crate::market::history::{HistoryStore, Sample};
use crate::market::indicators::{percent_change, IndicatorSet, Trend};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceState {
    pub last_price: Option<f64>,
    pub change_pct: Option<f64>,
}

/// Result of feeding one successful fetch into the session.
#[derive(Debug, Clone)]
pub struct SymbolUpdate {
    pub price: f64,
    pub change_pct: Option<f64>,
    pub indicators: IndicatorSet,
    pub alerts: Vec<AlertEvent>,
}

/// Everything the poller keeps between ticks. Owned by the poller alone.
#[derive(Debug)]
pub struct SessionState {
    pub symbols: Vec<String>,
    pub history: HistoryStore,
    pub alerts: AlertEngine,
    prices: HashMap<String, PriceState>,
    sma_window: usize,
    rsi_period: usize,
}

impl SessionState {
    pub fn new(
        symbols: Vec<String>,
        history: HistoryStore,
        alerts: AlertEngine,
        sma_window: usize,
        rsi_period: usize,
    ) -> Self {
        Self {
            symbols,
            history,
            alerts,
            prices: HashMap::new(),
            sma_window,
            rsi_period,
        }
    }

    pub fn price_state(&self, symbol: &str) -> PriceState {
        self.prices.get(symbol).copied().unwrap_or_default()
    }

    pub fn trend(&self, symbol: &str) -> Trend {
        Trend::from_change(self.price_state(symbol).change_pct)
    }

    pub fn indicators(&self, symbol: &str) -> IndicatorSet {
        IndicatorSet::compute(
            &self.history.prices(symbol),
            self.sma_window,
            self.rsi_period,
        )
    }

    /// Store a freshly fetched sample and run indicators and alerts over it.
    pub fn record(&mut self, symbol: &str, sample: Sample) -> SymbolUpdate {
        self.history.append(symbol, sample);

        let state = self.prices.entry(symbol.to_string()).or_default();
        let change_pct = percent_change(state.last_price, sample.price);
        state.last_price = Some(sample.price);
        state.change_pct = change_pct;

        let indicators = self.indicators(symbol);
        let alerts = self.alerts.evaluate(symbol, sample.price, change_pct);

        SymbolUpdate {
            price: sample.price,
            change_pct,
            indicators,
            alerts,
        }
    }
}
