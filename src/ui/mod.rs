pub mod console;
pub mod dashboard;

use crate::error::WatchError;
use crate::market::alerts::{AlertEvent, AlertKind, AlertState};
use crate::market::history::Sample;
use crate::market::indicators::{IndicatorSet, Trend};
use chrono::{DateTime, Local};
use num_format::{Locale, ToFormattedString};
use std::time::Duration;

/// What the display reports back between ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Quit,
    NudgeThreshold(f64),
}

#[derive(Debug, Clone)]
pub struct SymbolView {
    pub symbol: String,
    pub price: Option<f64>,
    pub change_pct: Option<f64>,
    pub trend: Trend,
    pub indicators: IndicatorSet,
    pub history: Vec<Sample>,
    pub alert_states: Vec<(AlertKind, AlertState)>,
    /// False when this tick's fetch failed and the values are carried over.
    pub fresh: bool,
}

/// Read-only copy of the session handed to the display once per tick.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tick: u64,
    pub taken_at: DateTime<Local>,
    pub percent_threshold: f64,
    pub symbols: Vec<SymbolView>,
    pub alerts: Vec<AlertEvent>,
    pub warnings: Vec<String>,
}

impl Snapshot {
    pub fn has_prices(&self) -> bool {
        self.symbols.iter().any(|view| view.price.is_some())
    }
}

pub trait DisplaySink {
    fn render(&mut self, snapshot: &Snapshot) -> Result<(), WatchError>;

    /// Waits out the gap between ticks, collecting any user commands.
    async fn idle(&mut self, interval: Duration) -> Result<Vec<Command>, WatchError>;
}

impl SymbolView {
    /// Latched rules currently holding, shown so the user knows why no repeat alert fires.
    pub fn latched_count(&self) -> usize {
        self.alert_states
            .iter()
            .filter(|(kind, state)| kind.is_latched() && state.fired)
            .count()
    }
}

pub fn format_price(price: f64) -> String {
    if price < 1000.0 {
        return format!("{:.4}", price);
    }

    let fixed = format!("{:.2}", price);
    match fixed.split_once('.') {
        Some((whole, cents)) => match whole.parse::<u64>() {
            Ok(whole) => format!("{}.{}", whole.to_formatted_string(&Locale::en), cents),
            Err(_) => fixed,
        },
        None => fixed,
    }
}

pub fn format_change(change_pct: Option<f64>) -> String {
    change_pct.map_or_else(|| "--".to_string(), |c| format!("{:+.2}%", c))
}

pub fn format_optional(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "--".to_string(), |v| format!("{:.*}", decimals, v))
}
