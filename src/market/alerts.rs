use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertKind {
    /// `abs(change_pct) >= threshold`, re-evaluated fresh every tick.
    PercentMove(f64),
    /// `price >= target`, latched until the price falls back below.
    PriceAbove(f64),
    /// `price <= target`, latched until the price rises back above.
    PriceBelow(f64),
}

impl AlertKind {
    pub fn is_latched(&self) -> bool {
        !matches!(self, AlertKind::PercentMove(_))
    }

    fn key(&self) -> AlertKey {
        match self {
            AlertKind::PercentMove(_) => AlertKey::PercentMove,
            AlertKind::PriceAbove(t) => AlertKey::PriceAbove(t.to_bits()),
            AlertKind::PriceBelow(t) => AlertKey::PriceBelow(t.to_bits()),
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::PercentMove(t) => write!(f, "|Δ| >= {:.2}%", t),
            AlertKind::PriceAbove(t) => write!(f, ">= {:.2}", t),
            AlertKind::PriceBelow(t) => write!(f, "<= {:.2}", t),
        }
    }
}

/// The percent-move threshold is editable at runtime, so its state is keyed by
/// kind alone rather than by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AlertKey {
    PercentMove,
    PriceAbove(u64),
    PriceBelow(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertRule {
    pub symbol: String,
    pub kind: AlertKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlertState {
    pub fired: bool,
    pub last_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub symbol: String,
    pub kind: AlertKind,
    pub price: f64,
    pub change_pct: Option<f64>,
}

impl AlertEvent {
    pub fn title(&self) -> String {
        match self.kind {
            AlertKind::PercentMove(_) => format!("{} price move alert", self.symbol),
            AlertKind::PriceAbove(_) | AlertKind::PriceBelow(_) => {
                format!("{} price target alert", self.symbol)
            }
        }
    }

    pub fn body(&self) -> String {
        match self.kind {
            AlertKind::PercentMove(_) => format!(
                "{} price {:.2}, change {:+.2}%",
                self.symbol,
                self.price,
                self.change_pct.unwrap_or(0.0)
            ),
            AlertKind::PriceAbove(target) => format!(
                "{} price {:.2} crossed above {:.2}",
                self.symbol, self.price, target
            ),
            AlertKind::PriceBelow(target) => format!(
                "{} price {:.2} crossed below {:.2}",
                self.symbol, self.price, target
            ),
        }
    }
}

/// Tracks one `ARMED`/`FIRED` latch per (symbol, alert kind).
#[derive(Debug, Clone, Default)]
pub struct AlertEngine {
    percent_threshold: f64,
    targets: Vec<AlertRule>,
    states: HashMap<(String, AlertKey), AlertState>,
}

impl AlertEngine {
    pub fn new(percent_threshold: f64, targets: Vec<AlertRule>) -> Self {
        Self {
            percent_threshold,
            targets,
            states: HashMap::new(),
        }
    }

    pub fn percent_threshold(&self) -> f64 {
        self.percent_threshold
    }

    pub fn set_percent_threshold(&mut self, threshold: f64) {
        self.percent_threshold = threshold;
    }

    /// Percent-move rule plus every absolute target configured for `symbol`.
    pub fn rules_for(&self, symbol: &str) -> Vec<AlertKind> {
        std::iter::once(AlertKind::PercentMove(self.percent_threshold))
            .chain(
                self.targets
                    .iter()
                    .filter(|rule| rule.symbol == symbol)
                    .map(|rule| rule.kind),
            )
            .collect()
    }

    pub fn state(&self, symbol: &str, kind: &AlertKind) -> AlertState {
        self.states
            .get(&(symbol.to_string(), kind.key()))
            .copied()
            .unwrap_or_default()
    }

    /// Feeds this tick's values for `symbol` through every rule and returns the
    /// events that should notify. Call only for symbols fetched this tick.
    pub fn evaluate(&mut self, symbol: &str, price: f64, change_pct: Option<f64>) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        for kind in self.rules_for(symbol) {
            let (holds, value) = match kind {
                AlertKind::PercentMove(threshold) => match change_pct {
                    Some(change) => (change.abs() >= threshold, change),
                    None => continue,
                },
                AlertKind::PriceAbove(target) => (price >= target, price),
                AlertKind::PriceBelow(target) => (price <= target, price),
            };

            let state = self
                .states
                .entry((symbol.to_string(), kind.key()))
                .or_default();

            let notify = if kind.is_latched() {
                holds && !state.fired
            } else {
                holds
            };

            if kind.is_latched() && state.fired && !holds {
                log::debug!(
                    "{} re-armed on {}: {:?} -> {:.2}",
                    kind,
                    symbol,
                    state.last_value,
                    value
                );
            }
            state.fired = holds;
            state.last_value = Some(value);

            if notify {
                log::info!("alert {} on {} at {:.2}", kind, symbol, price);
                events.push(AlertEvent {
                    symbol: symbol.to_string(),
                    kind,
                    price,
                    change_pct,
                });
            }
        }

        events
    }
}
