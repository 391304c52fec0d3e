use crate::api::PriceSource;
use crate::config::clamp_threshold;
use crate::market::history::Sample;
use crate::market::state::SessionState;
use crate::notify::Notify;
use crate::ui::{Command, DisplaySink, Snapshot, SymbolView};
use chrono::Local;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::time::Duration;

/// Drives fetch, store, compute, alert and render once per interval.
pub struct Poller<S, N, D> {
    source: S,
    notifier: N,
    sink: D,
    state: SessionState,
    interval: Duration,
    ticks: u64,
}

impl<S, N, D> Poller<S, N, D>
where
    S: PriceSource,
    N: Notify,
    D: DisplaySink,
{
    pub fn new(source: S, notifier: N, sink: D, state: SessionState, interval: Duration) -> Self {
        Self {
            source,
            notifier,
            sink,
            state,
            interval,
            ticks: 0,
        }
    }

    /// Runs until the sink asks to quit or `max_ticks` ticks have completed.
    /// Returns the number of ticks run.
    pub async fn run(&mut self, max_ticks: Option<u64>) -> u64 {
        info!(
            "Polling {} every {}s",
            self.state.symbols.join(", "),
            self.interval.as_secs()
        );

        loop {
            let snapshot = self.tick().await;
            if let Err(e) = self.sink.render(&snapshot) {
                error!("Display error: {}", e);
            }

            if max_ticks.map_or(false, |max| self.ticks >= max) {
                break;
            }

            let commands = match self.sink.idle(self.interval).await {
                Ok(commands) => commands,
                Err(e) => {
                    error!("Display error while idle: {}", e);
                    tokio::time::sleep(self.interval).await;
                    Vec::new()
                }
            };
            if !self.apply(commands) {
                break;
            }
        }

        self.ticks
    }

    /// One full pass over every symbol. A failed fetch only skips that symbol.
    pub async fn tick(&mut self) -> Snapshot {
        self.ticks += 1;
        let mut fresh = HashSet::new();
        let mut alerts = Vec::new();
        let mut warnings = Vec::new();

        let symbols = self.state.symbols.clone();
        for symbol in &symbols {
            let price = match self.source.fetch(symbol).await {
                Ok(price) => price,
                Err(failure) => {
                    warnings.push(failure.to_string());
                    continue;
                }
            };

            let update = self.state.record(symbol, Sample::now(price));
            fresh.insert(symbol.as_str());
            debug!(
                "{} {:.4} change={:?} sma={:?} rsi={:?}",
                symbol, update.price, update.change_pct, update.indicators.sma, update.indicators.rsi
            );

            for event in update.alerts {
                if let Err(e) = self.notifier.notify(&event.title(), &event.body()).await {
                    warn!("{}", e);
                    warnings.push(e.to_string());
                }
                alerts.push(event);
            }
        }

        let views = symbols
            .iter()
            .map(|symbol| {
                let price_state = self.state.price_state(symbol);
                SymbolView {
                    symbol: symbol.clone(),
                    price: price_state.last_price,
                    change_pct: price_state.change_pct,
                    trend: self.state.trend(symbol),
                    indicators: self.state.indicators(symbol),
                    history: self.state.history.window(symbol),
                    alert_states: self
                        .state
                        .alerts
                        .rules_for(symbol)
                        .into_iter()
                        .map(|kind| (kind, self.state.alerts.state(symbol, &kind)))
                        .collect(),
                    fresh: fresh.contains(symbol.as_str()),
                }
            })
            .collect();

        Snapshot {
            tick: self.ticks,
            taken_at: Local::now(),
            percent_threshold: self.state.alerts.percent_threshold(),
            symbols: views,
            alerts,
            warnings,
        }
    }

    /// Applies sink commands. Returns false when the loop should stop.
    fn apply(&mut self, commands: Vec<Command>) -> bool {
        for command in commands {
            match command {
                Command::Quit => return false,
                Command::NudgeThreshold(delta) => {
                    let threshold = clamp_threshold(self.state.alerts.percent_threshold() + delta);
                    info!("Move alert threshold set to {:.1}%", threshold);
                    self.state.alerts.set_percent_threshold(threshold);
                }
            }
        }
        true
    }
}
