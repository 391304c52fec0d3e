use crate::error::WatchError;
use crate::ui::{
    format_change, format_optional, format_price, Command, DisplaySink, Snapshot, SymbolView,
};
use log::{error, info, warn};
use std::time::Duration;
use tokio::sync::watch;

/// Headless display: one log line per symbol per tick. Ctrl-C stops the loop,
/// including a Ctrl-C pressed while a tick is still fetching.
#[derive(Debug)]
pub struct LogSink {
    interrupted: watch::Receiver<bool>,
}

impl LogSink {
    /// Spawns the Ctrl-C listener, so this must run inside the tokio runtime.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    let _ = tx.send(true);
                }
                Err(e) => warn!("Ctrl-C listener unavailable: {}", e),
            }
        });
        Self::with_interrupt(rx)
    }

    /// Stops the loop once `interrupted` turns true.
    pub fn with_interrupt(interrupted: watch::Receiver<bool>) -> Self {
        Self { interrupted }
    }

    pub fn line(view: &SymbolView) -> String {
        let price = view.price.map_or_else(|| "--".to_string(), format_price);
        format!(
            "{:<10} {:>14} {:>8} {:<5} sma={} rsi={} n={}{}{}",
            view.symbol,
            price,
            format_change(view.change_pct),
            view.trend.as_str(),
            format_optional(view.indicators.sma, 2),
            format_optional(view.indicators.rsi, 1),
            view.history.len(),
            match view.latched_count() {
                0 => String::new(),
                n => format!(" targets_hit={}", n),
            },
            if view.fresh { "" } else { " (stale)" }
        )
    }
}

impl DisplaySink for LogSink {
    fn render(&mut self, snapshot: &Snapshot) -> Result<(), WatchError> {
        if !snapshot.has_prices() {
            error!("tick {}: no prices available, check network or mirrors", snapshot.tick);
        } else {
            for view in &snapshot.symbols {
                info!("{}", Self::line(view));
            }
        }

        for event in &snapshot.alerts {
            warn!("{}", event.body());
        }
        for warning in &snapshot.warnings {
            warn!("{}", warning);
        }
        Ok(())
    }

    async fn idle(&mut self, interval: Duration) -> Result<Vec<Command>, WatchError> {
        let sleep = tokio::time::sleep(interval);
        tokio::pin!(sleep);

        loop {
            if *self.interrupted.borrow_and_update() {
                info!("Interrupted, stopping");
                return Ok(vec![Command::Quit]);
            }

            tokio::select! {
                _ = &mut sleep => return Ok(Vec::new()),
                changed = self.interrupted.changed() => {
                    if changed.is_err() {
                        // Listener is gone, nothing can interrupt this wait
                        (&mut sleep).await;
                        return Ok(Vec::new());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::history::Sample;
    use crate::market::indicators::{IndicatorSet, Trend};

    fn view(fresh: bool) -> SymbolView {
        SymbolView {
            symbol: "BTCUSDT".to_string(),
            price: Some(42000.5),
            change_pct: Some(1.5),
            trend: Trend::Up,
            indicators: IndicatorSet {
                sma: Some(41000.0),
                rsi: None,
            },
            history: vec![Sample::now(41000.0), Sample::now(42000.5)],
            alert_states: Vec::new(),
            fresh,
        }
    }

    #[test]
    fn line_shows_price_change_and_indicators() {
        let line = LogSink::line(&view(true));
        assert!(line.starts_with("BTCUSDT"));
        assert!(line.contains("42,000.50"));
        assert!(line.contains("+1.50%"));
        assert!(line.contains("sma=41000.00 rsi=-- n=2"));
        assert!(!line.contains("stale"));
    }

    #[test]
    fn stale_rows_are_marked() {
        assert!(LogSink::line(&view(false)).ends_with("(stale)"));
    }

    #[tokio::test]
    async fn idle_waits_without_commands() {
        let (_tx, rx) = watch::channel(false);
        let mut sink = LogSink::with_interrupt(rx);
        let commands = sink.idle(Duration::from_millis(10)).await.unwrap();
        assert!(commands.is_empty());
    }

    #[tokio::test]
    async fn interrupt_between_waits_is_not_lost() {
        let (tx, rx) = watch::channel(false);
        let mut sink = LogSink::with_interrupt(rx);
        assert!(sink.idle(Duration::from_millis(10)).await.unwrap().is_empty());

        // Arrives while the poller is busy with a tick
        tx.send(true).unwrap();

        let commands = sink.idle(Duration::from_secs(30)).await.unwrap();
        assert_eq!(commands, vec![Command::Quit]);
    }

    #[tokio::test]
    async fn interrupt_during_wait_ends_it_early() {
        let (tx, rx) = watch::channel(false);
        let mut sink = LogSink::with_interrupt(rx);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(true);
        });

        let commands = sink.idle(Duration::from_secs(30)).await.unwrap();
        assert_eq!(commands, vec![Command::Quit]);
    }

    #[tokio::test]
    async fn closed_listener_still_waits_out_interval() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let mut sink = LogSink::with_interrupt(rx);
        let commands = sink.idle(Duration::from_millis(10)).await.unwrap();
        assert!(commands.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sigint_outside_idle_stops_the_loop() {
        let mut sink = LogSink::new();
        // Lets the spawned listener register its handler
        assert!(sink.idle(Duration::from_millis(20)).await.unwrap().is_empty());

        let status = std::process::Command::new("kill")
            .args(["-INT", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());
        tokio::time::sleep(Duration::from_millis(200)).await;

        let commands = sink.idle(Duration::from_secs(5)).await.unwrap();
        assert_eq!(commands, vec![Command::Quit]);
    }
}
