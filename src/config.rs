use crate::api::binance::rest::{API_BASES, DEFAULT_TIMEOUT};
use crate::error::WatchError;
use crate::market::alerts::{AlertKind, AlertRule};
use crate::market::history::DEFAULT_HISTORY_LEN;
use crate::market::indicators::{DEFAULT_RSI_PERIOD, DEFAULT_SMA_WINDOW};
use crate::notify::cue::CueKind;
use crate::notify::push::PushProvider;
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

pub const MIN_THRESHOLD: f64 = 0.1;
pub const MAX_THRESHOLD: f64 = 50.0;
pub const DEFAULT_LOG_FILE: &str = "pricewatch.log";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "pricewatch",
    version,
    about = "Polls Binance ticker prices, charts them and alerts on large moves"
)]
pub struct Config {
    /// Trading pairs to watch
    #[arg(
        long,
        env = "PRICEWATCH_SYMBOLS",
        value_delimiter = ',',
        default_values = ["BTCUSDT", "ETHUSDT", "BNBUSDT"]
    )]
    pub symbols: Vec<String>,

    /// Seconds between polls
    #[arg(
        long,
        env = "PRICEWATCH_INTERVAL",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(5..=60)
    )]
    pub interval_secs: u64,

    /// Percent move between two polls that triggers an alert
    #[arg(long, env = "PRICEWATCH_THRESHOLD", default_value_t = 2.0, value_parser = parse_threshold)]
    pub threshold: f64,

    /// Alert once when SYMBOL trades at or above PRICE
    #[arg(long = "above", value_name = "SYMBOL=PRICE", value_parser = parse_target)]
    pub above: Vec<(String, f64)>,

    /// Alert once when SYMBOL trades at or below PRICE
    #[arg(long = "below", value_name = "SYMBOL=PRICE", value_parser = parse_target)]
    pub below: Vec<(String, f64)>,

    #[arg(long, env = "PRICEWATCH_PUSH", value_enum, default_value_t = PushProvider::None)]
    pub push: PushProvider,

    /// Token or key for the push provider
    #[arg(long, env = "PRICEWATCH_PUSH_TOKEN", default_value = "", hide_env_values = true)]
    pub push_token: String,

    /// Samples kept per pair
    #[arg(long, default_value_t = DEFAULT_HISTORY_LEN)]
    pub history_len: usize,

    #[arg(long, default_value_t = DEFAULT_SMA_WINDOW)]
    pub sma_window: usize,

    #[arg(long, default_value_t = DEFAULT_RSI_PERIOD)]
    pub rsi_period: usize,

    /// API base, repeatable, tried in the order given
    #[arg(long = "mirror", value_name = "URL")]
    pub mirrors: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    #[arg(long, value_enum, default_value_t = CueKind::Bell)]
    pub cue: CueKind,

    /// Log prices instead of drawing the terminal dashboard
    #[arg(long)]
    pub headless: bool,

    #[arg(long, env = "PRICEWATCH_LOG", default_value = "info")]
    pub log_level: LevelFilter,

    /// Defaults to pricewatch.log while the dashboard owns the terminal
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Upper-cased, de-duplicated symbol list in the order given.
    pub fn symbols(&self) -> Result<Vec<String>, WatchError> {
        let mut symbols: Vec<String> = Vec::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            let symbol = symbol.trim().to_uppercase();
            if !symbol.is_empty() && !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }

        if symbols.is_empty() {
            return Err(WatchError::Config("no symbols to watch".to_string()));
        }
        Ok(symbols)
    }

    /// Price targets as alert rules; every target must name a watched symbol.
    pub fn targets(&self) -> Result<Vec<AlertRule>, WatchError> {
        let symbols = self.symbols()?;
        let above = self.above.iter().map(|(symbol, price)| AlertRule {
            symbol: symbol.clone(),
            kind: AlertKind::PriceAbove(*price),
        });
        let below = self.below.iter().map(|(symbol, price)| AlertRule {
            symbol: symbol.clone(),
            kind: AlertKind::PriceBelow(*price),
        });

        let rules: Vec<AlertRule> = above.chain(below).collect();
        if let Some(rule) = rules.iter().find(|rule| !symbols.contains(&rule.symbol)) {
            return Err(WatchError::Config(format!(
                "target {} {} is for a symbol that is not watched",
                rule.symbol, rule.kind
            )));
        }
        Ok(rules)
    }

    pub fn mirrors(&self) -> Vec<String> {
        if self.mirrors.is_empty() {
            API_BASES.iter().map(|base| base.to_string()).collect()
        } else {
            self.mirrors.clone()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        match (&self.log_file, self.headless) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => None,
            (None, false) => Some(PathBuf::from(DEFAULT_LOG_FILE)),
        }
    }
}

pub fn clamp_threshold(threshold: f64) -> f64 {
    threshold.clamp(MIN_THRESHOLD, MAX_THRESHOLD)
}

fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("`{}` is not a number", s))?;
    if !(MIN_THRESHOLD..=MAX_THRESHOLD).contains(&value) {
        return Err(format!(
            "threshold must be between {} and {}",
            MIN_THRESHOLD, MAX_THRESHOLD
        ));
    }
    Ok(value)
}

fn parse_target(s: &str) -> Result<(String, f64), String> {
    let (symbol, price) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=PRICE, got `{}`", s))?;

    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(format!("missing symbol in `{}`", s));
    }
    let price: f64 = price
        .trim()
        .parse()
        .map_err(|_| format!("`{}` is not a price", price))?;
    if !price.is_finite() || price <= 0.0 {
        return Err(format!("price must be positive, got {}", price));
    }
    Ok((symbol, price))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, clap::Error> {
        Config::try_parse_from(std::iter::once("pricewatch").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_cover_three_majors() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.symbols().unwrap(), vec!["BTCUSDT", "ETHUSDT", "BNBUSDT"]);
        assert_eq!(config.interval(), Duration::from_secs(10));
        assert_eq!(config.threshold, 2.0);
        assert_eq!(config.push, PushProvider::None);
        assert_eq!(config.history_len, 100);
        assert_eq!(config.mirrors().len(), 3);
        assert_eq!(config.mirrors()[0], "https://api-gcp.binance.com");
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn symbols_are_normalised() {
        let config = parse(&["--symbols", "btcusdt, ethusdt,BTCUSDT,,"]).unwrap();
        assert_eq!(config.symbols().unwrap(), vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn empty_symbol_list_is_rejected() {
        let config = parse(&["--symbols", " , "]).unwrap();
        assert!(matches!(config.symbols(), Err(WatchError::Config(_))));
    }

    #[test]
    fn interval_is_bounded() {
        assert!(parse(&["--interval-secs", "4"]).is_err());
        assert!(parse(&["--interval-secs", "61"]).is_err());
        assert_eq!(parse(&["--interval-secs", "60"]).unwrap().interval_secs, 60);
    }

    #[test]
    fn threshold_is_bounded() {
        assert!(parse(&["--threshold", "0.05"]).is_err());
        assert!(parse(&["--threshold", "51"]).is_err());
        assert!(parse(&["--threshold", "abc"]).is_err());
        assert_eq!(parse(&["--threshold", "3.5"]).unwrap().threshold, 3.5);
    }

    #[test]
    fn price_targets_become_rules() {
        let config = parse(&["--above", "btcusdt=90000", "--below", "ETHUSDT=2000.5"]).unwrap();
        assert_eq!(
            config.targets().unwrap(),
            vec![
                AlertRule {
                    symbol: "BTCUSDT".to_string(),
                    kind: AlertKind::PriceAbove(90000.0),
                },
                AlertRule {
                    symbol: "ETHUSDT".to_string(),
                    kind: AlertKind::PriceBelow(2000.5),
                },
            ]
        );
    }

    #[test]
    fn targets_for_unwatched_symbols_are_rejected() {
        let config = parse(&["--above", "DOGEUSDT=1"]).unwrap();
        assert!(matches!(config.targets(), Err(WatchError::Config(_))));

        let config = parse(&["--symbols", "DOGEUSDT", "--above", "dogeusdt=1"]).unwrap();
        assert_eq!(config.targets().unwrap().len(), 1);
    }

    #[test]
    fn malformed_targets_are_rejected() {
        assert!(parse(&["--above", "BTCUSDT"]).is_err());
        assert!(parse(&["--above", "=100"]).is_err());
        assert!(parse(&["--above", "BTCUSDT=-1"]).is_err());
        assert!(parse(&["--below", "BTCUSDT=lots"]).is_err());
    }

    #[test]
    fn push_provider_names() {
        assert_eq!(parse(&["--push", "serverchan"]).unwrap().push, PushProvider::ServerChan);
        assert_eq!(parse(&["--push", "pushplus"]).unwrap().push, PushProvider::PushPlus);
        assert_eq!(parse(&["--push", "bark"]).unwrap().push, PushProvider::Bark);
        assert!(parse(&["--push", "wechat"]).is_err());
    }

    #[test]
    fn explicit_mirrors_replace_defaults() {
        let config = parse(&["--mirror", "http://a", "--mirror", "http://b"]).unwrap();
        assert_eq!(config.mirrors(), vec!["http://a", "http://b"]);
    }

    #[test]
    fn dashboard_mode_logs_to_file_by_default() {
        assert_eq!(parse(&[]).unwrap().log_file(), Some(PathBuf::from(DEFAULT_LOG_FILE)));
        assert_eq!(parse(&["--headless"]).unwrap().log_file(), None);
        assert_eq!(
            parse(&["--headless", "--log-file", "run.log"]).unwrap().log_file(),
            Some(PathBuf::from("run.log"))
        );
    }

    #[test]
    fn threshold_clamp() {
        assert_eq!(clamp_threshold(0.0), MIN_THRESHOLD);
        assert_eq!(clamp_threshold(75.0), MAX_THRESHOLD);
        assert_eq!(clamp_threshold(2.5), 2.5);
    }
}
