use ta::{indicators::SimpleMovingAverage, Next};

pub const DEFAULT_SMA_WINDOW: usize = 20;
pub const DEFAULT_RSI_PERIOD: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn from_change(change_pct: Option<f64>) -> Self {
        match change_pct {
            Some(c) if c > 0.0 => Trend::Up,
            Some(c) if c < 0.0 => Trend::Down,
            _ => Trend::Flat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Flat => "flat",
        }
    }
}

/// Percent move from `prev` to `cur`. `None` when there is no usable previous price.
pub fn percent_change(prev: Option<f64>, cur: f64) -> Option<f64> {
    match prev {
        Some(p) if p != 0.0 => Some((cur - p) / p * 100.0),
        _ => None,
    }
}

/// Mean of the last `window` prices.
pub fn sma(prices: &[f64], window: usize) -> Option<f64> {
    if window == 0 || prices.len() < window {
        return None;
    }

    let mut sma = SimpleMovingAverage::new(window).ok()?;
    prices[prices.len() - window..]
        .iter()
        .fold(None, |_, &p| Some(sma.next(p)))
}

/// RSI over the trailing `period` deltas using plain averages of gains and losses.
///
/// Needs `period + 1` prices. When the window holds no losses the result is
/// fixed at 100, which also covers a completely flat window.
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let tail = &prices[prices.len() - (period + 1)..];
    let (gains, losses) = tail
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(gains, losses), delta| {
            if delta > 0.0 {
                (gains + delta, losses)
            } else {
                (gains, losses - delta)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorSet {
    pub sma: Option<f64>,
    pub rsi: Option<f64>,
}

impl IndicatorSet {
    pub fn compute(prices: &[f64], sma_window: usize, rsi_period: usize) -> Self {
        Self {
            sma: sma(prices, sma_window),
            rsi: rsi(prices, rsi_period),
        }
    }
}
