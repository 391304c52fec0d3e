use chrono::{DateTime, Local};
use std::collections::{HashMap, VecDeque};

pub const DEFAULT_HISTORY_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub price: f64,
}

impl Sample {
    pub fn now(price: f64) -> Self {
        Self {
            timestamp: Local::now(),
            price,
        }
    }
}

/// Per-symbol rolling window holding at most `capacity` samples.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    capacity: usize,
    samples: HashMap<String, VecDeque<Sample>>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn append(&mut self, symbol: &str, sample: Sample) {
        let capacity = self.capacity;
        let entries = self
            .samples
            .entry(symbol.to_string())
            .or_insert_with(|| VecDeque::with_capacity(capacity));

        entries.push_back(sample);
        while entries.len() > capacity {
            entries.pop_front();
        }
    }

    /// Oldest-first copy of the samples currently held for `symbol`.
    pub fn window(&self, symbol: &str) -> Vec<Sample> {
        self.samples
            .get(symbol)
            .map(|entries| entries.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn prices(&self, symbol: &str) -> Vec<f64> {
        self.samples
            .get(symbol)
            .map(|entries| entries.iter().map(|s| s.price).collect())
            .unwrap_or_default()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }
}
