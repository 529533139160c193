//! Moving averages of close, kept as series that grow with a bar history.
//!
//! A value is `None` during warmup (fewer than `period` bars up to and
//! including the index) and for a zero period.
//!
//! SMA uses a rolling sum. EMA uses k = 2/(n+1), seeded with the SMA of the
//! first n bars, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::domain::event::DataEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Average {
    Sma(usize),
    Ema(usize),
}

#[derive(Debug, Clone, Default)]
struct Series {
    values: Vec<Option<f64>>,
    /// Timestamp of the bar behind the last value.
    last: Option<NaiveDateTime>,
    sum: f64,
}

impl Series {
    /// True when `bars` still starts with the bars this series was built on.
    fn matches(&self, bars: &[DataEvent]) -> bool {
        match self.values.len() {
            0 => true,
            n => bars.get(n - 1).map(|b| b.timestamp) == self.last,
        }
    }

    fn extend(&mut self, average: Average, bars: &[DataEvent]) {
        let start = self.values.len();
        for (i, bar) in bars.iter().enumerate().skip(start) {
            let value = match average {
                Average::Sma(period) => self.next_sma(bars, period, i),
                Average::Ema(period) => self.next_ema(bars, period, i),
            };
            self.values.push(value);
            self.last = Some(bar.timestamp);
        }
    }

    fn next_sma(&mut self, bars: &[DataEvent], period: usize, i: usize) -> Option<f64> {
        if period == 0 {
            return None;
        }
        self.sum += bars[i].close;
        if i >= period {
            self.sum -= bars[i - period].close;
        }
        (i + 1 >= period).then(|| self.sum / period as f64)
    }

    fn next_ema(&mut self, bars: &[DataEvent], period: usize, i: usize) -> Option<f64> {
        if period == 0 {
            return None;
        }
        match self.values.last().copied().flatten() {
            Some(prev) => {
                let k = 2.0 / (period as f64 + 1.0);
                Some(bars[i].close * k + prev * (1.0 - k))
            }
            None => {
                self.sum += bars[i].close;
                (i + 1 == period).then(|| self.sum / period as f64)
            }
        }
    }
}

/// Moving average series of one bar history.
///
/// Series are built on first use and extended as the history grows, so a
/// replay pays once per bar. A history that no longer matches what a series
/// was built on rebuilds that series.
#[derive(Debug, Clone, Default)]
pub struct AverageCache {
    series: HashMap<Average, Series>,
}

impl AverageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `average` at `index` of `bars`.
    pub fn value(&mut self, average: Average, bars: &[DataEvent], index: usize) -> Option<f64> {
        if index >= bars.len() {
            return None;
        }
        let series = self.series.entry(average).or_default();
        if !series.matches(bars) {
            *series = Series::default();
        }
        series.extend(average, bars);
        series.values.get(index).copied().flatten()
    }
}
