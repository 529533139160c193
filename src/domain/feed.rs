//! Merged multi-symbol bar stream.

use std::collections::HashMap;

use crate::domain::event::DataEvent;
use crate::ports::data_port::DataHandler;

/// Pre-loaded bars of every symbol, replayed in timestamp order.
///
/// Bars sharing a timestamp keep the order of the symbol list they were
/// loaded with.
#[derive(Debug, Clone, Default)]
pub struct BarFeed {
    stream: Vec<DataEvent>,
    cursor: usize,
    history: HashMap<String, Vec<DataEvent>>,
}

impl BarFeed {
    pub fn new(mut bars: Vec<DataEvent>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        Self {
            stream: bars,
            cursor: 0,
            history: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.stream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }
}

impl DataHandler for BarFeed {
    fn stream(&self) -> &[DataEvent] {
        &self.stream
    }

    fn next_bar(&mut self) -> Option<DataEvent> {
        let bar = self.stream.get(self.cursor)?.clone();
        self.cursor += 1;
        self.history
            .entry(bar.symbol.clone())
            .or_default()
            .push(bar.clone());
        Some(bar)
    }

    fn history(&self, symbol: &str) -> &[DataEvent] {
        self.history.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }
}
