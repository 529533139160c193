//! Data access port traits.
//!
//! [`BarSource`] loads raw bars for one symbol; [`DataHandler`] is the
//! cursor the replay loop pulls from, one bar at a time.

use std::cell::RefCell;
use std::rc::Rc;

use crate::domain::error::ReplayError;
use crate::domain::event::DataEvent;

pub trait BarSource {
    /// All bars for `symbol`, sorted by timestamp.
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<DataEvent>, ReplayError>;
}

pub trait DataHandler {
    /// The full pre-loaded bar sequence, across all symbols.
    fn stream(&self) -> &[DataEvent];

    /// Advance the cursor by one bar. `None` once the stream is exhausted.
    fn next_bar(&mut self) -> Option<DataEvent>;

    /// Bars of `symbol` already handed out by `next_bar`, oldest first.
    fn history(&self, symbol: &str) -> &[DataEvent];

    fn latest(&self, symbol: &str) -> Option<&DataEvent> {
        self.history(symbol).last()
    }
}

/// Shared, non-owning handle to the data provider of a run.
pub type SharedData = Rc<RefCell<dyn DataHandler>>;
