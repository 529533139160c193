//! Portfolio ledger port trait.

use std::cell::RefCell;
use std::rc::Rc;

use super::HandlerResult;
use super::data_port::DataHandler;
use crate::domain::event::{DataEvent, FillEvent, OrderEvent, SignalEvent};
use crate::domain::position::Transaction;

pub trait PortfolioHandler {
    fn initial_cash(&self) -> f64;

    fn set_cash(&mut self, cash: f64);

    fn cash(&self) -> f64;

    /// Cash plus the marked-to-market value of all holdings.
    fn value(&self) -> f64;

    /// Mark holdings of `event.symbol` to the bar's close.
    fn update(&mut self, event: &DataEvent);

    fn on_signal(&mut self, signal: &SignalEvent, data: &dyn DataHandler)
    -> HandlerResult<OrderEvent>;

    fn on_fill(&mut self, fill: &FillEvent, data: &dyn DataHandler) -> HandlerResult<Transaction>;
}

/// Shared, non-owning handle to the portfolio of a run.
pub type SharedPortfolio = Rc<RefCell<dyn PortfolioHandler>>;
