//! Statistics collector port trait.

use super::portfolio_port::PortfolioHandler;
use crate::domain::event::{DataEvent, Event};
use crate::domain::position::Transaction;

pub trait StatisticHandler {
    fn track_event(&mut self, event: Event);

    /// Called once per data event, after the portfolio was marked to market.
    fn update(&mut self, event: &DataEvent, portfolio: &dyn PortfolioHandler);

    fn track_transaction(&mut self, transaction: Transaction);

    fn events(&self) -> &[Event];

    fn transactions(&self) -> &[Transaction];

    /// Emit the final report.
    fn print_result(&self);
}
