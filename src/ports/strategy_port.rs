//! Strategy port trait.

use super::HandlerResult;
use super::data_port::{DataHandler, SharedData};
use super::portfolio_port::{PortfolioHandler, SharedPortfolio};
use crate::domain::error::ReplayError;
use crate::domain::event::{DataEvent, SignalEvent};

pub trait StrategyHandler {
    fn calculate_signal(
        &mut self,
        event: &DataEvent,
        data: &dyn DataHandler,
        portfolio: &dyn PortfolioHandler,
    ) -> HandlerResult<SignalEvent>;

    /// Hand the run's shared providers to the strategy before the first event.
    fn attach(&mut self, data: &SharedData, portfolio: &SharedPortfolio) -> Result<(), ReplayError> {
        let _ = (data, portfolio);
        Ok(())
    }
}
