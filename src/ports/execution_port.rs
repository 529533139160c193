//! Order execution port trait.

use super::HandlerResult;
use super::data_port::DataHandler;
use crate::domain::event::{FillEvent, OrderEvent};

pub trait ExchangeHandler {
    fn execute_order(&mut self, order: &OrderEvent, data: &dyn DataHandler)
    -> HandlerResult<FillEvent>;
}
