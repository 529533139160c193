//! Order execution and fill simulation.
//!
//! Fills are priced at the symbol's latest close with slippage applied
//! against the trader and a flat-plus-percentage commission.

use tracing::debug;

use super::event::{Direction, FillEvent, OrderEvent};
use crate::ports::HandlerResult;
use crate::ports::data_port::DataHandler;
use crate::ports::execution_port::ExchangeHandler;

/// Cost model for simulated fills.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionConfig {
    pub commission_per_trade: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
}

/// Calculate commission: flat_fee + (trade_value * pct / 100).
pub fn calculate_commission(trade_value: f64, config: &ExecutionConfig) -> f64 {
    config.commission_per_trade + (trade_value * config.commission_pct / 100.0)
}

/// Buying pays up: market_price * (1 + slippage_pct / 100)
pub fn apply_slippage_buy(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct / 100.0)
}

/// Selling gives up: market_price * (1 - slippage_pct / 100)
pub fn apply_slippage_sell(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct / 100.0)
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedExchange {
    config: ExecutionConfig,
}

impl SimulatedExchange {
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }
}

impl ExchangeHandler for SimulatedExchange {
    fn execute_order(
        &mut self,
        order: &OrderEvent,
        data: &dyn DataHandler,
    ) -> HandlerResult<FillEvent> {
        if order.quantity() == 0 {
            debug!(symbol = order.symbol(), "empty order");
            return Ok(None);
        }
        let Some(market_price) = data.latest(order.symbol()).map(|bar| bar.close) else {
            debug!(symbol = order.symbol(), "no price to fill at");
            return Ok(None);
        };

        let price = match order.direction() {
            Direction::Buy => apply_slippage_buy(market_price, self.config.slippage_pct),
            Direction::Sell => apply_slippage_sell(market_price, self.config.slippage_pct),
            Direction::Hold | Direction::Exit => {
                debug!(symbol = order.symbol(), direction = %order.direction(), "unfillable side");
                return Ok(None);
            }
        };
        let value = order.quantity() as f64 * price;
        let commission = calculate_commission(value, &self.config);

        Ok(Some(FillEvent::from_order(order, price, commission)))
    }
}
