//! Cash and holdings ledger.
//!
//! Cash moves by the signed value of each fill: buys debit value plus
//! commission, sells credit value minus commission. Short sales therefore
//! credit their proceeds and carry a negative holding, and
//! `value() = cash + sum(quantity * last_price)` stays correct on both sides.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use super::event::{DataEvent, Direction, FillEvent, OrderEvent, SignalEvent};
use super::position::{Position, Transaction};
use crate::ports::HandlerResult;
use crate::ports::data_port::DataHandler;
use crate::ports::portfolio_port::PortfolioHandler;

pub const DEFAULT_POSITION_SIZE: f64 = 0.25;

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    initial_cash: f64,
    cash: f64,
    position_size: f64,
    allow_shorting: bool,
    positions: HashMap<String, Position>,
    last_prices: HashMap<String, f64>,
}

impl Portfolio {
    pub fn new(initial_cash: f64) -> Self {
        Portfolio {
            initial_cash,
            cash: initial_cash,
            position_size: DEFAULT_POSITION_SIZE,
            allow_shorting: false,
            positions: HashMap::new(),
            last_prices: HashMap::new(),
        }
    }

    /// Fraction of cash committed to each new position.
    pub fn with_position_size(mut self, position_size: f64) -> Self {
        self.position_size = position_size;
        self
    }

    pub fn with_shorting(mut self, allow_shorting: bool) -> Self {
        self.allow_shorting = allow_shorting;
        self
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.last_prices.get(symbol).copied()
    }

    /// Open PnL of all holdings at their last known prices.
    pub fn unrealized_pnl(&self) -> f64 {
        self.positions
            .values()
            .map(|pos| pos.unrealized_pnl(self.mark(pos)))
            .sum()
    }

    fn mark(&self, pos: &Position) -> f64 {
        self.last_price(&pos.symbol).unwrap_or(pos.entry_price)
    }

    fn held(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).map_or(0, |p| p.quantity)
    }

    /// Whole shares for a new position at `price`, if any can be afforded.
    fn entry_quantity(&self, price: Option<f64>) -> Option<i64> {
        let price = price.filter(|p| *p > 0.0)?;
        let quantity = (self.cash * self.position_size / price).floor() as i64;
        (quantity > 0).then_some(quantity)
    }

    /// Applies a signed quantity change and returns the gross PnL realized by
    /// the part of it that reduced an existing position, if any did.
    fn apply_to_position(&mut self, fill: &FillEvent, signed: i64) -> Option<f64> {
        let symbol = fill.symbol();
        let price = fill.price();
        let Some(current) = self.positions.get(symbol).cloned() else {
            self.positions.insert(
                symbol.to_string(),
                Position {
                    symbol: symbol.to_string(),
                    quantity: signed,
                    entry_price: price,
                    entry_time: fill.timestamp(),
                },
            );
            return None;
        };

        if current.quantity.signum() == signed.signum() {
            let total = current.quantity + signed;
            let entry_price = (current.entry_price * current.quantity.unsigned_abs() as f64
                + price * signed.unsigned_abs() as f64)
                / total.unsigned_abs() as f64;
            self.positions.insert(
                symbol.to_string(),
                Position {
                    quantity: total,
                    entry_price,
                    ..current
                },
            );
            return None;
        }

        let closed = signed.unsigned_abs().min(current.quantity.unsigned_abs()) as f64;
        let direction = current.quantity.signum() as f64;
        let gross = closed * (price - current.entry_price) * direction;
        let remaining = current.quantity + signed;

        if remaining == 0 {
            self.positions.remove(symbol);
        } else if remaining.signum() == current.quantity.signum() {
            self.positions.insert(
                symbol.to_string(),
                Position {
                    quantity: remaining,
                    ..current
                },
            );
        } else {
            self.positions.insert(
                symbol.to_string(),
                Position {
                    symbol: symbol.to_string(),
                    quantity: remaining,
                    entry_price: price,
                    entry_time: fill.timestamp(),
                },
            );
        }
        Some(gross)
    }
}

impl PortfolioHandler for Portfolio {
    fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    fn set_cash(&mut self, cash: f64) {
        self.cash = cash;
    }

    fn cash(&self) -> f64 {
        self.cash
    }

    fn value(&self) -> f64 {
        let holdings: f64 = self
            .positions
            .values()
            .map(|pos| pos.market_value(self.mark(pos)))
            .sum();
        self.cash + holdings
    }

    fn update(&mut self, event: &DataEvent) {
        self.last_prices.insert(event.symbol.clone(), event.close);
    }

    fn on_signal(
        &mut self,
        signal: &SignalEvent,
        data: &dyn DataHandler,
    ) -> HandlerResult<OrderEvent> {
        let symbol = signal.symbol();
        let held = self.held(symbol);
        let price = data
            .latest(symbol)
            .map(|bar| bar.close)
            .or_else(|| self.last_price(symbol));

        let sized = match (signal.direction(), held.cmp(&0)) {
            (Direction::Hold, _) => None,
            (Direction::Buy, Ordering::Equal) => {
                self.entry_quantity(price).map(|q| (Direction::Buy, q))
            }
            (Direction::Buy, Ordering::Greater) => None,
            (Direction::Buy, Ordering::Less) => Some((Direction::Buy, -held)),
            (Direction::Sell, Ordering::Greater) => Some((Direction::Sell, held)),
            (Direction::Sell, Ordering::Equal) if self.allow_shorting => {
                self.entry_quantity(price).map(|q| (Direction::Sell, q))
            }
            (Direction::Sell, _) => None,
            (Direction::Exit, Ordering::Greater) => Some((Direction::Sell, held)),
            (Direction::Exit, Ordering::Less) => Some((Direction::Buy, -held)),
            (Direction::Exit, Ordering::Equal) => None,
        };

        match sized {
            Some((direction, quantity)) => Ok(Some(OrderEvent::from_signal(
                signal, direction, quantity,
            ))),
            None => {
                debug!(symbol, direction = %signal.direction(), held, "signal not actionable");
                Ok(None)
            }
        }
    }

    fn on_fill(&mut self, fill: &FillEvent, _data: &dyn DataHandler) -> HandlerResult<Transaction> {
        let signed = match fill.direction() {
            Direction::Buy => fill.quantity(),
            Direction::Sell => -fill.quantity(),
            Direction::Hold | Direction::Exit => return Ok(None),
        };
        if signed == 0 {
            return Ok(None);
        }
        if signed > 0 && fill.cost() > self.cash {
            debug!(
                symbol = fill.symbol(),
                cost = fill.cost(),
                cash = self.cash,
                "insufficient cash"
            );
            return Ok(None);
        }

        if signed > 0 {
            self.cash -= fill.cost();
        } else {
            self.cash += fill.value() - fill.commission();
        }
        let realized_pnl = self
            .apply_to_position(fill, signed)
            .map_or(0.0, |gross| gross - fill.commission());

        Ok(Some(Transaction {
            symbol: fill.symbol().to_string(),
            timestamp: fill.timestamp(),
            direction: fill.direction(),
            quantity: fill.quantity(),
            price: fill.price(),
            commission: fill.commission(),
            realized_pnl,
            cash_after: self.cash,
        }))
    }
}
