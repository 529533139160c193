//! Backtest engine and event loop.
//!
//! The engine owns a FIFO queue of events and the five handlers of a run.
//! Bars are pulled from the data provider only when the queue is empty, so
//! every bar's full Data -> Signal -> Order -> Fill chain is processed before
//! the next bar enters.
//!
//! [`BacktestConfig`] holds the run parameters read from the config file.

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;

use tracing::{debug, error, info};

use super::error::ReplayError;
use super::event::Event;
use super::execution::ExecutionConfig;
use super::portfolio::Portfolio;
use crate::ports::data_port::SharedData;
use crate::ports::execution_port::ExchangeHandler;
use crate::ports::portfolio_port::SharedPortfolio;
use crate::ports::statistic_port::StatisticHandler;
use crate::ports::strategy_port::StrategyHandler;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub data_dir: PathBuf,
    pub symbols: Vec<String>,
    pub initial_cash: f64,
    pub commission_per_trade: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
    pub position_size: f64,
    pub allow_shorting: bool,
}

impl BacktestConfig {
    pub fn execution(&self) -> ExecutionConfig {
        ExecutionConfig {
            commission_per_trade: self.commission_per_trade,
            commission_pct: self.commission_pct,
            slippage_pct: self.slippage_pct,
        }
    }

    pub fn portfolio(&self) -> Portfolio {
        Portfolio::new(self.initial_cash)
            .with_position_size(self.position_size)
            .with_shorting(self.allow_shorting)
    }
}

#[derive(Default)]
pub struct Backtest {
    symbols: Vec<String>,
    data: Option<SharedData>,
    strategy: Option<Box<dyn StrategyHandler>>,
    portfolio: Option<SharedPortfolio>,
    exchange: Option<Box<dyn ExchangeHandler>>,
    statistic: Option<Box<dyn StatisticHandler>>,
    queue: VecDeque<Event>,
    processed: usize,
}

impl fmt::Debug for Backtest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backtest")
            .field("symbols", &self.symbols)
            .field("data", &self.data.is_some())
            .field("strategy", &self.strategy.is_some())
            .field("portfolio", &self.portfolio.is_some())
            .field("exchange", &self.exchange.is_some())
            .field("statistic", &self.statistic.is_some())
            .field("queued", &self.queue.len())
            .field("processed", &self.processed)
            .finish()
    }
}

/// Borrowed view of a fully wired engine, valid for one `run`.
struct Wiring<'a> {
    data: &'a SharedData,
    strategy: &'a mut dyn StrategyHandler,
    portfolio: &'a SharedPortfolio,
    exchange: &'a mut dyn ExchangeHandler,
    statistic: &'a mut dyn StatisticHandler,
}

impl Wiring<'_> {
    /// Runs the handler for `event` and returns its successor, if any.
    fn dispatch(&mut self, event: &Event) -> Result<Option<Event>, ReplayError> {
        match event {
            Event::Data(bar) => {
                self.portfolio.borrow_mut().update(bar);
                self.statistic.update(bar, &*self.portfolio.borrow());
                let signal = self.strategy.calculate_signal(
                    bar,
                    &*self.data.borrow(),
                    &*self.portfolio.borrow(),
                )?;
                Ok(signal.map(Event::Signal))
            }
            Event::Signal(signal) => {
                let order = self
                    .portfolio
                    .borrow_mut()
                    .on_signal(signal, &*self.data.borrow())?;
                Ok(order.map(Event::Order))
            }
            Event::Order(order) => {
                let fill = self.exchange.execute_order(order, &*self.data.borrow())?;
                Ok(fill.map(Event::Fill))
            }
            Event::Fill(fill) => {
                let transaction = self
                    .portfolio
                    .borrow_mut()
                    .on_fill(fill, &*self.data.borrow())?;
                if let Some(transaction) = transaction {
                    self.statistic.track_transaction(transaction);
                }
                Ok(None)
            }
        }
    }
}

impl Backtest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_symbols(&mut self, symbols: Vec<String>) -> &mut Self {
        self.symbols = symbols;
        self
    }

    pub fn set_data(&mut self, data: SharedData) -> &mut Self {
        self.data = Some(data);
        self
    }

    pub fn set_strategy(&mut self, strategy: impl StrategyHandler + 'static) -> &mut Self {
        self.strategy = Some(Box::new(strategy));
        self
    }

    pub fn set_portfolio(&mut self, portfolio: SharedPortfolio) -> &mut Self {
        self.portfolio = Some(portfolio);
        self
    }

    pub fn set_exchange(&mut self, exchange: impl ExchangeHandler + 'static) -> &mut Self {
        self.exchange = Some(Box::new(exchange));
        self
    }

    pub fn set_statistic(&mut self, statistic: impl StatisticHandler + 'static) -> &mut Self {
        self.statistic = Some(Box::new(statistic));
        self
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn statistic(&self) -> Option<&dyn StatisticHandler> {
        self.statistic.as_deref()
    }

    /// Events dispatched by the last `run`, successors included.
    pub fn events_processed(&self) -> usize {
        self.processed
    }

    /// Replays the whole data stream.
    ///
    /// Handler declines are skipped. The first handler error aborts the run:
    /// the failing event is not tracked and no final report is printed.
    pub fn run(&mut self) -> Result<(), ReplayError> {
        let Backtest {
            symbols,
            data,
            strategy,
            portfolio,
            exchange,
            statistic,
            queue,
            processed,
        } = self;

        let data = data
            .as_ref()
            .ok_or(ReplayError::MissingHandler { handler: "data" })?;
        let strategy = strategy
            .as_deref_mut()
            .ok_or(ReplayError::MissingHandler { handler: "strategy" })?;
        let portfolio = portfolio
            .as_ref()
            .ok_or(ReplayError::MissingHandler { handler: "portfolio" })?;
        let exchange = exchange
            .as_deref_mut()
            .ok_or(ReplayError::MissingHandler { handler: "exchange" })?;
        let statistic = statistic
            .as_deref_mut()
            .ok_or(ReplayError::MissingHandler { handler: "statistic" })?;
        if symbols.is_empty() {
            return Err(ReplayError::NoSymbols);
        }

        info!(symbols = symbols.len(), "running backtest");
        info!(events = data.borrow().stream().len(), "counting data events");

        {
            let mut portfolio = portfolio.borrow_mut();
            let cash = portfolio.initial_cash();
            portfolio.set_cash(cash);
        }
        strategy.attach(data, portfolio)?;

        let mut wiring = Wiring {
            data,
            strategy,
            portfolio,
            exchange,
            statistic,
        };
        *processed = 0;

        loop {
            let event = match queue.pop_front() {
                Some(event) => event,
                None => {
                    let next = wiring.data.borrow_mut().next_bar();
                    match next {
                        Some(bar) => {
                            queue.push_back(Event::Data(bar));
                            continue;
                        }
                        None => break,
                    }
                }
            };

            debug!(kind = %event.kind(), symbol = event.symbol(), "dispatching");
            match wiring.dispatch(&event) {
                Ok(Some(successor)) => queue.push_back(successor),
                Ok(None) => debug!(kind = %event.kind(), symbol = event.symbol(), "no successor"),
                Err(err) => {
                    error!(kind = %event.kind(), symbol = event.symbol(), error = %err, "handler failed");
                    queue.clear();
                    return Err(err);
                }
            }
            *processed += 1;
            wiring.statistic.track_event(event);
        }

        wiring.statistic.print_result();
        info!(
            tracked = wiring.statistic.events().len(),
            processed = *processed,
            "backtest finished"
        );
        Ok(())
    }
}
