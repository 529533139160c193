#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use replaytrader::domain::error::ReplayError;
use replaytrader::domain::event::{
    DataEvent, Direction, Event, EventKind, FillEvent, OrderEvent, SignalEvent,
};
use replaytrader::domain::feed::BarFeed;
use replaytrader::domain::position::Transaction;
use replaytrader::ports::HandlerResult;
use replaytrader::ports::data_port::{BarSource, DataHandler, SharedData};
use replaytrader::ports::execution_port::ExchangeHandler;
use replaytrader::ports::portfolio_port::{PortfolioHandler, SharedPortfolio};
use replaytrader::ports::statistic_port::StatisticHandler;
use replaytrader::ports::strategy_port::StrategyHandler;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Handler calls in the order they happened, e.g. `"strategy BHP"`.
pub type CallLog = Rc<RefCell<Vec<String>>>;

pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn ts(date: &str) -> NaiveDateTime {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_bar(symbol: &str, date: &str, close: f64) -> DataEvent {
    DataEvent {
        symbol: symbol.to_string(),
        timestamp: ts(date),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 10_000.0,
    }
}

/// Consecutive daily bars from 2024-01-01 with the given closes.
pub fn daily_bars(symbol: &str, closes: &[f64]) -> Vec<DataEvent> {
    let start = ts("2024-01-01");
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| DataEvent {
            timestamp: start + chrono::Duration::days(i as i64),
            ..make_bar(symbol, "2024-01-01", close)
        })
        .collect()
}

pub fn shared_feed(bars: Vec<DataEvent>) -> SharedData {
    Rc::new(RefCell::new(BarFeed::new(bars)))
}

pub fn kinds(events: &[Event]) -> Vec<EventKind> {
    events.iter().map(Event::kind).collect()
}

pub struct MockSource {
    pub data: HashMap<String, Vec<DataEvent>>,
    pub errors: HashMap<String, String>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<DataEvent>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl BarSource for MockSource {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<DataEvent>, ReplayError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(ReplayError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }
}

/// Signals `direction` for every bar. Fails on the `fail_on`-th call (1-based).
pub struct MockStrategy {
    pub log: CallLog,
    pub direction: Direction,
    pub fail_on: Option<usize>,
    pub calls: usize,
    pub attached: Rc<Cell<bool>>,
}

impl MockStrategy {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: Rc::clone(log),
            direction: Direction::Buy,
            fail_on: None,
            calls: 0,
            attached: Rc::new(Cell::new(false)),
        }
    }

    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on = Some(call);
        self
    }
}

impl StrategyHandler for MockStrategy {
    fn calculate_signal(
        &mut self,
        event: &DataEvent,
        _data: &dyn DataHandler,
        _portfolio: &dyn PortfolioHandler,
    ) -> HandlerResult<SignalEvent> {
        self.calls += 1;
        self.log.borrow_mut().push(format!("strategy {}", event.symbol));
        if self.fail_on == Some(self.calls) {
            return Err(ReplayError::handler("strategy", "scripted failure"));
        }
        Ok(Some(SignalEvent::from_data(event, self.direction)))
    }

    fn attach(&mut self, _data: &SharedData, _portfolio: &SharedPortfolio) -> Result<(), ReplayError> {
        self.attached.set(true);
        Ok(())
    }
}

/// Turns every signal into a one-share order and books every fill.
pub struct MockPortfolio {
    pub log: CallLog,
    pub initial_cash: f64,
    pub cash: f64,
}

impl MockPortfolio {
    pub fn shared(log: &CallLog, initial_cash: f64) -> Rc<RefCell<MockPortfolio>> {
        Rc::new(RefCell::new(MockPortfolio {
            log: Rc::clone(log),
            initial_cash,
            cash: 0.0,
        }))
    }
}

impl PortfolioHandler for MockPortfolio {
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
        self.cash
    }

    fn update(&mut self, event: &DataEvent) {
        self.log.borrow_mut().push(format!("update {}", event.symbol));
    }

    fn on_signal(&mut self, signal: &SignalEvent, _data: &dyn DataHandler) -> HandlerResult<OrderEvent> {
        self.log.borrow_mut().push(format!("signal {}", signal.symbol()));
        Ok(Some(OrderEvent::from_signal(signal, signal.direction(), 1)))
    }

    fn on_fill(&mut self, fill: &FillEvent, _data: &dyn DataHandler) -> HandlerResult<Transaction> {
        self.log.borrow_mut().push(format!("fill {}", fill.symbol()));
        self.cash -= fill.cost();
        Ok(Some(Transaction {
            symbol: fill.symbol().to_string(),
            timestamp: fill.timestamp(),
            direction: fill.direction(),
            quantity: fill.quantity(),
            price: fill.price(),
            commission: fill.commission(),
            realized_pnl: 0.0,
            cash_after: self.cash,
        }))
    }
}

/// Fills every order at a fixed price without commission.
pub struct MockExchange {
    pub log: CallLog,
    pub price: f64,
}

impl MockExchange {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: Rc::clone(log),
            price: 10.0,
        }
    }
}

impl ExchangeHandler for MockExchange {
    fn execute_order(&mut self, order: &OrderEvent, _data: &dyn DataHandler) -> HandlerResult<FillEvent> {
        self.log.borrow_mut().push(format!("order {}", order.symbol()));
        Ok(Some(FillEvent::from_order(order, self.price, 0.0)))
    }
}

/// Keeps everything it is handed and counts report calls.
pub struct RecordingStatistics {
    pub events: Vec<Event>,
    pub transactions: Vec<Transaction>,
    pub updates: usize,
    pub printed: Rc<Cell<usize>>,
}

impl RecordingStatistics {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            transactions: Vec::new(),
            updates: 0,
            printed: Rc::new(Cell::new(0)),
        }
    }
}

impl StatisticHandler for RecordingStatistics {
    fn track_event(&mut self, event: Event) {
        self.events.push(event);
    }

    fn update(&mut self, _event: &DataEvent, _portfolio: &dyn PortfolioHandler) {
        self.updates += 1;
    }

    fn track_transaction(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }

    fn events(&self) -> &[Event] {
        &self.events
    }

    fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    fn print_result(&self) {
        self.printed.set(self.printed.get() + 1);
    }
}
