//! Event model for the replay loop.
//!
//! Four event kinds form a strict causal chain: Data -> Signal -> Order -> Fill.
//! Each successor can only be built from its predecessor, so a `FillEvent`
//! always traces back to exactly one `OrderEvent`, and so on up to the bar.

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Buy,
    Sell,
    Hold,
    Exit,
}

impl Direction {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "buy" | "long" => Some(Direction::Buy),
            "sell" | "short" => Some(Direction::Sell),
            "hold" => Some(Direction::Hold),
            "exit" => Some(Direction::Exit),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
            Direction::Hold => "hold",
            Direction::Exit => "exit",
        };
        f.write_str(s)
    }
}

/// One OHLCV bar for a symbol, wrapped as the head of the event chain.
#[derive(Debug, Clone, PartialEq)]
pub struct DataEvent {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A directional intention derived from one bar.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEvent {
    symbol: String,
    timestamp: NaiveDateTime,
    direction: Direction,
}

impl SignalEvent {
    pub fn from_data(data: &DataEvent, direction: Direction) -> Self {
        Self {
            symbol: data.symbol.clone(),
            timestamp: data.timestamp,
            direction,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// A sized instruction to trade, produced by the portfolio from a signal.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvent {
    symbol: String,
    timestamp: NaiveDateTime,
    direction: Direction,
    quantity: i64,
}

impl OrderEvent {
    /// `quantity` is the unsigned share count; `direction` says which way.
    pub fn from_signal(signal: &SignalEvent, direction: Direction, quantity: i64) -> Self {
        Self {
            symbol: signal.symbol.clone(),
            timestamp: signal.timestamp,
            direction,
            quantity: quantity.abs(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }
}

/// The realized execution of an order.
#[derive(Debug, Clone, PartialEq)]
pub struct FillEvent {
    symbol: String,
    timestamp: NaiveDateTime,
    direction: Direction,
    quantity: i64,
    price: f64,
    commission: f64,
}

impl FillEvent {
    pub fn from_order(order: &OrderEvent, price: f64, commission: f64) -> Self {
        Self {
            symbol: order.symbol.clone(),
            timestamp: order.timestamp,
            direction: order.direction,
            quantity: order.quantity,
            price,
            commission,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn commission(&self) -> f64 {
        self.commission
    }

    /// quantity * price, before commission
    pub fn value(&self) -> f64 {
        self.quantity as f64 * self.price
    }

    /// Total cash impact magnitude: value plus commission.
    pub fn cost(&self) -> f64 {
        self.value() + self.commission
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Data(DataEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Data,
    Signal,
    Order,
    Fill,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Data => "data",
            EventKind::Signal => "signal",
            EventKind::Order => "order",
            EventKind::Fill => "fill",
        };
        f.write_str(s)
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Data(_) => EventKind::Data,
            Event::Signal(_) => EventKind::Signal,
            Event::Order(_) => EventKind::Order,
            Event::Fill(_) => EventKind::Fill,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Event::Data(e) => &e.symbol,
            Event::Signal(e) => e.symbol(),
            Event::Order(e) => e.symbol(),
            Event::Fill(e) => e.symbol(),
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            Event::Data(e) => e.timestamp,
            Event::Signal(e) => e.timestamp(),
            Event::Order(e) => e.timestamp(),
            Event::Fill(e) => e.timestamp(),
        }
    }
}

impl From<DataEvent> for Event {
    fn from(e: DataEvent) -> Self {
        Event::Data(e)
    }
}

impl From<SignalEvent> for Event {
    fn from(e: SignalEvent) -> Self {
        Event::Signal(e)
    }
}

impl From<OrderEvent> for Event {
    fn from(e: OrderEvent) -> Self {
        Event::Order(e)
    }
}

impl From<FillEvent> for Event {
    fn from(e: FillEvent) -> Self {
        Event::Fill(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_bar() -> DataEvent {
        DataEvent {
            symbol: "BHP".into(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn chain_carries_symbol_and_timestamp() {
        let bar = sample_bar();
        let signal = SignalEvent::from_data(&bar, Direction::Buy);
        let order = OrderEvent::from_signal(&signal, Direction::Buy, 10);
        let fill = FillEvent::from_order(&order, 105.5, 1.0);

        assert_eq!(fill.symbol(), "BHP");
        assert_eq!(fill.timestamp(), bar.timestamp);
        assert_eq!(fill.direction(), Direction::Buy);
        assert_eq!(fill.quantity(), 10);
        assert!((fill.value() - 1055.0).abs() < 1e-9);
        assert!((fill.cost() - 1056.0).abs() < 1e-9);
    }

    #[test]
    fn order_quantity_is_unsigned() {
        let bar = sample_bar();
        let signal = SignalEvent::from_data(&bar, Direction::Sell);
        let order = OrderEvent::from_signal(&signal, Direction::Sell, -25);
        assert_eq!(order.quantity(), 25);
    }

    #[test]
    fn event_kind_and_accessors() {
        let bar = sample_bar();
        let signal = SignalEvent::from_data(&bar, Direction::Exit);
        let events: Vec<Event> = vec![bar.clone().into(), signal.into()];
        assert_eq!(events[0].kind(), EventKind::Data);
        assert_eq!(events[1].kind(), EventKind::Signal);
        assert!(events.iter().all(|e| e.symbol() == "BHP"));
        assert!(events.iter().all(|e| e.timestamp() == bar.timestamp));
    }

    #[test]
    fn direction_parse() {
        assert_eq!(Direction::parse("buy"), Some(Direction::Buy));
        assert_eq!(Direction::parse(" SELL "), Some(Direction::Sell));
        assert_eq!(Direction::parse("exit"), Some(Direction::Exit));
        assert_eq!(Direction::parse("hold"), Some(Direction::Hold));
        assert_eq!(Direction::parse("sideways"), None);
    }

    #[test]
    fn direction_display_round_trips() {
        for d in [Direction::Buy, Direction::Sell, Direction::Hold, Direction::Exit] {
            assert_eq!(Direction::parse(&d.to_string()), Some(d));
        }
    }
}
