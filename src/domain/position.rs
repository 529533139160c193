//! Open holdings and settled transactions.

use chrono::NaiveDateTime;

use super::event::Direction;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    /// Signed share count: positive is long, negative is short.
    pub quantity: i64,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    /// Signed: a short is a liability.
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.entry_price)
    }
}

/// A fill after the portfolio has settled it against cash and holdings.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub direction: Direction,
    pub quantity: i64,
    pub price: f64,
    pub commission: f64,
    /// PnL realized by this transaction, net of its own commission.
    /// Zero for transactions that only open exposure.
    pub realized_pnl: f64,
    pub cash_after: f64,
}
