//! Run statistics: event history, transactions, equity curve and summary.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use super::event::{DataEvent, Event, EventKind};
use super::position::Transaction;
use crate::ports::portfolio_port::PortfolioHandler;
use crate::ports::statistic_port::StatisticHandler;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub initial_equity: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    /// Longest run of equity points spent below the running peak.
    pub max_drawdown_duration: usize,
    pub fills: usize,
    pub realized_pnl: f64,
    pub commissions: f64,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub events: BTreeMap<EventKind, usize>,
}

impl Summary {
    pub fn event_count(&self, kind: EventKind) -> usize {
        self.events.get(&kind).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Statistics {
    events: Vec<Event>,
    transactions: Vec<Transaction>,
    equity_curve: Vec<EquityPoint>,
    initial_equity: Option<f64>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> Summary {
        let first = self.equity_curve.first().map(|p| p.equity);
        let initial_equity = self.initial_equity.or(first).unwrap_or(0.0);
        let final_equity = self
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_equity);

        let total_return = if initial_equity > 0.0 {
            (final_equity - initial_equity) / initial_equity
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&self.equity_curve);

        let mut events = BTreeMap::new();
        for event in &self.events {
            *events.entry(event.kind()).or_insert(0) += 1;
        }

        let closing = self.transactions.iter().filter(|t| t.realized_pnl != 0.0);
        let (winning_trades, losing_trades) =
            closing.fold((0, 0), |(won, lost), t| match t.realized_pnl > 0.0 {
                true => (won + 1, lost),
                false => (won, lost + 1),
            });

        Summary {
            initial_equity,
            final_equity,
            total_return,
            max_drawdown,
            max_drawdown_duration,
            fills: self.transactions.len(),
            realized_pnl: self.transactions.iter().map(|t| t.realized_pnl).sum(),
            commissions: self.transactions.iter().map(|t| t.commission).sum(),
            winning_trades,
            losing_trades,
            events,
        }
    }
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            max_dd = max_dd.max(dd);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}

impl StatisticHandler for Statistics {
    fn track_event(&mut self, event: Event) {
        self.events.push(event);
    }

    fn update(&mut self, event: &DataEvent, portfolio: &dyn PortfolioHandler) {
        if self.initial_equity.is_none() {
            self.initial_equity = Some(portfolio.initial_cash());
        }
        self.equity_curve.push(EquityPoint {
            timestamp: event.timestamp,
            equity: portfolio.value(),
        });
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
        let summary = self.summary();
        eprintln!("\n=== Backtest Results ===");
        eprintln!("Initial Equity:   {:.2}", summary.initial_equity);
        eprintln!("Final Equity:     {:.2}", summary.final_equity);
        eprintln!("Total Return:     {:.2}%", summary.total_return * 100.0);
        eprintln!("Max Drawdown:     -{:.1}%", summary.max_drawdown * 100.0);
        eprintln!("Fills:            {}", summary.fills);
        eprintln!(
            "Closed Trades:    {} won / {} lost",
            summary.winning_trades, summary.losing_trades
        );
        eprintln!("Realized PnL:     {:.2}", summary.realized_pnl);
        eprintln!("Commissions:      {:.2}", summary.commissions);
        eprintln!("\n=== Events ===");
        for (kind, count) in &summary.events {
            eprintln!("  {:<8} {}", kind, count);
        }
    }
}
