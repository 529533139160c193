//! Single pass/fail decision units and the context they are evaluated in.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::domain::event::{DataEvent, Direction};
use crate::domain::moving_average::AverageCache;
use crate::domain::rule::Rule;
use crate::domain::rule_eval;
use crate::ports::data_port::DataHandler;
use crate::ports::portfolio_port::PortfolioHandler;

/// State an algo gets to look at for one asset on one bar.
///
/// The chosen direction is shared by every algo evaluated for the same
/// event, down the whole strategy path, so a later algo can override an
/// earlier choice.
pub struct AlgoContext<'a> {
    pub event: &'a DataEvent,
    pub data: &'a dyn DataHandler,
    pub portfolio: &'a dyn PortfolioHandler,
    direction: Option<Direction>,
}

impl<'a> AlgoContext<'a> {
    pub fn new(
        event: &'a DataEvent,
        data: &'a dyn DataHandler,
        portfolio: &'a dyn PortfolioHandler,
    ) -> Self {
        Self {
            event,
            data,
            portfolio,
            direction: None,
        }
    }

    pub fn symbol(&self) -> &'a str {
        &self.event.symbol
    }

    /// Bars seen so far for the current symbol, ending with the current one.
    pub fn history(&self) -> &'a [DataEvent] {
        let history = self.data.history(&self.event.symbol);
        match history.last() {
            Some(last) if last == self.event => history,
            _ => std::slice::from_ref(self.event),
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = Some(direction);
    }

    pub(crate) fn restore_direction(&mut self, direction: Option<Direction>) {
        self.direction = direction;
    }
}

pub trait Algo: fmt::Debug {
    fn run(&mut self, ctx: &mut AlgoContext<'_>) -> bool;
}

/// Passes on the first evaluation for each symbol only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOnce {
    ran: HashSet<String>,
}

impl RunOnce {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Algo for RunOnce {
    fn run(&mut self, ctx: &mut AlgoContext<'_>) -> bool {
        if self.ran.contains(ctx.symbol()) {
            return false;
        }
        self.ran.insert(ctx.symbol().to_string())
    }
}

/// Passes on every n-th evaluation of a symbol, starting with its first.
///
/// Each symbol keeps its own count, so assets sharing a strategy do not
/// consume each other's turns.
#[derive(Debug, Clone, PartialEq)]
pub struct RunEvery {
    every: usize,
    seen: HashMap<String, usize>,
}

impl RunEvery {
    /// A period of 0 is treated as 1.
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            seen: HashMap::new(),
        }
    }
}

impl Algo for RunEvery {
    fn run(&mut self, ctx: &mut AlgoContext<'_>) -> bool {
        let seen = self.seen.entry(ctx.symbol().to_string()).or_insert(0);
        let pass = *seen % self.every == 0;
        *seen += 1;
        pass
    }
}

/// Chooses the direction of the signal. Always passes.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalAlgo {
    direction: Direction,
}

impl SignalAlgo {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }
}

impl Algo for SignalAlgo {
    fn run(&mut self, ctx: &mut AlgoContext<'_>) -> bool {
        ctx.set_direction(self.direction);
        true
    }
}

/// Passes when `rule` holds on the latest bar of the symbol's history.
///
/// Moving averages are cached per symbol and extended bar by bar.
#[derive(Debug, Clone)]
pub struct RuleAlgo {
    rule: Rule,
    averages: HashMap<String, AverageCache>,
}

impl RuleAlgo {
    pub fn new(rule: Rule) -> Self {
        Self {
            rule,
            averages: HashMap::new(),
        }
    }
}

impl Algo for RuleAlgo {
    fn run(&mut self, ctx: &mut AlgoContext<'_>) -> bool {
        let history = ctx.history();
        let cache = self.averages.entry(ctx.symbol().to_string()).or_default();
        rule_eval::evaluate(&self.rule, history, history.len() - 1, cache)
    }
}
