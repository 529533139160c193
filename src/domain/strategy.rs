//! Strategy composition tree.
//!
//! A `Strategy` is a composite node: it owns its algo stack and its children
//! (sub-strategies and assets) and holds shared handles to the run's data
//! provider and portfolio. Evaluating a bar walks from the root down to the
//! strategy that lists the bar's symbol as an asset; every stack on that path
//! has to pass.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::algo::{Algo, AlgoContext};
use super::algo_stack::AlgoStack;
use super::error::ReplayError;
use super::event::{DataEvent, Direction, SignalEvent};
use super::node::{Asset, Member, Node};
use crate::ports::HandlerResult;
use crate::ports::data_port::{DataHandler, SharedData};
use crate::ports::portfolio_port::{PortfolioHandler, SharedPortfolio};
use crate::ports::strategy_port::StrategyHandler;

pub struct Strategy {
    node: Node,
    algos: AlgoStack,
    data: Option<SharedData>,
    portfolio: Option<SharedPortfolio>,
}

impl Strategy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            node: Node::new(name, true),
            algos: AlgoStack::new(),
            data: None,
            portfolio: None,
        }
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn is_root(&self) -> bool {
        self.node.is_root()
    }

    pub fn children(&self) -> &[Member] {
        self.node.children()
    }

    pub fn algos(&self) -> &AlgoStack {
        &self.algos
    }

    pub fn data(&self) -> Option<&SharedData> {
        self.data.as_ref()
    }

    pub fn portfolio(&self) -> Option<&SharedPortfolio> {
        self.portfolio.as_ref()
    }

    /// Appends `algos` to this strategy's own stack, in order.
    pub fn set_algo(&mut self, algos: Vec<Box<dyn Algo>>) -> &mut Self {
        self.algos.extend(algos);
        self
    }

    pub fn add_strategy(&mut self, mut child: Strategy) -> &mut Self {
        child.node.demote();
        self.node.push_child(Member::Strategy(child));
        self
    }

    pub fn add_asset(&mut self, asset: Asset) -> &mut Self {
        self.node.push_child(Member::Asset(asset));
        self
    }

    /// Sets the data handle here and on every descendant strategy.
    pub fn set_data(&mut self, data: SharedData) -> Result<(), ReplayError> {
        for child in self.child_strategies_mut() {
            child.set_data(Rc::clone(&data))?;
        }
        self.data = Some(data);
        Ok(())
    }

    /// Sets the portfolio handle here and on every descendant strategy.
    pub fn set_portfolio(&mut self, portfolio: SharedPortfolio) -> Result<(), ReplayError> {
        for child in self.child_strategies_mut() {
            child.set_portfolio(Rc::clone(&portfolio))?;
        }
        self.portfolio = Some(portfolio);
        Ok(())
    }

    /// Direct children that are strategies, in insertion order.
    pub fn strategies(&self) -> Option<Vec<&Strategy>> {
        let found: Vec<&Strategy> = self
            .node
            .children()
            .iter()
            .filter_map(Member::as_strategy)
            .collect();
        if found.is_empty() { None } else { Some(found) }
    }

    /// Direct children that are assets, in insertion order.
    pub fn assets(&self) -> Option<Vec<&Asset>> {
        let found: Vec<&Asset> = self
            .node
            .children()
            .iter()
            .filter_map(Member::as_asset)
            .collect();
        if found.is_empty() { None } else { Some(found) }
    }

    fn child_strategies_mut(&mut self) -> impl Iterator<Item = &mut Strategy> {
        self.node.children_mut().iter_mut().filter_map(|m| match m {
            Member::Strategy(s) => Some(s),
            Member::Asset(_) => None,
        })
    }

    fn holds_asset(&self, symbol: &str) -> bool {
        self.node
            .children()
            .iter()
            .any(|m| matches!(m, Member::Asset(a) if a.name() == symbol))
    }

    /// True if `symbol` is an asset anywhere in this subtree.
    pub fn contains(&self, symbol: &str) -> bool {
        self.node.children().iter().any(|m| match m {
            Member::Asset(a) => a.name() == symbol,
            Member::Strategy(s) => s.contains(symbol),
        })
    }

    /// Every asset symbol in the subtree, depth first, without duplicates.
    pub fn symbols(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut Vec<String>) {
        for member in self.node.children() {
            match member {
                Member::Asset(a) => {
                    if !out.iter().any(|s| s == a.name()) {
                        out.push(a.name().to_string());
                    }
                }
                Member::Strategy(s) => s.collect_symbols(out),
            }
        }
    }

    /// Runs the stacks on the path to the context's symbol and returns the
    /// chosen direction, if the whole path passed and one was chosen.
    ///
    /// Sub-strategies holding the symbol are tried in insertion order; the
    /// first one that yields a direction wins. A direct asset child takes
    /// precedence over sub-strategies.
    pub fn evaluate(&mut self, ctx: &mut AlgoContext<'_>) -> Option<Direction> {
        let symbol = ctx.symbol();
        if !self.contains(symbol) || !self.algos.run(ctx) {
            return None;
        }
        if self.holds_asset(symbol) {
            return ctx.direction();
        }

        let inherited = ctx.direction();
        for child in self.child_strategies_mut() {
            if !child.contains(symbol) {
                continue;
            }
            if let Some(direction) = child.evaluate(ctx) {
                return Some(direction);
            }
            ctx.restore_direction(inherited);
        }
        None
    }

    /// Indented rendering of the tree, one member per line.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(&mut out, 0);
        out
    }

    fn write_outline(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        out.push_str(&format!("{pad}{} ({} algos)\n", self.name(), self.algos.len()));
        for member in self.node.children() {
            match member {
                Member::Strategy(s) => s.write_outline(out, depth + 1),
                Member::Asset(a) => out.push_str(&format!("{pad}  - {}\n", a.name())),
            }
        }
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("node", &self.node)
            .field("algos", &self.algos)
            .field("data", &self.data.is_some())
            .field("portfolio", &self.portfolio.is_some())
            .finish()
    }
}

impl StrategyHandler for Strategy {
    fn calculate_signal(
        &mut self,
        event: &DataEvent,
        data: &dyn DataHandler,
        portfolio: &dyn PortfolioHandler,
    ) -> HandlerResult<SignalEvent> {
        let mut ctx = AlgoContext::new(event, data, portfolio);
        match self.evaluate(&mut ctx) {
            Some(direction) => {
                debug!(strategy = self.name(), symbol = %event.symbol, %direction, "signal");
                Ok(Some(SignalEvent::from_data(event, direction)))
            }
            None => Ok(None),
        }
    }

    fn attach(&mut self, data: &SharedData, portfolio: &SharedPortfolio) -> Result<(), ReplayError> {
        self.set_data(Rc::clone(data))?;
        self.set_portfolio(Rc::clone(portfolio))
    }
}
