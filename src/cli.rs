//! Command line entry points and the wiring of a run from a config file.

use clap::{Parser, Subcommand};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::algo::{Algo, RuleAlgo, RunEvery, SignalAlgo};
use crate::domain::backtest::{Backtest, BacktestConfig};
use crate::domain::config_validation::{
    DEFAULT_INITIAL_CASH, MAX_STRATEGY_DEPTH, ROOT_STRATEGY_SECTION, child_sections,
    parse_direction, parse_rule, parse_run_every, parse_symbol_key, validate_backtest_config,
    validate_strategy_config,
};
use crate::domain::error::ReplayError;
use crate::domain::execution::SimulatedExchange;
use crate::domain::feed::BarFeed;
use crate::domain::node::Asset;
use crate::domain::portfolio::DEFAULT_POSITION_SIZE;
use crate::domain::rule_parser;
use crate::domain::statistics::Statistics;
use crate::domain::strategy::Strategy;
use crate::domain::universe::{load_universe, parse_symbols};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{BarSource, SharedData};
use crate::ports::portfolio_port::{PortfolioHandler, SharedPortfolio};

#[derive(Parser, Debug)]
#[command(name = "replaytrader", about = "Event-driven backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma separated symbols, replacing [backtest] symbols
        #[arg(long)]
        symbols: Option<String>,
    },
    /// Validate a configuration and print the strategy tree
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run { config, symbols } => run_backtest(&config, symbols.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn report(err: ReplayError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

fn run_backtest(config_path: &Path, symbols_override: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let prepared = validate_backtest_config(&config)
        .and_then(|()| validate_strategy_config(&config))
        .and_then(|()| build_backtest_config(&config))
        .and_then(|mut bt_config| {
            if let Some(symbols) = resolve_symbols(symbols_override)? {
                bt_config.symbols = symbols;
            }
            Ok((bt_config, build_strategy(&config)?))
        });
    let (bt_config, strategy) = match prepared {
        Ok(p) => p,
        Err(e) => return report(e),
    };

    let source = CsvAdapter::new(bt_config.data_dir.clone());
    match run_backtest_pipeline(&source, strategy, &bt_config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => report(e),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let checked = validate_backtest_config(&config)
        .and_then(|()| validate_strategy_config(&config))
        .and_then(|()| build_backtest_config(&config))
        .and_then(|bt_config| Ok((bt_config, build_strategy(&config)?)));
    let (bt_config, strategy) = match checked {
        Ok(c) => c,
        Err(ReplayError::RuleParse(e)) => {
            let raw = first_bad_rule(&config).unwrap_or_default();
            eprintln!("error: {}", e.display_with_context(&raw));
            return (&ReplayError::RuleParse(e)).into();
        }
        Err(e) => return report(e),
    };

    eprintln!("\nSymbols: {}", bt_config.symbols.join(", "));
    eprintln!("\nStrategy tree:");
    eprint!("{}", strategy.outline());
    for symbol in &bt_config.symbols {
        if !strategy.contains(symbol) {
            eprintln!("warning: {symbol} is not held by any strategy");
        }
    }

    eprintln!("\nConfiguration is valid");
    ExitCode::SUCCESS
}

// The rule text of the first strategy section that fails to parse.
fn first_bad_rule(config: &dyn ConfigPort) -> Option<String> {
    let mut pending = vec![(ROOT_STRATEGY_SECTION.to_string(), 1)];
    while let Some((section, depth)) = pending.pop() {
        if let Some(raw) = config.get_string(&section, "rule") {
            if rule_parser::parse(raw.trim()).is_err() {
                return Some(raw.trim().to_string());
            }
        }
        if depth < MAX_STRATEGY_DEPTH {
            let children = child_sections(config, &section);
            pending.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
        }
    }
    None
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, ReplayError> {
    let data_dir = adapter
        .get_string("backtest", "data_dir")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "data".to_string());

    Ok(BacktestConfig {
        data_dir: PathBuf::from(data_dir),
        symbols: parse_symbol_key(adapter, "backtest")?.unwrap_or_default(),
        initial_cash: adapter.get_double("backtest", "initial_cash", DEFAULT_INITIAL_CASH),
        commission_per_trade: adapter.get_double("backtest", "commission_per_trade", 0.0),
        commission_pct: adapter.get_double("backtest", "commission_pct", 0.0),
        slippage_pct: adapter.get_double("backtest", "slippage_pct", 0.0),
        position_size: adapter.get_double("backtest", "position_size", DEFAULT_POSITION_SIZE),
        allow_shorting: adapter.get_bool("backtest", "allow_shorting", false),
    })
}

/// Symbols given on the command line, if any.
pub fn resolve_symbols(symbols_override: Option<&str>) -> Result<Option<Vec<String>>, ReplayError> {
    symbols_override
        .map(|raw| parse_symbols(raw).map_err(|e| ReplayError::invalid("cli", "symbols", e.to_string())))
        .transpose()
}

/// Builds the strategy tree rooted at `[strategy]`.
pub fn build_strategy(adapter: &dyn ConfigPort) -> Result<Strategy, ReplayError> {
    if !adapter.has_section(ROOT_STRATEGY_SECTION) {
        return Err(ReplayError::ConfigMissing {
            section: ROOT_STRATEGY_SECTION.to_string(),
            key: "name".to_string(),
        });
    }
    build_strategy_section(adapter, ROOT_STRATEGY_SECTION, 1)
}

fn build_strategy_section(
    adapter: &dyn ConfigPort,
    section: &str,
    depth: usize,
) -> Result<Strategy, ReplayError> {
    if depth > MAX_STRATEGY_DEPTH {
        return Err(ReplayError::invalid(
            section,
            "children",
            format!("strategies nest deeper than {MAX_STRATEGY_DEPTH} levels"),
        ));
    }

    let name = adapter
        .get_string(section, "name")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| section.to_string());
    let mut strategy = Strategy::new(name);

    // Timing first, then the gate, then the direction it signals.
    let mut algos: Vec<Box<dyn Algo>> = Vec::new();
    if let Some(every) = parse_run_every(adapter, section)? {
        algos.push(Box::new(RunEvery::new(every)));
    }
    if let Some(rule) = parse_rule(adapter, section)? {
        algos.push(Box::new(RuleAlgo::new(rule)));
    }
    if let Some(direction) = parse_direction(adapter, section)? {
        algos.push(Box::new(SignalAlgo::new(direction)));
    }
    strategy.set_algo(algos);

    for symbol in parse_symbol_key(adapter, section)?.unwrap_or_default() {
        strategy.add_asset(Asset::new(symbol));
    }

    for child in child_sections(adapter, section) {
        if !adapter.has_section(&child) {
            return Err(ReplayError::invalid(
                section,
                "children",
                format!("no section [{child}]"),
            ));
        }
        strategy.add_strategy(build_strategy_section(adapter, &child, depth + 1)?);
    }

    Ok(strategy)
}

/// Loads the universe, wires the engine and runs it to completion.
///
/// Symbols without bars are skipped. The finished engine is returned so
/// its statistics can be inspected.
pub fn run_backtest_pipeline(
    source: &dyn BarSource,
    strategy: Strategy,
    bt_config: &BacktestConfig,
) -> Result<Backtest, ReplayError> {
    let universe = load_universe(source, &bt_config.symbols)?;
    for symbol in &universe.symbols {
        if !strategy.contains(symbol) {
            warn!(symbol = %symbol, "symbol is not held by any strategy");
        }
    }

    let feed = BarFeed::new(universe.bars);
    info!(
        symbols = universe.symbols.len(),
        skipped = universe.skipped.len(),
        bars = feed.len(),
        strategy = strategy.name(),
        "universe loaded"
    );

    let portfolio = Rc::new(RefCell::new(bt_config.portfolio()));
    let data: SharedData = Rc::new(RefCell::new(feed));
    let shared: SharedPortfolio = portfolio.clone();

    let mut backtest = Backtest::new();
    backtest
        .set_symbols(universe.symbols)
        .set_data(data)
        .set_strategy(strategy)
        .set_portfolio(shared)
        .set_exchange(SimulatedExchange::new(bt_config.execution()))
        .set_statistic(Statistics::new());
    backtest.run()?;

    let closing = portfolio.borrow();
    info!(
        cash = closing.cash(),
        value = closing.value(),
        open_positions = closing.position_count(),
        unrealized_pnl = closing.unrealized_pnl(),
        "portfolio at close"
    );
    drop(closing);
    Ok(backtest)
}
