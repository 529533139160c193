//! Configuration validation.
//!
//! Checks the `[backtest]` section and the strategy section tree before a
//! run is wired up, so a bad file fails with a config error instead of
//! half way through the replay.

use crate::domain::error::ReplayError;
use crate::domain::event::Direction;
use crate::domain::rule::Rule;
use crate::domain::rule_parser;
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;

/// Section holding the root strategy.
pub const ROOT_STRATEGY_SECTION: &str = "strategy";

/// Deepest allowed strategy nesting, counting the root as 1.
pub const MAX_STRATEGY_DEPTH: usize = 8;

/// Starting cash when `[backtest]` has no `initial_cash`.
pub const DEFAULT_INITIAL_CASH: f64 = 100_000.0;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    validate_initial_cash(config)?;
    validate_commission(config)?;
    validate_slippage(config)?;
    validate_position_size(config)?;
    validate_symbols(config, "backtest")?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    if !config.has_section(ROOT_STRATEGY_SECTION) {
        return Err(ReplayError::ConfigMissing {
            section: ROOT_STRATEGY_SECTION.to_string(),
            key: "name".to_string(),
        });
    }
    validate_strategy_section(config, ROOT_STRATEGY_SECTION, 1)
}

/// Child section names listed under `children`, lowercased the way the INI
/// reader stores section names.
pub fn child_sections(config: &dyn ConfigPort, section: &str) -> Vec<String> {
    config
        .get_string(section, "children")
        .map(|list| {
            list.split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Optional `run_every` of a strategy section; a present value must be a
/// positive integer.
pub fn parse_run_every(config: &dyn ConfigPort, section: &str) -> Result<Option<usize>, ReplayError> {
    let Some(raw) = non_empty(config, section, "run_every") else {
        return Ok(None);
    };
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ReplayError::invalid(
            section,
            "run_every",
            format!("run_every must be a positive integer, got '{raw}'"),
        )),
    }
}

pub fn parse_direction(config: &dyn ConfigPort, section: &str) -> Result<Option<Direction>, ReplayError> {
    let Some(raw) = non_empty(config, section, "direction") else {
        return Ok(None);
    };
    Direction::parse(&raw).map(Some).ok_or_else(|| {
        ReplayError::invalid(
            section,
            "direction",
            format!("unknown direction '{raw}' (expected buy, sell, hold or exit)"),
        )
    })
}

/// Optional `rule` of a strategy section, parsed and checked.
pub fn parse_rule(config: &dyn ConfigPort, section: &str) -> Result<Option<Rule>, ReplayError> {
    let Some(raw) = non_empty(config, section, "rule") else {
        return Ok(None);
    };
    let rule = rule_parser::parse(&raw)?;
    check_rule(&rule)?;
    Ok(Some(rule))
}

/// Rejects rules that parse but can never hold.
pub fn check_rule(rule: &Rule) -> Result<(), ReplayError> {
    match rule {
        Rule::Between { lower, upper, .. } if lower > upper => Err(ReplayError::RuleInvalid {
            reason: format!("BETWEEN lower bound {lower} exceeds upper bound {upper}"),
        }),
        Rule::And(rules) | Rule::Or(rules) => rules.iter().try_for_each(check_rule),
        Rule::Not(inner) => check_rule(inner),
        Rule::Consecutive { rule, .. } | Rule::AnyOf { rule, .. } => check_rule(rule),
        _ => Ok(()),
    }
}

/// Optional symbol list of `section`, parsed and uppercased.
pub fn parse_symbol_key(config: &dyn ConfigPort, section: &str) -> Result<Option<Vec<String>>, ReplayError> {
    let Some(raw) = non_empty(config, section, "symbols") else {
        return Ok(None);
    };
    parse_symbols(&raw)
        .map(Some)
        .map_err(|e| ReplayError::invalid(section, "symbols", e.to_string()))
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    let value = config.get_double("backtest", "initial_cash", DEFAULT_INITIAL_CASH);
    if value <= 0.0 {
        return Err(ReplayError::invalid(
            "backtest",
            "initial_cash",
            "initial_cash must be positive",
        ));
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    for key in ["commission_per_trade", "commission_pct"] {
        if config.get_double("backtest", key, 0.0) < 0.0 {
            return Err(ReplayError::invalid(
                "backtest",
                key,
                format!("{key} must be non-negative"),
            ));
        }
    }
    Ok(())
}

fn validate_slippage(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    let value = config.get_double("backtest", "slippage_pct", 0.0);
    if value < 0.0 {
        return Err(ReplayError::invalid(
            "backtest",
            "slippage_pct",
            "slippage_pct must be non-negative",
        ));
    }
    Ok(())
}

fn validate_position_size(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    let value = config.get_double(
        "backtest",
        "position_size",
        crate::domain::portfolio::DEFAULT_POSITION_SIZE,
    );
    if value <= 0.0 || value > 1.0 {
        return Err(ReplayError::invalid(
            "backtest",
            "position_size",
            "position_size must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_symbols(config: &dyn ConfigPort, section: &str) -> Result<(), ReplayError> {
    match parse_symbol_key(config, section)? {
        Some(_) => Ok(()),
        None => Err(ReplayError::ConfigMissing {
            section: section.to_string(),
            key: "symbols".to_string(),
        }),
    }
}

fn validate_strategy_section(
    config: &dyn ConfigPort,
    section: &str,
    depth: usize,
) -> Result<(), ReplayError> {
    if depth > MAX_STRATEGY_DEPTH {
        return Err(ReplayError::invalid(
            section,
            "children",
            format!("strategies nest deeper than {MAX_STRATEGY_DEPTH} levels"),
        ));
    }

    parse_rule(config, section)?;
    parse_direction(config, section)?;
    parse_run_every(config, section)?;
    parse_symbol_key(config, section)?;

    for child in child_sections(config, section) {
        if !config.has_section(&child) {
            return Err(ReplayError::invalid(
                section,
                "children",
                format!("no section [{child}]"),
            ));
        }
        validate_strategy_section(config, &child, depth + 1)?;
    }
    Ok(())
}
