//! Symbol universe of a run.
//!
//! Parses symbol lists from configuration and loads each symbol's bars,
//! skipping symbols that have none.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::domain::error::ReplayError;
use crate::domain::event::DataEvent;
use crate::ports::data_port::BarSource;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

/// Comma separated, trimmed and uppercased. Empty tokens and duplicates are
/// rejected.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone)]
pub struct Universe {
    pub symbols: Vec<String>,
    /// Bars of every loaded symbol, in symbol order.
    pub bars: Vec<DataEvent>,
    pub skipped: Vec<SkippedSymbol>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

/// Fetches every symbol. Symbols that fail or have no bars are skipped with
/// a warning; it is an error only when none are left.
pub fn load_universe(source: &dyn BarSource, symbols: &[String]) -> Result<Universe, ReplayError> {
    let mut loaded = Vec::new();
    let mut bars = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        let reason = match source.fetch_bars(symbol) {
            Ok(fetched) if !fetched.is_empty() => {
                info!(symbol = %symbol, bars = fetched.len(), "loaded");
                loaded.push(symbol.clone());
                bars.extend(fetched);
                continue;
            }
            Ok(_) => "no data found".to_string(),
            Err(e) => e.to_string(),
        };
        warn!(symbol = %symbol, reason = %reason, "skipping symbol");
        skipped.push(SkippedSymbol {
            symbol: symbol.clone(),
            reason,
        });
    }

    if loaded.is_empty() {
        return Err(ReplayError::NoData {
            symbol: symbols.join(","),
        });
    }
    if !skipped.is_empty() {
        warn!(loaded = loaded.len(), requested = symbols.len(), "partial universe");
    }

    Ok(Universe {
        symbols: loaded,
        bars,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::algo::test_support::bar;

    struct FakeSource;

    impl BarSource for FakeSource {
        fn fetch_bars(&self, symbol: &str) -> Result<Vec<DataEvent>, ReplayError> {
            match symbol {
                "BHP" => Ok(vec![bar("BHP", 1, 10.0), bar("BHP", 2, 11.0)]),
                "CBA" => Ok(vec![bar("CBA", 1, 50.0)]),
                "EMPTY" => Ok(Vec::new()),
                other => Err(ReplayError::Data {
                    reason: format!("no file for {other}"),
                }),
            }
        }
    }

    fn owned(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_simple_list() {
        assert_eq!(parse_symbols("bhp, cba ,RIO").unwrap(), vec!["BHP", "CBA", "RIO"]);
    }

    #[test]
    fn parse_single() {
        assert_eq!(parse_symbols("aapl").unwrap(), vec!["AAPL"]);
    }

    #[test]
    fn parse_rejects_empty_token() {
        assert_eq!(parse_symbols("BHP,,CBA"), Err(UniverseError::EmptyToken));
        assert_eq!(parse_symbols(""), Err(UniverseError::EmptyToken));
    }

    #[test]
    fn parse_rejects_duplicates_case_insensitively() {
        assert_eq!(
            parse_symbols("BHP,bhp"),
            Err(UniverseError::DuplicateSymbol("BHP".into()))
        );
    }

    #[test]
    fn load_keeps_symbol_order_and_bars() {
        let universe = load_universe(&FakeSource, &owned(&["CBA", "BHP"])).unwrap();
        assert_eq!(universe.symbols, vec!["CBA", "BHP"]);
        assert_eq!(universe.bars.len(), 3);
        assert_eq!(universe.bars[0].symbol, "CBA");
        assert!(universe.skipped.is_empty());
    }

    #[test]
    fn load_skips_missing_and_empty() {
        let universe = load_universe(&FakeSource, &owned(&["BHP", "EMPTY", "RIO"])).unwrap();
        assert_eq!(universe.symbols, vec!["BHP"]);
        let skipped: Vec<&str> = universe.skipped.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(skipped, vec!["EMPTY", "RIO"]);
        assert_eq!(universe.skipped[0].reason, "no data found");
        assert!(universe.skipped[1].reason.contains("no file for RIO"));
    }

    #[test]
    fn load_fails_when_nothing_loads() {
        let err = load_universe(&FakeSource, &owned(&["EMPTY", "RIO"])).unwrap_err();
        assert!(matches!(err, ReplayError::NoData { symbol } if symbol == "EMPTY,RIO"));
    }
}
